use std::collections::BTreeMap;
use std::fmt;

use lasercut_config::AppConfig;
use lasercut_core::analysis::{NestingResult, ParseResult};
use lasercut_core::entity::{EntityId, EntityKind, PartBox};
use lasercut_core::geometry::Point2;
use lasercut_engine::{NestingRequest, nest};
use serde::Serialize;
use tracing::info;

use crate::errors::FrontendError;
use crate::estimate::{CostEstimate, estimate};
use crate::loader::LoadedDrawing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// 覆盖配置中的默认材料。
    pub material: Option<String>,
    pub format: OutputFormat,
}

/// 一张图纸的完整加工报告：分析结果、排样与费用估算。
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub source: String,
    pub analysis: ParseResult,
    pub part: PartBox,
    pub nesting: NestingResult,
    pub cost: CostEstimate,
}

/// 根据配置对已加载的图纸执行排样与估算。
pub fn build_report(
    drawing: LoadedDrawing,
    config: &AppConfig,
    material: Option<&str>,
) -> Result<JobReport, FrontendError> {
    let material_name = material.unwrap_or(config.cutting.default_material.as_str());
    let profile = config
        .cutting
        .material(material_name)
        .ok_or_else(|| FrontendError::UnknownMaterial(material_name.to_string()))?;

    let nesting_cfg = &config.nesting;
    let request = NestingRequest::new(
        nesting_cfg.sheet_width,
        nesting_cfg.sheet_height,
        drawing.part.width,
        drawing.part.height,
    )
    .with_margin(nesting_cfg.margin)
    .with_gap(nesting_cfg.gap)
    .with_quantity(nesting_cfg.quantity)
    .with_rotations(nesting_cfg.rotations.clone());
    let nesting = nest(&request);

    let cost = estimate(
        drawing.analysis.total_length_m,
        drawing.analysis.pierce_count,
        profile,
        nesting_cfg.quantity,
    )?;

    info!(
        material = %profile.name,
        placed = nesting.placed_count,
        sheets = nesting.sheets_needed,
        "加工报告生成完成"
    );

    Ok(JobReport {
        source: drawing.path.display().to_string(),
        analysis: drawing.analysis,
        part: drawing.part,
        nesting,
        cost,
    })
}

/// 按输出格式渲染报告。
pub fn render(report: &JobReport, format: OutputFormat) -> Result<String, FrontendError> {
    match format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = &self.analysis;
        writeln!(f, "图纸：{}", self.source)?;

        let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut layers: BTreeMap<&str, usize> = BTreeMap::new();
        for entity in &analysis.entities {
            *kinds.entry(entity.kind().name()).or_default() += 1;
            *layers.entry(entity.layer.as_str()).or_default() += 1;
        }
        writeln!(
            f,
            "实体数：{} ({})",
            analysis.entities.len(),
            join_counts(&kinds)
        )?;
        writeln!(f, "图层：{}", join_counts(&layers))?;
        writeln!(f, "切割总长：{:.3} m", analysis.total_length_m)?;

        writeln!(f, "穿孔点：{}", analysis.pierce_count)?;
        for (index, point) in analysis.pierce_points.iter().enumerate() {
            let members = analysis
                .components
                .get(index)
                .map(|ids| join_ids(ids, ", "))
                .unwrap_or_default();
            writeln!(f, "  - {} 实体 [{}]", format_point(*point), members)?;
        }

        writeln!(f, "闭合环：{}", analysis.loops.len())?;
        for cut_loop in &analysis.loops {
            let kind = analysis
                .entity(cut_loop.entity)
                .map(|entity| entity.kind())
                .unwrap_or(EntityKind::Polyline);
            writeln!(
                f,
                "  - #{} {} 深度={} 面积={:.2} mm²",
                cut_loop.entity.get(),
                kind.name(),
                cut_loop.depth,
                cut_loop.area
            )?;
        }
        if !analysis.cut_order.is_empty() {
            writeln!(f, "切割顺序：{}", join_ids(&analysis.cut_order, " -> "))?;
        }

        writeln!(
            f,
            "零件外形：{:.2} × {:.2} mm",
            self.part.width, self.part.height
        )?;

        let nesting = &self.nesting;
        if nesting.is_feasible() {
            writeln!(
                f,
                "排样：板材 {:.0} × {:.0} mm，边距 {:.1}，间距 {:.1}，旋转 {}°，{} 列 × {} 行（容量 {}），每张 {} 件，需 {} 张",
                nesting.sheet_w,
                nesting.sheet_h,
                nesting.margin,
                nesting.gap,
                nesting.rotation_deg,
                nesting.columns,
                nesting.rows,
                nesting.capacity(),
                nesting.placed_count,
                nesting.sheets_needed
            )?;
        } else {
            writeln!(f, "排样：零件无法放入板材")?;
        }

        let cost = &self.cost;
        writeln!(
            f,
            "估算（{}, {:.1} mm）：单件 {:.2} min / {:.2}，{} 件共 {:.2} min / {:.2}",
            cost.material,
            cost.thickness_mm,
            cost.part_minutes,
            cost.part_cost,
            cost.quantity,
            cost.batch_minutes,
            cost.batch_cost
        )
    }
}

fn join_counts(counts: &BTreeMap<&str, usize>) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("{name} {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_ids(ids: &[EntityId], separator: &str) -> String {
    ids.iter()
        .map(|id| id.get().to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

fn format_point(point: Point2) -> String {
    format!("({:.2}, {:.2})", point.x(), point.y())
}
