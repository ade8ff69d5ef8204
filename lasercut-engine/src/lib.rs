pub mod loops;
pub mod nesting;
pub mod pierce;

pub use lasercut_io::IoError;

pub mod analysis {
    use lasercut_core::analysis::ParseResult;
    use lasercut_core::entity::NormalizedEntity;
    use lasercut_io::{IoError, read_entities};
    use tracing::info;

    use crate::loops::{cut_order, resolve_loops};
    use crate::pierce::detect_components;

    /// 解析 DXF 文本并完成穿孔与切割顺序分析。
    ///
    /// 只有缺少 ENTITIES 段时返回错误。每次调用都创建全新的数据结构，
    /// 可在多个线程中并行调用。
    pub fn parse(source: &str) -> Result<ParseResult, IoError> {
        let entities = read_entities(source)?;
        Ok(analyze(entities))
    }

    /// 对已归一化的实体执行穿孔分量检测与闭合环分析。
    pub fn analyze(entities: Vec<NormalizedEntity>) -> ParseResult {
        let total_length_m: f64 = entities.iter().map(|entity| entity.length_m).sum();

        let components = detect_components(&entities);
        let pierce_points = components
            .iter()
            .map(|component| component.pierce_point)
            .collect::<Vec<_>>();
        let loops = resolve_loops(&entities);
        let cut_order = cut_order(&loops);

        info!(
            entities = entities.len(),
            total_length_m,
            pierce_count = pierce_points.len(),
            loops = loops.len(),
            "图纸分析完成"
        );

        ParseResult {
            pierce_count: pierce_points.len(),
            pierce_points,
            components: components
                .into_iter()
                .map(|component| component.entities)
                .collect(),
            loops,
            cut_order,
            total_length_m,
            entities,
        }
    }

}

pub use analysis::{analyze, parse};
pub use nesting::{NestingRequest, nest};
