//! 矩形网格排样：在板材上按行列摆放零件外形框，尝试若干直角旋转。

use lasercut_core::analysis::NestingResult;
use lasercut_core::geometry::Point2;
use tracing::debug;

/// 排样请求，尺寸单位为毫米。
#[derive(Debug, Clone, PartialEq)]
pub struct NestingRequest {
    pub sheet_w: f64,
    pub sheet_h: f64,
    /// 四边内缩量。
    pub margin: f64,
    /// 相邻零件间距。
    pub gap: f64,
    pub quantity: usize,
    pub part_w: f64,
    pub part_h: f64,
    /// 候选旋转角（度）。
    pub rotations: Vec<i32>,
}

impl NestingRequest {
    pub fn new(sheet_w: f64, sheet_h: f64, part_w: f64, part_h: f64) -> Self {
        Self {
            sheet_w,
            sheet_h,
            margin: 0.0,
            gap: 0.0,
            quantity: 1,
            part_w,
            part_h,
            rotations: vec![0],
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_quantity(mut self, quantity: usize) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_rotations(mut self, rotations: impl Into<Vec<i32>>) -> Self {
        self.rotations = rotations.into();
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct GridCandidate {
    rotation: i32,
    part_w: f64,
    part_h: f64,
    work_w: f64,
    work_h: f64,
    columns: usize,
    rows: usize,
    placed: usize,
}

/// 计算每张板可放数量最多的网格布局。从不报错：不可行时放置数为 0。
pub fn nest(request: &NestingRequest) -> NestingResult {
    let dimensions = [
        request.sheet_w,
        request.sheet_h,
        request.part_w,
        request.part_h,
    ];
    if dimensions.iter().any(|value| !is_positive(*value)) {
        debug!(?dimensions, "排样输入退化，返回空结果");
        return NestingResult::default();
    }

    let margin = non_negative(request.margin);
    let gap = non_negative(request.gap);
    let rotations = effective_rotations(&request.rotations);

    let mut best: Option<GridCandidate> = None;
    for &rotation in &rotations {
        let candidate = evaluate(request, margin, gap, rotation);
        let better = match &best {
            None => true,
            Some(current) => {
                candidate.placed > current.placed
                    || (candidate.placed == current.placed
                        && candidate.work_w * candidate.work_h > current.work_w * current.work_h)
            }
        };
        if better {
            best = Some(candidate);
        }
    }
    let Some(best) = best else {
        return NestingResult::default();
    };

    let positions = (0..best.placed)
        .map(|index| {
            let row = index / best.columns;
            let column = index % best.columns;
            Point2::new(
                margin + column as f64 * (best.part_w + gap),
                margin + row as f64 * (best.part_h + gap),
            )
        })
        .collect();
    let sheets_needed = request.quantity.div_ceil(best.placed.max(1)).max(1);

    debug!(
        rotation = best.rotation,
        columns = best.columns,
        rows = best.rows,
        placed = best.placed,
        sheets_needed,
        "网格排样完成"
    );

    NestingResult {
        columns: best.columns,
        rows: best.rows,
        placed_count: best.placed,
        rotation_deg: best.rotation,
        part_w: best.part_w,
        part_h: best.part_h,
        positions,
        work_w: best.work_w,
        work_h: best.work_h,
        sheets_needed,
        sheet_w: request.sheet_w,
        sheet_h: request.sheet_h,
        margin,
        gap,
        rotations_tried: rotations,
    }
}

fn evaluate(request: &NestingRequest, margin: f64, gap: f64, rotation: i32) -> GridCandidate {
    let (part_w, part_h) = if rotation % 180 == 90 {
        (request.part_h, request.part_w)
    } else {
        (request.part_w, request.part_h)
    };
    let work_w = request.sheet_w - 2.0 * margin;
    let work_h = request.sheet_h - 2.0 * margin;

    let (columns, rows) = if work_w <= 0.0 || work_h <= 0.0 {
        (0, 0)
    } else {
        (
            ((work_w + gap) / (part_w + gap)).floor() as usize,
            ((work_h + gap) / (part_h + gap)).floor() as usize,
        )
    };
    // 板材远大于零件时 `as usize` 会饱和，乘积需防溢出
    let placed = request.quantity.min(columns.saturating_mul(rows));

    GridCandidate {
        rotation,
        part_w,
        part_h,
        work_w,
        work_h,
        columns,
        rows,
        placed,
    }
}

/// 规范到 `[0, 360)` 并去重；非直角旋转对网格排样无意义，直接忽略。
fn effective_rotations(requested: &[i32]) -> Vec<i32> {
    let mut rotations = Vec::with_capacity(requested.len());
    for angle in requested {
        let normalized = angle.rem_euclid(360);
        if normalized % 90 != 0 {
            debug!(angle, "忽略非直角旋转");
            continue;
        }
        if !rotations.contains(&normalized) {
            rotations.push(normalized);
        }
    }
    if rotations.is_empty() {
        rotations.push(0);
    }
    rotations
}

#[inline]
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
