use lasercut_core::entity::{
    Arc, Circle, EntityGeometry, EntityId, Line, NormalizedEntity, Polyline,
};
use tracing::debug;

use crate::RawEntity;

/// 实体被丢弃的原因，仅用于日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Degenerate {
    NonFiniteCoordinate,
    NonPositiveRadius,
    TooFewPoints,
}

/// 将原始实体转换为归一化实体。退化实体被丢弃，编号按过滤后的顺序稠密分配。
pub fn normalize_entities(raw: Vec<RawEntity>) -> Vec<NormalizedEntity> {
    let mut entities = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for (index, entity) in raw.into_iter().enumerate() {
        let layer = entity.layer().to_string();
        match normalize_geometry(entity) {
            Ok(geometry) => {
                let id = EntityId::new(entities.len() as u64);
                entities.push(NormalizedEntity::new(id, layer, geometry));
            }
            Err(reason) => {
                dropped += 1;
                debug!(index, ?reason, "丢弃退化实体");
            }
        }
    }
    if dropped > 0 {
        debug!(kept = entities.len(), dropped, "实体归一化完成");
    }
    entities
}

fn normalize_geometry(entity: RawEntity) -> Result<EntityGeometry, Degenerate> {
    match entity {
        RawEntity::Line { start, end, .. } => {
            if !start.is_finite() || !end.is_finite() {
                return Err(Degenerate::NonFiniteCoordinate);
            }
            Ok(EntityGeometry::Line(Line { start, end }))
        }
        RawEntity::Circle { center, radius, .. } => {
            check_radius(radius)?;
            if !center.is_finite() {
                return Err(Degenerate::NonFiniteCoordinate);
            }
            Ok(EntityGeometry::Circle(Circle { center, radius }))
        }
        RawEntity::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            ..
        } => {
            check_radius(radius)?;
            if !center.is_finite() || !start_angle.is_finite() || !end_angle.is_finite() {
                return Err(Degenerate::NonFiniteCoordinate);
            }
            // 起止角相同的圆弧保留为零长度圆弧，不提升为整圆
            Ok(EntityGeometry::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
            }))
        }
        RawEntity::Polyline {
            vertices,
            closed_flag,
            ..
        } => {
            let points: Vec<_> = vertices.into_iter().filter(|p| p.is_finite()).collect();
            if points.len() < 2 {
                return Err(Degenerate::TooFewPoints);
            }
            // 未设置闭合标志时，首尾点严格相等也视为闭合
            let is_closed = closed_flag || points.first() == points.last();
            Ok(EntityGeometry::Polyline(Polyline { points, is_closed }))
        }
    }
}

fn check_radius(radius: f64) -> Result<(), Degenerate> {
    if !radius.is_finite() {
        Err(Degenerate::NonFiniteCoordinate)
    } else if radius <= 0.0 {
        Err(Degenerate::NonPositiveRadius)
    } else {
        Ok(())
    }
}
