//! 闭合环识别、嵌套深度与切割顺序。

use std::f64::consts::PI;

use lasercut_core::analysis::{CutLoop, LoopKind, LoopShape};
use lasercut_core::entity::{EntityGeometry, EntityId, NormalizedEntity};
use lasercut_core::geometry::Point2;
use tracing::debug;

/// 识别全部闭合环并计算嵌套深度。开放路径不参与嵌套。
pub fn resolve_loops(entities: &[NormalizedEntity]) -> Vec<CutLoop> {
    let mut loops: Vec<CutLoop> = entities.iter().filter_map(build_loop).collect();

    let depths: Vec<usize> = (0..loops.len())
        .map(|inner| {
            (0..loops.len())
                .filter(|&outer| outer != inner && contains(&loops[outer], &loops[inner]))
                .count()
        })
        .collect();
    for (cut_loop, depth) in loops.iter_mut().zip(depths) {
        cut_loop.depth = depth;
    }

    debug!(
        loops = loops.len(),
        max_depth = loops.iter().map(|l| l.depth).max().unwrap_or(0),
        "闭合环嵌套分析完成"
    );
    loops
}

/// 按深度降序、面积升序排列：先切内部小孔，再切包围它们的外轮廓。
pub fn cut_order(loops: &[CutLoop]) -> Vec<EntityId> {
    let mut ordered: Vec<&CutLoop> = loops.iter().collect();
    ordered.sort_by(|a, b| b.depth.cmp(&a.depth).then(a.area.total_cmp(&b.area)));
    ordered.into_iter().map(|cut_loop| cut_loop.entity).collect()
}

/// `outer` 是否几何包含 `inner` 的代表点（先以包围盒快速排除）。
pub fn contains(outer: &CutLoop, inner: &CutLoop) -> bool {
    if !outer.bounds.contains_bounds(&inner.bounds) {
        return false;
    }
    match (&outer.shape, &inner.shape) {
        (LoopShape::Polygon { vertices }, _) => {
            point_in_polygon(inner.representative_point, vertices)
        }
        (
            LoopShape::Circle { center, radius },
            LoopShape::Circle {
                center: inner_center,
                radius: inner_radius,
            },
        ) => inner_radius < radius && center.distance(*inner_center) + inner_radius <= *radius,
        (LoopShape::Circle { center, radius }, LoopShape::Polygon { .. }) => {
            center.distance(inner.representative_point) <= *radius
        }
    }
}

fn build_loop(entity: &NormalizedEntity) -> Option<CutLoop> {
    let bounds = entity.geometry.bounds()?;
    match &entity.geometry {
        EntityGeometry::Circle(circle) => Some(CutLoop {
            entity: entity.id,
            kind: LoopKind::Circle,
            area: PI * circle.radius * circle.radius,
            representative_point: circle.center,
            bounds,
            depth: 0,
            shape: LoopShape::Circle {
                center: circle.center,
                radius: circle.radius,
            },
        }),
        EntityGeometry::Polyline(polyline) if polyline.is_closed => Some(CutLoop {
            entity: entity.id,
            kind: LoopKind::ClosedPolyline,
            area: polygon_area(&polyline.points),
            representative_point: *polyline.points.first()?,
            bounds,
            depth: 0,
            shape: LoopShape::Polygon {
                vertices: polyline.points.clone(),
            },
        }),
        _ => None,
    }
}

/// 鞋带公式求面积，取绝对值。
fn polygon_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice_area: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x() * b.y() - b.x() * a.y()
        })
        .sum();
    twice_area.abs() / 2.0
}

/// 奇偶射线法判定点是否在多边形内。
fn point_in_polygon(point: Point2, vertices: &[Point2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let (px, py) = (point.x(), point.y());
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (vertices[i], vertices[j]);
        let crosses = (pi.y() > py) != (pj.y() > py)
            && px < (pj.x() - pi.x()) * (py - pi.y()) / (pj.y() - pi.y()) + pi.x();
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}
