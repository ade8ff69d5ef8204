pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，单位与图纸一致（毫米）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        /// 圆周上指定角度（度）处的点，角度按数学正方向计量。
        #[inline]
        pub fn on_circle(center: Point2, radius: f64, angle_deg: f64) -> Self {
            let (sin, cos) = angle_deg.to_radians().sin_cos();
            Self(center.0 + DVec2::new(cos, sin) * radius)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 轴对齐边界框，用于包含性快速排除与零件外形尺寸。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 边界上的点视为被包含。
        pub fn contains_point(&self, point: Point2) -> bool {
            !self.is_empty()
                && point.x() >= self.min.x()
                && point.x() <= self.max.x()
                && point.y() >= self.min.y()
                && point.y() <= self.max.y()
        }

        pub fn contains_bounds(&self, other: &Bounds2D) -> bool {
            !other.is_empty() && self.contains_point(other.min) && self.contains_point(other.max)
        }
    }
}

pub mod entity {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    /// 图纸坐标按毫米解释，长度统一换算为米。
    pub const MM_PER_METER: f64 = 1000.0;

    /// 实体编号：过滤后按插入顺序分配的稠密下标。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }

        #[inline]
        pub fn index(self) -> usize {
            self.0 as usize
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum EntityKind {
        Line,
        Circle,
        Arc,
        Polyline,
    }

    impl EntityKind {
        pub fn name(self) -> &'static str {
            match self {
                EntityKind::Line => "LINE",
                EntityKind::Circle => "CIRCLE",
                EntityKind::Arc => "ARC",
                EntityKind::Polyline => "POLY",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
    }

    impl Line {
        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance(self.end)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
    }

    impl Circle {
        #[inline]
        pub fn circumference(&self) -> f64 {
            std::f64::consts::TAU * self.radius
        }

        /// 0° 处的圆周点，作为圆的起点与穿孔候选点。
        #[inline]
        pub fn start_point(&self) -> Point2 {
            Point2::new(self.center.x() + self.radius, self.center.y())
        }
    }

    /// 圆弧实体，角度以度为单位储存，扫掠方向恒为逆时针（从起始角到终止角）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
    }

    impl Arc {
        /// 逆时针扫掠角（度），取值 `[0, 360]`。
        ///
        /// 起止角相等时扫掠为 0；两者相差 360 的非零整数倍时视为整圆。
        pub fn sweep_degrees(&self) -> f64 {
            let raw = self.end_angle - self.start_angle;
            let sweep = raw.rem_euclid(360.0);
            if sweep == 0.0 && raw != 0.0 {
                360.0
            } else {
                sweep
            }
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.radius * self.sweep_degrees().to_radians()
        }

        #[inline]
        pub fn start_point(&self) -> Point2 {
            Point2::on_circle(self.center, self.radius, self.start_angle)
        }

        #[inline]
        pub fn end_point(&self) -> Point2 {
            Point2::on_circle(self.center, self.radius, self.start_angle + self.sweep_degrees())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub points: Vec<Point2>,
        pub is_closed: bool,
    }

    impl Polyline {
        /// 路径长度；闭合时计入首尾闭合段。
        pub fn length(&self) -> f64 {
            let open: f64 = self
                .points
                .windows(2)
                .map(|pair| pair[0].distance(pair[1]))
                .sum();
            match (self.is_closed, self.points.first(), self.points.last()) {
                (true, Some(first), Some(last)) => open + last.distance(*first),
                _ => open,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum EntityGeometry {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Polyline(Polyline),
    }

    impl EntityGeometry {
        #[inline]
        pub fn kind(&self) -> EntityKind {
            match self {
                EntityGeometry::Line(_) => EntityKind::Line,
                EntityGeometry::Circle(_) => EntityKind::Circle,
                EntityGeometry::Arc(_) => EntityKind::Arc,
                EntityGeometry::Polyline(_) => EntityKind::Polyline,
            }
        }

        /// 路径长度（毫米）。
        pub fn length_mm(&self) -> f64 {
            match self {
                EntityGeometry::Line(line) => line.length(),
                EntityGeometry::Circle(circle) => circle.circumference(),
                EntityGeometry::Arc(arc) => arc.length(),
                EntityGeometry::Polyline(polyline) => polyline.length(),
            }
        }

        pub fn start_point(&self) -> Point2 {
            match self {
                EntityGeometry::Line(line) => line.start,
                EntityGeometry::Circle(circle) => circle.start_point(),
                EntityGeometry::Arc(arc) => arc.start_point(),
                EntityGeometry::Polyline(polyline) => polyline
                    .points
                    .first()
                    .copied()
                    .unwrap_or(Point2::new(0.0, 0.0)),
            }
        }

        /// 圆与闭合多段线是自成一体的切割环。
        #[inline]
        pub fn is_closed_loop(&self) -> bool {
            match self {
                EntityGeometry::Circle(_) => true,
                EntityGeometry::Polyline(polyline) => polyline.is_closed,
                _ => false,
            }
        }

        /// 开放路径的两个端点；闭合环返回 `None`。
        pub fn open_endpoints(&self) -> Option<(Point2, Point2)> {
            match self {
                EntityGeometry::Line(line) => Some((line.start, line.end)),
                EntityGeometry::Arc(arc) => Some((arc.start_point(), arc.end_point())),
                EntityGeometry::Polyline(polyline) if !polyline.is_closed => {
                    let first = *polyline.points.first()?;
                    let last = *polyline.points.last()?;
                    Some((first, last))
                }
                _ => None,
            }
        }

        /// 计算实体的 2D 轴对齐范围。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                EntityGeometry::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                EntityGeometry::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                EntityGeometry::Arc(arc) => arc_bounds(arc, &mut bounds),
                EntityGeometry::Polyline(polyline) => {
                    for point in &polyline.points {
                        bounds.include_point(*point);
                    }
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    /// 归一化后的实体，创建后不可变。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct NormalizedEntity {
        pub id: EntityId,
        pub layer: String,
        pub length_m: f64,
        pub start: Point2,
        pub geometry: EntityGeometry,
    }

    impl NormalizedEntity {
        /// 由几何体构造实体，长度与起点随之确定。
        pub fn new(id: EntityId, layer: impl Into<String>, geometry: EntityGeometry) -> Self {
            Self {
                id,
                layer: layer.into(),
                length_m: geometry.length_mm() / MM_PER_METER,
                start: geometry.start_point(),
                geometry,
            }
        }

        #[inline]
        pub fn kind(&self) -> EntityKind {
            self.geometry.kind()
        }
    }

    /// 零件外形尺寸（毫米），供排样使用。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct PartBox {
        pub width: f64,
        pub height: f64,
        pub min_x: f64,
        pub min_y: f64,
    }

    /// 汇总全部实体的包围盒；实体为空或范围非有限时返回全零。
    pub fn bounding_box(entities: &[NormalizedEntity]) -> PartBox {
        let mut bounds = Bounds2D::empty();
        for entity in entities {
            if let Some(entity_bounds) = entity.geometry.bounds() {
                bounds.include_bounds(&entity_bounds);
            }
        }
        if bounds.is_empty() || !bounds.min().is_finite() || !bounds.max().is_finite() {
            return PartBox::default();
        }
        PartBox {
            width: bounds.width(),
            height: bounds.height(),
            min_x: bounds.min().x(),
            min_y: bounds.min().y(),
        }
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let start = arc.start_angle.rem_euclid(360.0);
        let end = start + arc.sweep_degrees();
        bounds.include_point(Point2::on_circle(arc.center, radius, start));
        bounds.include_point(Point2::on_circle(arc.center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += 360.0;
            }
            if candidate <= end {
                bounds.include_point(Point2::on_circle(arc.center, radius, candidate));
            }
        }
    }
}

pub mod analysis {
    use serde::{Deserialize, Serialize};

    use crate::entity::{EntityId, NormalizedEntity};
    use crate::geometry::{Bounds2D, Point2};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LoopKind {
        Circle,
        ClosedPolyline,
    }

    /// 环的几何形状，用于包含性判定。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum LoopShape {
        Circle { center: Point2, radius: f64 },
        Polygon { vertices: Vec<Point2> },
    }

    /// 闭合切割环（圆或闭合多段线）及其嵌套深度。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CutLoop {
        pub entity: EntityId,
        pub kind: LoopKind,
        pub area: f64,
        pub representative_point: Point2,
        pub bounds: Bounds2D,
        pub depth: usize,
        pub shape: LoopShape,
    }

    /// 一次解析的完整结果，由调用方独占。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct ParseResult {
        pub entities: Vec<NormalizedEntity>,
        pub total_length_m: f64,
        pub pierce_points: Vec<Point2>,
        pub pierce_count: usize,
        /// 每个连通分量包含的实体，与 `pierce_points` 一一对应。
        pub components: Vec<Vec<EntityId>>,
        pub loops: Vec<CutLoop>,
        pub cut_order: Vec<EntityId>,
    }

    impl ParseResult {
        pub fn entity(&self, id: EntityId) -> Option<&NormalizedEntity> {
            self.entities.get(id.index()).filter(|entity| entity.id == id)
        }
    }

    /// 矩形网格排样结果，坐标为零件左上角（毫米）。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct NestingResult {
        pub columns: usize,
        pub rows: usize,
        pub placed_count: usize,
        pub rotation_deg: i32,
        pub part_w: f64,
        pub part_h: f64,
        pub positions: Vec<Point2>,
        pub work_w: f64,
        pub work_h: f64,
        pub sheets_needed: usize,
        pub sheet_w: f64,
        pub sheet_h: f64,
        pub margin: f64,
        pub gap: f64,
        pub rotations_tried: Vec<i32>,
    }

    impl NestingResult {
        #[inline]
        pub fn capacity(&self) -> usize {
            self.columns.saturating_mul(self.rows)
        }

        #[inline]
        pub fn is_feasible(&self) -> bool {
            self.placed_count > 0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::analysis::ParseResult;
    use super::entity::{
        Arc, Circle, EntityGeometry, EntityId, EntityKind, Line, NormalizedEntity, Polyline,
        bounding_box,
    };
    use super::geometry::{Bounds2D, Point2};

    fn arc(start_angle: f64, end_angle: f64) -> Arc {
        Arc {
            center: Point2::new(0.0, 0.0),
            radius: 10.0,
            start_angle,
            end_angle,
        }
    }

    #[test]
    fn arc_sweep_wraps_through_zero() {
        assert!((arc(0.0, 180.0).sweep_degrees() - 180.0).abs() < 1e-12);
        assert!((arc(350.0, 10.0).sweep_degrees() - 20.0).abs() < 1e-9);
        assert!((arc(90.0, -90.0).sweep_degrees() - 180.0).abs() < 1e-12);
    }

    #[test]
    fn arc_zero_sweep_stays_zero_but_explicit_turn_is_full() {
        assert_eq!(arc(45.0, 45.0).sweep_degrees(), 0.0);
        assert_eq!(arc(45.0, 45.0).length(), 0.0);
        assert_eq!(arc(0.0, 360.0).sweep_degrees(), 360.0);
        assert!((arc(0.0, 360.0).length() - 20.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn arc_endpoints_follow_counter_clockwise_sweep() {
        let quarter = arc(0.0, 90.0);
        let start = quarter.start_point();
        let end = quarter.end_point();
        assert!((start.x() - 10.0).abs() < 1e-9 && start.y().abs() < 1e-9);
        assert!(end.x().abs() < 1e-9 && (end.y() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn arc_bounds_include_crossed_quadrants() {
        let geometry = EntityGeometry::Arc(arc(350.0, 100.0));
        let bounds = geometry.bounds().expect("arc bounds");
        assert!((bounds.max().x() - 10.0).abs() < 1e-9);
        assert!((bounds.max().y() - 10.0).abs() < 1e-9);
        assert!(bounds.min().x() < 0.0);
        assert!(bounds.min().y() < 0.0);
    }

    #[test]
    fn closed_polyline_length_includes_closing_segment() {
        let rect = Polyline {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(100.0, 0.0),
                Point2::new(100.0, 50.0),
                Point2::new(0.0, 50.0),
            ],
            is_closed: true,
        };
        assert!((rect.length() - 300.0).abs() < 1e-9);
        let open = Polyline {
            is_closed: false,
            ..rect
        };
        assert!((open.length() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn normalized_entity_derives_length_in_meters_and_start() {
        let circle = NormalizedEntity::new(
            EntityId::new(0),
            "0",
            EntityGeometry::Circle(Circle {
                center: Point2::new(50.0, 50.0),
                radius: 25.0,
            }),
        );
        assert_eq!(circle.kind(), EntityKind::Circle);
        assert!((circle.length_m - 0.05 * PI).abs() < 1e-12);
        assert_eq!(circle.start, Point2::new(75.0, 50.0));
        assert!(circle.geometry.is_closed_loop());
        assert!(circle.geometry.open_endpoints().is_none());
    }

    #[test]
    fn bounding_box_covers_all_entities() {
        let entities = vec![
            NormalizedEntity::new(
                EntityId::new(0),
                "0",
                EntityGeometry::Line(Line {
                    start: Point2::new(-5.0, 0.0),
                    end: Point2::new(20.0, 10.0),
                }),
            ),
            NormalizedEntity::new(
                EntityId::new(1),
                "0",
                EntityGeometry::Circle(Circle {
                    center: Point2::new(0.0, 0.0),
                    radius: 8.0,
                }),
            ),
        ];
        let part = bounding_box(&entities);
        assert!((part.width - 28.0).abs() < 1e-9);
        assert!((part.height - 18.0).abs() < 1e-9);
        assert!((part.min_x + 8.0).abs() < 1e-9);
        assert!((part.min_y + 8.0).abs() < 1e-9);
    }

    #[test]
    fn bounding_box_of_nothing_is_zero() {
        let part = bounding_box(&[]);
        assert_eq!(part.width, 0.0);
        assert_eq!(part.height, 0.0);
        assert_eq!(part.min_x, 0.0);
        assert_eq!(part.min_y, 0.0);
    }

    #[test]
    fn bounds_containment_is_inclusive() {
        let outer = Bounds2D::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));
        let inner = Bounds2D::new(Point2::new(0.0, 2.0), Point2::new(5.0, 10.0));
        assert!(outer.contains_bounds(&inner));
        assert!(!inner.contains_bounds(&outer));
        assert!(!outer.contains_bounds(&Bounds2D::empty()));
    }

    #[test]
    fn parse_result_serializes_to_json() {
        let mut result = ParseResult::default();
        result.entities.push(NormalizedEntity::new(
            EntityId::new(0),
            "CUT",
            EntityGeometry::Line(Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(3.0, 4.0),
            }),
        ));
        result.total_length_m = 0.005;
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["entities"][0]["layer"], "CUT");
        assert!(result.entity(EntityId::new(0)).is_some());
        assert!(result.entity(EntityId::new(1)).is_none());
    }
}
