use std::f64::consts::PI;

use lasercut_core::analysis::LoopKind;
use lasercut_core::entity::{EntityId, EntityKind, bounding_box};
use lasercut_core::geometry::Point2;
use lasercut_engine::{IoError, NestingRequest, nest, parse};

/// 用 (组码, 值) 列表拼出只含 ENTITIES 段的 DXF 文本。
fn dxf(records: &[&[(i32, &str)]]) -> String {
    let mut text = String::from("0\nSECTION\n2\nENTITIES\n");
    for record in records {
        for (code, value) in *record {
            text.push_str(&format!("{code}\n{value}\n"));
        }
    }
    text.push_str("0\nENDSEC\n0\nEOF\n");
    text
}

const LINE_DIAGONAL: &[(i32, &str)] = &[
    (0, "LINE"),
    (8, "0"),
    (10, "0"),
    (20, "0"),
    (11, "100"),
    (21, "100"),
];

const CIRCLE_CENTERED: &[(i32, &str)] = &[(0, "CIRCLE"), (10, "50"), (20, "50"), (40, "25")];

const RECTANGLE: &[(i32, &str)] = &[
    (0, "LWPOLYLINE"),
    (90, "4"),
    (70, "1"),
    (10, "0"),
    (20, "0"),
    (10, "100"),
    (20, "0"),
    (10, "100"),
    (20, "50"),
    (10, "0"),
    (20, "50"),
];

#[test]
fn line_and_circle_yield_two_pierces() {
    let result = parse(&dxf(&[LINE_DIAGONAL, CIRCLE_CENTERED])).expect("parse");
    assert_eq!(result.entities.len(), 2);
    assert!((result.total_length_m - 0.2985).abs() < 1e-4);
    let expected = (100.0 * 2f64.sqrt() + 50.0 * PI) / 1000.0;
    assert!((result.total_length_m - expected).abs() < 1e-12);
    assert_eq!(result.pierce_count, 2);
    assert_eq!(result.pierce_points.len(), 2);
    assert_eq!(result.pierce_points[0], Point2::new(0.0, 0.0));
    assert_eq!(result.pierce_points[1], Point2::new(75.0, 50.0));
    assert_eq!(result.loops.len(), 1);
    assert_eq!(result.cut_order, vec![EntityId::new(1)]);
}

#[test]
fn closed_rectangle_is_one_loop_with_first_vertex_pierce() {
    let result = parse(&dxf(&[RECTANGLE])).expect("parse");
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.entities[0].kind(), EntityKind::Polyline);
    assert_eq!(result.entities[0].kind().name(), "POLY");
    assert!((result.total_length_m - 0.3).abs() < 1e-12);
    assert_eq!(result.loops.len(), 1);
    assert_eq!(result.loops[0].depth, 0);
    assert_eq!(result.loops[0].kind, LoopKind::ClosedPolyline);
    assert_eq!(result.pierce_count, 1);
    assert_eq!(result.pierce_points, vec![Point2::new(0.0, 0.0)]);
}

#[test]
fn half_arc_length() {
    let arc: &[(i32, &str)] = &[
        (0, "ARC"),
        (10, "0"),
        (20, "0"),
        (40, "10"),
        (50, "0"),
        (51, "180"),
    ];
    let result = parse(&dxf(&[arc])).expect("parse");
    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.entities[0].kind(), EntityKind::Arc);
    assert!((result.total_length_m - 0.031416).abs() < 1e-6);
    assert_eq!(result.pierce_count, 1);
    assert!(result.loops.is_empty());
}

#[test]
fn wrap_around_arc_sweeps_twenty_degrees() {
    let arc: &[(i32, &str)] = &[
        (0, "ARC"),
        (10, "0"),
        (20, "0"),
        (40, "10"),
        (50, "350"),
        (51, "10"),
    ];
    let result = parse(&dxf(&[arc])).expect("parse");
    assert!((result.total_length_m - 0.003491).abs() < 1e-6);
}

#[test]
fn empty_entities_section() {
    let result = parse(&dxf(&[])).expect("parse");
    assert!(result.entities.is_empty());
    assert_eq!(result.pierce_count, 0);
    assert_eq!(result.total_length_m, 0.0);
    assert!(result.loops.is_empty());
    assert!(result.cut_order.is_empty());
}

#[test]
fn text_without_entities_is_missing_section() {
    let err = parse("0\nSECTION\n2\nHEADER\n0\nENDSEC\n0\nEOF\n").unwrap_err();
    assert!(matches!(err, IoError::MissingSection));
}

#[test]
fn total_length_is_sum_of_entity_lengths() {
    let result = parse(&dxf(&[LINE_DIAGONAL, CIRCLE_CENTERED, RECTANGLE])).expect("parse");
    let sum: f64 = result.entities.iter().map(|entity| entity.length_m).sum();
    assert_eq!(result.total_length_m, sum);
}

#[test]
fn parsing_twice_is_identical() {
    let text = dxf(&[LINE_DIAGONAL, CIRCLE_CENTERED, RECTANGLE]);
    let first = parse(&text).expect("parse");
    let second = parse(&text).expect("parse");
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );
}

#[test]
fn pierce_points_do_not_depend_on_entity_order() {
    let segment_a: &[(i32, &str)] = &[
        (0, "LINE"),
        (10, "200"),
        (20, "0"),
        (11, "250"),
        (21, "0"),
    ];
    let segment_b: &[(i32, &str)] = &[
        (0, "LINE"),
        (10, "250"),
        (20, "0"),
        (11, "250"),
        (21, "40"),
    ];
    let forward = parse(&dxf(&[
        LINE_DIAGONAL,
        segment_a,
        CIRCLE_CENTERED,
        segment_b,
        RECTANGLE,
    ]))
    .expect("parse");
    let backward = parse(&dxf(&[
        RECTANGLE,
        segment_b,
        CIRCLE_CENTERED,
        segment_a,
        LINE_DIAGONAL,
    ]))
    .expect("parse");

    let sorted = |points: &[Point2]| {
        let mut keyed: Vec<(f64, f64)> = points.iter().map(|p| (p.x(), p.y())).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        keyed
    };
    assert_eq!(forward.pierce_count, 4);
    assert_eq!(forward.pierce_count, backward.pierce_count);
    assert_eq!(
        sorted(&forward.pierce_points),
        sorted(&backward.pierce_points)
    );
    assert_eq!(forward.components.len(), forward.pierce_count);
}

#[test]
fn plate_with_holes_cuts_inside_out() {
    let plate: &[(i32, &str)] = &[
        (0, "LWPOLYLINE"),
        (70, "1"),
        (10, "0"),
        (20, "0"),
        (10, "300"),
        (20, "0"),
        (10, "300"),
        (20, "200"),
        (10, "0"),
        (20, "200"),
    ];
    let big_hole: &[(i32, &str)] = &[(0, "CIRCLE"), (10, "100"), (20, "100"), (40, "40")];
    let small_hole: &[(i32, &str)] = &[(0, "CIRCLE"), (10, "220"), (20, "100"), (40, "10")];
    let result = parse(&dxf(&[plate, big_hole, small_hole])).expect("parse");

    let depths: Vec<_> = result.loops.iter().map(|l| l.depth).collect();
    assert_eq!(depths, vec![0, 1, 1]);
    let order: Vec<_> = result.cut_order.iter().map(|id| id.get()).collect();
    assert_eq!(order, vec![2, 1, 0]);
    assert_eq!(result.pierce_count, 3);
}

#[test]
fn nesting_from_parsed_bounding_box() {
    let result = parse(&dxf(&[RECTANGLE])).expect("parse");
    let part = bounding_box(&result.entities);
    assert_eq!((part.width, part.height), (100.0, 50.0));

    let request = NestingRequest::new(1000.0, 500.0, part.width, part.height)
        .with_margin(10.0)
        .with_gap(5.0)
        .with_quantity(100)
        .with_rotations([0, 90]);
    let nested = nest(&request);
    // 0°: (980+5)/105 = 9 列, (480+5)/55 = 8 行
    assert_eq!((nested.columns, nested.rows), (9, 8));
    assert_eq!(nested.placed_count, 72);
    assert_eq!(nested.sheets_needed, 2);
}

#[test]
fn nesting_grid_scenario() {
    let only_upright = nest(&NestingRequest::new(60.0, 40.0, 35.0, 20.0).with_quantity(999));
    assert_eq!(only_upright.placed_count, 2);

    let with_turn = nest(
        &NestingRequest::new(60.0, 40.0, 35.0, 20.0)
            .with_quantity(999)
            .with_rotations([0, 90]),
    );
    assert_eq!(with_turn.placed_count, 3);
}
