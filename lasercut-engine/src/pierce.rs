//! 穿孔点检测：按共享端点把开放路径连成连通分量，每个分量对应一次穿孔。

use std::collections::{HashMap, VecDeque};

use lasercut_core::entity::{EntityId, NormalizedEntity};
use lasercut_core::geometry::Point2;
use tracing::debug;

/// 端点量化容差（毫米），吸收源文件中的浮点舍入。
pub const ENDPOINT_EPS: f64 = 0.8;

type GridKey = (i64, i64);

/// 一条物理上独立的切割路径及其穿孔点。
#[derive(Debug, Clone, PartialEq)]
pub struct PierceComponent {
    /// 分量内实体，按编号升序。
    pub entities: Vec<EntityId>,
    pub pierce_point: Point2,
}

/// 量化后超出 `i64` 范围的坐标返回 `None`，否则饱和转换会把相距极远的端点并到同一格。
#[inline]
fn quantize(point: Point2) -> Option<GridKey> {
    let axis = |value: f64| {
        let scaled = (value / ENDPOINT_EPS).round();
        // i64::MAX 转 f64 后为 2^63，需严格小于
        (scaled >= i64::MIN as f64 && scaled < i64::MAX as f64).then_some(scaled as i64)
    };
    Some((axis(point.x())?, axis(point.y())?))
}

/// 提取连通分量。分量按广度优先种子（实体下标）顺序发现。
pub fn detect_components(entities: &[NormalizedEntity]) -> Vec<PierceComponent> {
    let adjacency = build_adjacency(entities);
    let mut visited = vec![false; entities.len()];
    let mut queue = VecDeque::new();
    let mut components = Vec::new();

    for seed in 0..entities.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        let mut members = Vec::new();
        while let Some(index) = queue.pop_front() {
            members.push(index);
            for &next in &adjacency[index] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();

        let pierce_point = pick_pierce_point(entities, &members);
        components.push(PierceComponent {
            entities: members.iter().map(|&index| entities[index].id).collect(),
            pierce_point,
        });
    }

    debug!(
        entities = entities.len(),
        components = components.len(),
        "穿孔分量检测完成"
    );
    components
}

/// 以实体下标为节点构建邻接表。圆与闭合多段线不登记端点，始终是孤立节点。
fn build_adjacency(entities: &[NormalizedEntity]) -> Vec<Vec<usize>> {
    let mut buckets: HashMap<GridKey, Vec<usize>> = HashMap::new();
    for (index, entity) in entities.iter().enumerate() {
        if let Some((start, end)) = entity.geometry.open_endpoints() {
            let start_key = quantize(start);
            let end_key = quantize(end);
            if start_key.is_none() || end_key.is_none() {
                debug!(index, "端点坐标超出量化范围，不参与连接");
            }
            if let Some(key) = start_key {
                buckets.entry(key).or_default().push(index);
            }
            if let Some(key) = end_key.filter(|key| Some(*key) != start_key) {
                buckets.entry(key).or_default().push(index);
            }
        }
    }

    let mut adjacency = vec![Vec::new(); entities.len()];
    for members in buckets.values() {
        // 星形连接即可保持连通性
        let Some((&hub, rest)) = members.split_first() else {
            continue;
        };
        for &other in rest {
            if other != hub {
                adjacency[hub].push(other);
                adjacency[other].push(hub);
            }
        }
    }
    for neighbours in &mut adjacency {
        neighbours.sort_unstable();
        neighbours.dedup();
    }
    adjacency
}

/// 候选点按 (x, y) 字典序取最小者，保证结果可复现。
fn pick_pierce_point(entities: &[NormalizedEntity], members: &[usize]) -> Point2 {
    members
        .iter()
        .flat_map(|&index| {
            let geometry = &entities[index].geometry;
            match geometry.open_endpoints() {
                Some((start, end)) => [start, end],
                None => {
                    let start = geometry.start_point();
                    [start, start]
                }
            }
        })
        .min_by(|a, b| a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y())))
        .unwrap_or(Point2::new(0.0, 0.0))
}
