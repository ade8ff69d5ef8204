use std::fs;
use std::path::Path;

use lasercut_core::entity::NormalizedEntity;
use lasercut_core::geometry::Point2;
use thiserror::Error;
use tracing::debug;

mod normalize;

pub use normalize::normalize_entities;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("未找到 ENTITIES 段，文件中没有可切割的几何")]
    MissingSection,
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 从文件加载归一化实体的抽象，便于宿主替换数据来源。
pub trait EntityLoader {
    fn load(&self, path: &Path) -> Result<Vec<NormalizedEntity>, IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 读取文件全文。非 UTF-8 字节按替换字符处理，老版本 DXF 常用本地代码页。
    pub fn read_source(&self, path: &Path) -> Result<String, IoError> {
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl EntityLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Vec<NormalizedEntity>, IoError> {
        let source = self.read_source(path)?;
        read_entities(&source)
    }
}

/// 解析 DXF 文本并返回归一化实体。
///
/// 唯一的失败情形是找不到 ENTITIES 段；格式错误的组、不支持的实体类型
/// 与退化几何都会被静默跳过。
pub fn read_entities(source: &str) -> Result<Vec<NormalizedEntity>, IoError> {
    let raw = extract_entities(source)?;
    Ok(normalize_entities(raw))
}

/// 只抽取 ENTITIES 段内受支持的原始实体，不做有效性过滤。
pub fn extract_entities(source: &str) -> Result<Vec<RawEntity>, IoError> {
    DxfParser::new(source).parse()
}

/// 抽取阶段的原始实体。缺失的数值字段按 0 处理，无法解析的数值记为 NaN，
/// 由归一化阶段统一过滤。
#[derive(Debug, Clone, PartialEq)]
pub enum RawEntity {
    Line {
        layer: String,
        start: Point2,
        end: Point2,
    },
    Circle {
        layer: String,
        center: Point2,
        radius: f64,
    },
    Arc {
        layer: String,
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Polyline {
        layer: String,
        vertices: Vec<Point2>,
        closed_flag: bool,
    },
}

impl RawEntity {
    pub fn layer(&self) -> &str {
        match self {
            RawEntity::Line { layer, .. }
            | RawEntity::Circle { layer, .. }
            | RawEntity::Arc { layer, .. }
            | RawEntity::Polyline { layer, .. } => layer,
        }
    }
}

const DEFAULT_LAYER: &str = "0";
const POLYLINE_MESH_FLAGS: i32 = 0x10 | 0x40;

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Vec<RawEntity>, IoError> {
        let mut entities = Vec::new();
        let mut found_entities = false;
        while let Some((code, value)) = self.reader.next_pair() {
            if code != 0 {
                continue;
            }
            if value.eq_ignore_ascii_case("EOF") {
                break;
            }
            if !value.eq_ignore_ascii_case("SECTION") {
                continue;
            }
            match self.reader.next_pair() {
                Some((2, name)) if name.eq_ignore_ascii_case("ENTITIES") => {
                    found_entities = true;
                    self.parse_entities(&mut entities);
                }
                Some(pair) => {
                    // 其他段（HEADER、BLOCKS 等）的内容在外层循环中被跳过
                    self.reader.put_back(pair);
                }
                None => break,
            }
        }

        if !found_entities {
            return Err(IoError::MissingSection);
        }
        debug!(
            entities = entities.len(),
            skipped_pairs = self.reader.skipped_pairs,
            lines = self.reader.line_number,
            "DXF 实体抽取完成"
        );
        Ok(entities)
    }

    fn parse_entities(&mut self, entities: &mut Vec<RawEntity>) {
        loop {
            let Some((code, value)) = self.reader.next_pair() else {
                debug!("ENTITIES 段缺少 ENDSEC，按文件结尾处理");
                break;
            };
            if code != 0 {
                continue;
            }

            let kind = value.to_ascii_uppercase();
            match kind.as_str() {
                "ENDSEC" => break,
                "LINE" => entities.push(self.parse_line()),
                "CIRCLE" => entities.push(self.parse_circle()),
                "ARC" => entities.push(self.parse_arc()),
                "LWPOLYLINE" => entities.push(self.parse_lwpolyline()),
                "POLYLINE" => {
                    if let Some(polyline) = self.parse_polyline_entity() {
                        entities.push(polyline);
                    }
                }
                "SEQEND" | "VERTEX" => self.skip_entity_body(),
                other => {
                    debug!(entity = other, "忽略不支持的实体类型");
                    self.skip_entity_body();
                }
            }
        }
    }

    /// 读取当前实体的下一个字段；遇到组码 0 时回退并返回 `None`。
    fn next_field(&mut self) -> Option<(i32, String)> {
        match self.reader.next_pair()? {
            (0, value) => {
                self.reader.put_back((0, value));
                None
            }
            pair => Some(pair),
        }
    }

    fn parse_line(&mut self) -> RawEntity {
        let mut layer = None;
        let (mut sx, mut sy, mut ex, mut ey) = (0.0, 0.0, 0.0, 0.0);
        while let Some((code, value)) = self.next_field() {
            match code {
                8 => layer = Some(value),
                10 => sx = parse_f64(&value),
                20 => sy = parse_f64(&value),
                11 => ex = parse_f64(&value),
                21 => ey = parse_f64(&value),
                _ => {} // Z 坐标、颜色、线型等与切割无关
            }
        }
        RawEntity::Line {
            layer: layer_or_default(layer),
            start: Point2::new(sx, sy),
            end: Point2::new(ex, ey),
        }
    }

    fn parse_circle(&mut self) -> RawEntity {
        let mut layer = None;
        let (mut cx, mut cy, mut radius) = (0.0, 0.0, 0.0);
        while let Some((code, value)) = self.next_field() {
            match code {
                8 => layer = Some(value),
                10 => cx = parse_f64(&value),
                20 => cy = parse_f64(&value),
                40 => radius = parse_f64(&value),
                _ => {}
            }
        }
        RawEntity::Circle {
            layer: layer_or_default(layer),
            center: Point2::new(cx, cy),
            radius,
        }
    }

    fn parse_arc(&mut self) -> RawEntity {
        let mut layer = None;
        let (mut cx, mut cy, mut radius) = (0.0, 0.0, 0.0);
        let (mut start_angle, mut end_angle) = (0.0, 0.0);
        while let Some((code, value)) = self.next_field() {
            match code {
                8 => layer = Some(value),
                10 => cx = parse_f64(&value),
                20 => cy = parse_f64(&value),
                40 => radius = parse_f64(&value),
                50 => start_angle = parse_f64(&value),
                51 => end_angle = parse_f64(&value),
                _ => {}
            }
        }
        RawEntity::Arc {
            layer: layer_or_default(layer),
            center: Point2::new(cx, cy),
            radius,
            start_angle,
            end_angle,
        }
    }

    /// LWPOLYLINE 为单记录实体：顶点由组码 10 (X) 开启、随后的 20 (Y) 补全。
    fn parse_lwpolyline(&mut self) -> RawEntity {
        let mut layer = None;
        let mut closed_flag = false;
        let mut vertices = Vec::new();
        let mut pending_x: Option<f64> = None;
        while let Some((code, value)) = self.next_field() {
            match code {
                8 => layer = Some(value),
                70 => closed_flag = parse_i32(&value) & 0x01 == 0x01,
                10 => {
                    if let Some(x) = pending_x.replace(parse_f64(&value)) {
                        vertices.push(Point2::new(x, 0.0));
                    }
                }
                20 => match pending_x.take() {
                    Some(x) => vertices.push(Point2::new(x, parse_f64(&value))),
                    None => debug!(value = %value, "LWPOLYLINE 的 Y 坐标缺少对应的 X，已忽略"),
                },
                _ => {} // 42 (bulge)、宽度等不参与直线段几何
            }
        }
        if let Some(x) = pending_x {
            vertices.push(Point2::new(x, 0.0));
        }
        RawEntity::Polyline {
            layer: layer_or_default(layer),
            vertices,
            closed_flag,
        }
    }

    /// POLYLINE 为多记录实体：表头之后是若干 VERTEX，直到 SEQEND。
    fn parse_polyline_entity(&mut self) -> Option<RawEntity> {
        let mut layer = None;
        let mut flags = 0;
        while let Some((code, value)) = self.next_field() {
            match code {
                8 => layer = Some(value),
                70 => flags = parse_i32(&value),
                _ => {}
            }
        }

        let mut vertices = Vec::new();
        while let Some((code, value)) = self.reader.next_pair() {
            if code != 0 {
                continue;
            }
            if value.eq_ignore_ascii_case("VERTEX") {
                vertices.push(self.parse_vertex());
            } else if value.eq_ignore_ascii_case("SEQEND") {
                self.skip_entity_body();
                break;
            } else {
                debug!(next = %value, "POLYLINE 缺少 SEQEND，提前结束顶点序列");
                self.reader.put_back((0, value));
                break;
            }
        }

        if flags & POLYLINE_MESH_FLAGS != 0 {
            debug!(flags, vertices = vertices.len(), "忽略网格类 POLYLINE");
            return None;
        }
        Some(RawEntity::Polyline {
            layer: layer_or_default(layer),
            vertices,
            closed_flag: flags & 0x01 == 0x01,
        })
    }

    fn parse_vertex(&mut self) -> Point2 {
        let (mut x, mut y) = (0.0, 0.0);
        while let Some((code, value)) = self.next_field() {
            match code {
                10 => x = parse_f64(&value),
                20 => y = parse_f64(&value),
                _ => {}
            }
        }
        Point2::new(x, y)
    }

    fn skip_entity_body(&mut self) {
        while self.next_field().is_some() {}
    }
}

/// 逐两行读取 (组码, 值) 对。组码行无法解析为整数时整组跳过并继续，
/// 以循环代替递归，避免大量坏行导致栈增长。
struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
    skipped_pairs: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
            skipped_pairs: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line)
    }

    fn next_pair(&mut self) -> Option<(i32, String)> {
        if let Some(pair) = self.buffer.take() {
            return Some(pair);
        }

        loop {
            let code_line = self.next_line()?;
            // 文件末尾只剩组码行时视为结束
            let value_line = self.next_line()?;
            match code_line.trim().parse::<i32>() {
                Ok(code) => return Some((code, value_line.trim().to_string())),
                Err(_) => {
                    self.skipped_pairs += 1;
                    debug!(
                        line = self.line_number - 1,
                        code = code_line.trim(),
                        "组码无法解析为整数，跳过该组"
                    );
                }
            }
        }
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只允许回退一次");
        self.buffer = Some(pair);
    }
}

fn layer_or_default(layer: Option<String>) -> String {
    match layer {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_LAYER.to_string(),
    }
}

fn parse_f64(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_i32(raw: &str) -> i32 {
    raw.trim().parse::<i32>().unwrap_or(0)
}
