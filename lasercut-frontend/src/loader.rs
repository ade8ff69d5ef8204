use std::path::{Path, PathBuf};

use lasercut_core::analysis::ParseResult;
use lasercut_core::entity::{PartBox, bounding_box};
use lasercut_engine::analyze;
use lasercut_io::{DxfFacade, EntityLoader};
use tracing::info;

use crate::errors::FrontendError;

/// 加载并分析后的图纸。
#[derive(Debug, Clone)]
pub struct LoadedDrawing {
    pub path: PathBuf,
    pub analysis: ParseResult,
    pub part: PartBox,
}

/// 通过默认的 DXF 加载器读取图纸并完成分析。
pub fn load_drawing(path: &Path) -> Result<LoadedDrawing, FrontendError> {
    load_drawing_with(&DxfFacade::new(), path)
}

/// 使用指定加载器读取图纸，便于替换数据来源。
pub fn load_drawing_with(
    loader: &impl EntityLoader,
    path: &Path,
) -> Result<LoadedDrawing, FrontendError> {
    let entities = loader.load(path)?;
    info!(path = %path.display(), entities = entities.len(), "从 DXF 加载实体成功");
    let analysis = analyze(entities);
    let part = bounding_box(&analysis.entities);
    Ok(LoadedDrawing {
        path: path.to_path_buf(),
        analysis,
        part,
    })
}
