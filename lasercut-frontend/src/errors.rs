use thiserror::Error;

use lasercut_io::IoError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("未知材料 `{0}`，请检查配置中的 [[cutting.materials]]")]
    UnknownMaterial(String),
    #[error("材料 `{0}` 的切割速度必须为正数")]
    InvalidMaterial(String),
    #[error("序列化报告失败: {0}")]
    Serialize(#[from] serde_json::Error),
}
