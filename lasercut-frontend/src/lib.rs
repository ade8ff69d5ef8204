pub mod cli;
pub mod errors;
pub mod estimate;
pub mod loader;

use std::path::Path;

use cli::ReportOptions;
use errors::FrontendError;
use lasercut_config::AppConfig;
use tracing::info;

/// 加载图纸、排样并估算费用，返回渲染好的报告文本。
pub fn run_report(
    path: &Path,
    config: &AppConfig,
    options: &ReportOptions,
) -> Result<String, FrontendError> {
    info!(path = %path.display(), format = ?options.format, "生成加工报告");
    let drawing = loader::load_drawing(path)?;
    let report = cli::build_report(drawing, config, options.material.as_deref())?;
    cli::render(&report, options.format)
}
