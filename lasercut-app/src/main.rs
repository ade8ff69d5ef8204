use std::path::PathBuf;

use clap::Parser;
use lasercut_config::{AppConfig, ConfigError};
use lasercut_frontend::cli::{OutputFormat, ReportOptions};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 激光切割 DXF 分析：切割长度、穿孔点、切割顺序、排样与费用估算。
#[derive(Debug, Parser)]
#[command(name = "lasercut")]
#[command(version)]
struct Cli {
    /// 待分析的 DXF 文件
    file: PathBuf,

    /// 配置文件路径（默认读取 LASERCUT_CONFIG 或 ./config/default.toml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 板材尺寸，格式为 宽x高（毫米），例如 3000x1500
    #[arg(long, value_parser = parse_sheet)]
    sheet: Option<(f64, f64)>,

    /// 板材边距（毫米）
    #[arg(long)]
    margin: Option<f64>,

    /// 零件间距（毫米）
    #[arg(long)]
    gap: Option<f64>,

    /// 需要加工的零件数量
    #[arg(long)]
    qty: Option<usize>,

    /// 候选旋转角，逗号分隔，例如 0,90
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    rotations: Option<Vec<i32>>,

    /// 材料名称，需与配置中的 [[cutting.materials]] 对应
    #[arg(long)]
    material: Option<String>,

    /// 以 JSON 输出完整报告
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut config = load_configuration(cli.config.clone());
    init_logging(&config);
    info!("启动激光切割分析");

    apply_overrides(&mut config, &cli);
    let options = ReportOptions {
        material: cli.material.clone(),
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
    };

    match lasercut_frontend::run_report(&cli.file, &config, &options) {
        Ok(report) => print!("{report}"),
        Err(err) => {
            error!(path = %cli.file.display(), error = %err, "生成加工报告失败");
            std::process::exit(1);
        }
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    let nesting = &mut config.nesting;
    if let Some((width, height)) = cli.sheet {
        nesting.sheet_width = width;
        nesting.sheet_height = height;
    }
    if let Some(margin) = cli.margin {
        nesting.margin = margin;
    }
    if let Some(gap) = cli.gap {
        nesting.gap = gap;
    }
    if let Some(quantity) = cli.qty {
        nesting.quantity = quantity;
    }
    if let Some(rotations) = &cli.rotations {
        nesting.rotations = rotations.clone();
    }
}

fn parse_sheet(value: &str) -> Result<(f64, f64), String> {
    let (width, height) = value
        .split_once(['x', 'X', '*'])
        .ok_or_else(|| format!("板材尺寸应为 宽x高，实际为 `{value}`"))?;
    let parse = |text: &str| {
        text.trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite() && *number > 0.0)
            .ok_or_else(|| format!("无效的板材尺寸 `{text}`"))
    };
    Ok((parse(width)?, parse(height)?))
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    // RUST_LOG 优先于配置文件
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
