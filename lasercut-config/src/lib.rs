use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。解析核心不读取配置，由宿主显式传入需要的部分。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub nesting: NestingConfig,
    #[serde(default)]
    pub cutting: CuttingConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `LASERCUT_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("LASERCUT_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 排样默认参数（毫米）。命令行参数可逐项覆盖。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NestingConfig {
    pub sheet_width: f64,
    pub sheet_height: f64,
    pub margin: f64,
    pub gap: f64,
    pub quantity: usize,
    pub rotations: Vec<i32>,
}

impl Default for NestingConfig {
    fn default() -> Self {
        Self {
            sheet_width: 3000.0,
            sheet_height: 1500.0,
            margin: 10.0,
            gap: 5.0,
            quantity: 1,
            rotations: vec![0, 90],
        }
    }
}

/// 材料切割参数，用于估算加工时间与费用。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaterialProfile {
    pub name: String,
    pub thickness_mm: f64,
    pub speed_mm_per_min: f64,
    pub pierce_time_s: f64,
    #[serde(default)]
    pub machine_cost_per_min: f64,
    #[serde(default)]
    pub gas_cost_per_min: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CuttingConfig {
    #[serde(default = "CuttingConfig::default_material")]
    pub default_material: String,
    #[serde(default = "CuttingConfig::default_materials")]
    pub materials: Vec<MaterialProfile>,
}

impl CuttingConfig {
    fn default_material() -> String {
        "mild-steel-3".to_string()
    }

    fn default_materials() -> Vec<MaterialProfile> {
        vec![
            MaterialProfile {
                name: "mild-steel-3".to_string(),
                thickness_mm: 3.0,
                speed_mm_per_min: 3600.0,
                pierce_time_s: 0.5,
                machine_cost_per_min: 1.2,
                gas_cost_per_min: 0.3,
            },
            MaterialProfile {
                name: "stainless-2".to_string(),
                thickness_mm: 2.0,
                speed_mm_per_min: 4200.0,
                pierce_time_s: 0.4,
                machine_cost_per_min: 1.2,
                gas_cost_per_min: 0.9,
            },
            MaterialProfile {
                name: "aluminium-4".to_string(),
                thickness_mm: 4.0,
                speed_mm_per_min: 2400.0,
                pierce_time_s: 0.8,
                machine_cost_per_min: 1.2,
                gas_cost_per_min: 0.9,
            },
        ]
    }

    /// 按名称查找材料，名称比较不区分大小写。
    pub fn material(&self, name: &str) -> Option<&MaterialProfile> {
        self.materials
            .iter()
            .find(|profile| profile.name.eq_ignore_ascii_case(name))
    }
}

impl Default for CuttingConfig {
    fn default() -> Self {
        Self {
            default_material: Self::default_material(),
            materials: Self::default_materials(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.nesting.rotations, vec![0, 90]);
        assert_eq!(cfg.nesting.quantity, 1);
        let default_material = cfg
            .cutting
            .material(&cfg.cutting.default_material)
            .expect("default material must exist");
        assert!(default_material.speed_mm_per_min > 0.0);
    }

    #[test]
    fn material_lookup_ignores_case() {
        let cfg = CuttingConfig::default();
        assert!(cfg.material("STAINLESS-2").is_some());
        assert!(cfg.material("titanium").is_none());
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [nesting]
            sheet_width = 2500.0
            sheet_height = 1250.0
            rotations = [0, 90, 180, 270]

            [cutting]
            default_material = "brass-1"

            [[cutting.materials]]
            name = "brass-1"
            thickness_mm = 1.0
            speed_mm_per_min = 5000.0
            pierce_time_s = 0.2
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.nesting.sheet_width, 2500.0);
        assert_eq!(cfg.nesting.sheet_height, 1250.0);
        assert_eq!(cfg.nesting.margin, 10.0, "未给出的字段沿用默认值");
        assert_eq!(cfg.nesting.rotations.len(), 4);
        assert_eq!(cfg.cutting.materials.len(), 1);
        let brass = cfg.cutting.material("brass-1").expect("brass profile");
        assert_eq!(brass.gas_cost_per_min, 0.0);
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[nesting]\nsheet_width = \"wide\"").unwrap();
        match AppConfig::from_file(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
