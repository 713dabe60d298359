//! 配置管理模块
//!
//! 支持多层配置文件加载与环境变量覆盖，提供类型安全的配置访问。

use crate::observability::ObservabilityConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "ROWRULE";

/// 工作簿配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    /// 工作簿快照文件路径
    pub snapshot_path: String,
    /// 覆盖快照中的分组字段，为空时沿用快照
    pub group_fields: Vec<String>,
    /// 覆盖快照中的求和字段
    pub sum_field: Option<String>,
    /// 运行结束后是否把工作簿写回快照文件
    pub write_back: bool,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "workbook.json".to_string(),
            group_fields: Vec::new(),
            sum_field: None,
            write_back: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub workbook: WorkbookConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（ROWRULE_ 前缀，层级用双下划线，如 ROWRULE_WORKBOOK__SUM_FIELD -> workbook.sum_field）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("ROWRULE_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    /// 从指定目录加载配置
    pub fn load_from(config_dir: &Path, env: &str, service_name: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .set_default("observability.service_name", service_name)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            // ROWRULE_WORKBOOK__GROUP_FIELDS=Region,Rule -> workbook.group_fields
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("workbook.group_fields")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
