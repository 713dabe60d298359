//! 表格规则引擎命令行
//!
//! 读取工作簿快照，重新打标签并汇总，把结果以 JSON 输出到标准输出。

use anyhow::{Context, Result};
use clap::Parser;
use rowrule_shared::config::AppConfig;
use rowrule_shared::observability;
use rule_engine::{Cli, JsonFileRepository, Workbook, open_workbook, save_workbook};
use serde_json::json;
use tracing::{info, warn};

const SERVICE_NAME: &str = "rule-engine";

fn main() -> Result<()> {
    // 先解析参数，--help/--version 在此直接退出
    let cli = Cli::parse();

    // 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let mut config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            ..AppConfig::default()
        }
    });
    cli.apply_to(&mut config.workbook);

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config)?;

    let snapshot_path = config.workbook.snapshot_path.clone();
    info!(path = %snapshot_path, "Starting rule-engine...");

    let repository = JsonFileRepository::new(&snapshot_path);
    let mut workbook = open_workbook(&repository)
        .with_context(|| format!("无法打开工作簿快照: {}", snapshot_path))?;

    apply_overrides(&mut workbook, &config)?;
    workbook.recompute();

    let output = json!({
        "rows": workbook.rows(),
        "summary": workbook.summary(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if config.workbook.write_back {
        save_workbook(&repository, &workbook)
            .with_context(|| format!("无法写回工作簿快照: {}", snapshot_path))?;
    }

    info!(
        rows = workbook.rows().len(),
        rules = workbook.rules().len(),
        groups = workbook.summary().len(),
        "Run complete"
    );
    Ok(())
}

/// 用配置（已合并命令行参数）覆盖快照中的分组字段与求和字段
fn apply_overrides(workbook: &mut Workbook, config: &AppConfig) -> Result<()> {
    if !config.workbook.group_fields.is_empty() {
        workbook
            .set_group_fields(config.workbook.group_fields.iter().cloned())
            .context("分组字段配置无效")?;
    }

    if let Some(sum_field) = config.workbook.sum_field.as_deref() {
        if !workbook.columns().iter().any(|c| c == sum_field) {
            warn!(sum_field, "求和字段不在表头中，汇总值将为 0");
        }
        workbook.set_sum_field(Some(sum_field));
    }

    Ok(())
}
