//! 命令行参数定义
//!
//! 命令行参数优先于配置文件与 `ROWRULE_*` 环境变量中的 `workbook` 配置。

use clap::Parser;
use rowrule_shared::config::WorkbookConfig;

/// 表格规则引擎命令行工具
///
/// 读取工作簿快照，按规则顺序重新打标签，输出标注后的行与汇总结果。
#[derive(Parser, Debug)]
#[command(name = "rule-engine")]
#[command(version, about = "表格规则引擎：重新打标签并输出汇总")]
pub struct Cli {
    /// 工作簿快照路径，缺省时使用配置中的 workbook.snapshot_path
    pub snapshot: Option<String>,

    /// 分组字段，可重复指定，按出现顺序组成分组键
    #[arg(short = 'g', long = "group-field", value_name = "FIELD")]
    pub group_fields: Vec<String>,

    /// 求和字段
    #[arg(short, long, value_name = "FIELD")]
    pub sum_field: Option<String>,

    /// 运行结束后把工作簿写回快照文件
    #[arg(long)]
    pub write_back: bool,
}

impl Cli {
    /// 用命令行参数覆盖工作簿配置，未指定的参数保留原配置
    pub fn apply_to(&self, config: &mut WorkbookConfig) {
        if let Some(snapshot) = &self.snapshot {
            config.snapshot_path = snapshot.clone();
        }
        if !self.group_fields.is_empty() {
            config.group_fields = self.group_fields.clone();
        }
        if let Some(sum_field) = &self.sum_field {
            config.sum_field = Some(sum_field.clone());
        }
        if self.write_back {
            config.write_back = true;
        }
    }
}
