//! 工作簿端到端测试
//!
//! 测试覆盖完整的使用流程，包括：
//! - 导入数据与规则维护
//! - 快照持久化与恢复
//! - 重新导入后的全量重算

pub mod data;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
