//! 表格规则引擎
//!
//! 对导入的表格数据应用用户以自然语言书写的条件规则：
//! - 条件解析与析取范式表达式编译（解析失败按永不成立处理）
//! - 按规则顺序首个命中打标签
//! - 按分组字段汇总计数与求和
//! - 工作簿快照的持久化接口

pub mod aggregation;
pub mod cli;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;
pub mod parser;
pub mod persistence;
pub mod row;
pub mod store;
pub mod workbook;

pub use aggregation::{
    Aggregator, GroupFieldOption, GroupKey, MAX_GROUP_CARDINALITY, SummaryRow, UNMATCHED,
};
pub use cli::Cli;
pub use compiler::ExpressionCompiler;
pub use error::{Result, RuleError, ValidationError};
pub use evaluator::ConditionEvaluator;
pub use executor::RuleExecutor;
pub use models::{
    AndGroup, Clause, Condition, EvaluationResult, Expression, Operand, Rule, RuleDraft,
};
pub use operators::{LogicalOperator, Operator};
pub use parser::ConditionParser;
pub use persistence::{JsonFileRepository, WorkbookRepository, open_workbook, save_workbook};
pub use row::{RULE_COLUMN, Row, parse_number};
pub use store::{Direction, RuleSet};
pub use workbook::{SharedWorkbook, Workbook, WorkbookSnapshot};
