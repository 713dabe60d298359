//! 规则引擎领域模型

use crate::compiler::ExpressionCompiler;
use crate::operators::{LogicalOperator, Operator};
use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 规则定义
///
/// `expression` 由 `text` 编译而来，反序列化时同样从 `text` 重新编译。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RuleDraft")]
pub struct Rule {
    pub name: String,
    pub text: String,
    pub expression: Expression,
}

impl Rule {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let expression = ExpressionCompiler::compile(&text);
        Self {
            name: name.into(),
            text,
            expression,
        }
    }

    /// 规则是否命中该行
    pub fn matches(&self, row: &Row) -> bool {
        self.expression.matches(row)
    }

    /// 持久化形式（只保留名称和原文）
    pub fn to_draft(&self) -> RuleDraft {
        RuleDraft {
            name: self.name.clone(),
            text: self.text.clone(),
        }
    }
}

impl From<RuleDraft> for Rule {
    fn from(draft: RuleDraft) -> Self {
        Self::new(draft.name, draft.text)
    }
}

/// 规则的持久化形式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    pub text: String,
}

impl RuleDraft {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// 条件操作数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Number(f64),
    Text(String),
}

impl Operand {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// 叶子条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Operand,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Operand>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator.symbol(), self.value)
    }
}

/// AND 组中的一个子句
///
/// 无法识别的条件文本编译为 `Never`，对任何行都不成立。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Clause {
    Condition(Condition),
    Never { source: String },
}

impl Clause {
    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never { .. })
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Condition(cond) => write!(f, "{}", cond),
            Self::Never { source } => write!(f, "<unrecognized: {:?}>", source),
        }
    }
}

/// 合取组：全部子句成立时成立
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndGroup {
    pub clauses: Vec<Clause>,
}

impl AndGroup {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }
}

impl fmt::Display for AndGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = format!(" {} ", LogicalOperator::And);
        let parts: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(&sep))
    }
}

/// 析取范式表达式：任一合取组成立时成立
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub groups: Vec<AndGroup>,
}

impl Expression {
    pub fn new(groups: Vec<AndGroup>) -> Self {
        Self { groups }
    }

    /// 对该行求值（短路）
    pub fn matches(&self, row: &Row) -> bool {
        self.groups.iter().any(|group| {
            group.clauses.iter().all(|clause| match clause {
                Clause::Condition(cond) => crate::evaluator::ConditionEvaluator::evaluate(row, cond),
                Clause::Never { .. } => false,
            })
        })
    }

    /// 所有可识别的叶子条件
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups
            .iter()
            .flat_map(|g| g.clauses.iter())
            .filter_map(|c| match c {
                Clause::Condition(cond) => Some(cond),
                Clause::Never { .. } => None,
            })
    }

    /// 降级为 `Never` 的条件原文
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.clauses.iter())
            .filter_map(|c| match c {
                Clause::Never { source } => Some(source.as_str()),
                Clause::Condition(_) => None,
            })
    }

    /// 每个合取组都含有 `Never` 时，表达式对任何行都不成立
    pub fn is_never(&self) -> bool {
        self.groups
            .iter()
            .all(|g| g.clauses.iter().any(Clause::is_never))
    }

    /// 引用到的字段名（统一小写）
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        self.conditions().map(|c| c.field.to_lowercase()).collect()
    }

    /// 是否引用了指定字段（忽略大小写）
    pub fn references(&self, field: &str) -> bool {
        self.referenced_fields().contains(&field.to_lowercase())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() {
            return write!(f, "<never>");
        }
        let sep = format!(" {} ", LogicalOperator::Or);
        let parts: Vec<String> = self
            .groups
            .iter()
            .map(|g| {
                if g.clauses.len() > 1 && self.groups.len() > 1 {
                    format!("({})", g)
                } else {
                    g.to_string()
                }
            })
            .collect();
        write!(f, "{}", parts.join(&sep))
    }
}

/// 评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_name: String,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
}

impl EvaluationResult {
    pub fn new(rule_name: String) -> Self {
        Self {
            matched: false,
            rule_name,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
        }
    }
}
