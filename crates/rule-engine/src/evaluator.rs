//! 条件评估器
//!
//! 对单个叶子条件求值。所有分支都是全函数：缺失的列按空串处理，
//! 无法解析的数值按 NaN 参与比较（与 NaN 的任何大小比较都为 false）。

use crate::models::{Condition, Operand};
use crate::operators::Operator;
use crate::row::{Row, parse_number};

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 对一行数据评估条件，字段名忽略大小写
    pub fn evaluate(row: &Row, cond: &Condition) -> bool {
        Self::evaluate_cell(row.lookup(&cond.field), cond.operator, &cond.value)
    }

    /// 评估单元格
    ///
    /// # Arguments
    /// * `cell` - 行中对应列的值，列不存在时为 `None`
    /// * `operator` - 操作符
    /// * `expected` - 规则中的操作数
    pub fn evaluate_cell(cell: Option<&str>, operator: Operator, expected: &Operand) -> bool {
        match operator {
            Operator::Eq => Self::text_eq(cell, expected),
            Operator::Neq => !Self::text_eq(cell, expected),
            Operator::Contains => Self::contains(cell, expected),
            Operator::NotContains => !Self::contains(cell, expected),
            Operator::Gt => Self::compare(cell, expected, |a, b| a > b),
            Operator::Gte => Self::compare(cell, expected, |a, b| a >= b),
            Operator::Lt => Self::compare(cell, expected, |a, b| a < b),
            Operator::Lte => Self::compare(cell, expected, |a, b| a <= b),
        }
    }

    /// 去空白、转小写后比较
    fn text_eq(cell: Option<&str>, expected: &Operand) -> bool {
        let actual = cell.unwrap_or("").trim().to_lowercase();
        let expected = expected.to_string().trim().to_lowercase();
        actual == expected
    }

    /// 转小写后做子串检查，不去空白
    fn contains(cell: Option<&str>, expected: &Operand) -> bool {
        let actual = cell.unwrap_or("").to_lowercase();
        let needle = expected.to_string().to_lowercase();
        actual.contains(&needle)
    }

    /// 数值比较
    fn compare<F>(cell: Option<&str>, expected: &Operand, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        let actual = cell.map(parse_number).unwrap_or(f64::NAN);
        let expected = match expected {
            Operand::Number(n) => *n,
            Operand::Text(s) => parse_number(s),
        };
        cmp(actual, expected)
    }
}
