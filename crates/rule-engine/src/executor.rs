//! 规则执行器
//!
//! 按规则顺序对每一行做首个命中求值，并把命中的规则名写入 `Rule` 列。
//! 单轮求值而非不动点：若某条规则引用了 `Rule` 列，读到的是上一轮写入的标签。

use crate::evaluator::ConditionEvaluator;
use crate::models::{Clause, EvaluationResult, Rule};
use crate::row::Row;
use crate::store::RuleSet;
use rowrule_shared::observability::metrics::record_label_pass;
use std::time::Instant;
use tracing::debug;

/// 规则执行器
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 对单行执行单条规则，返回命中情况和追踪信息
    pub fn execute(&self, rule: &Rule, row: &Row) -> EvaluationResult {
        let mut result = EvaluationResult::new(rule.name.clone());

        for (g, group) in rule.expression.groups.iter().enumerate() {
            if self.evaluate_group(g, &group.clauses, row, &mut result) {
                result.matched = true;
                if self.trace_enabled {
                    result
                        .evaluation_trace
                        .push(format!("groups[{}]: OR 短路 - 合取组匹配", g));
                }
                return result;
            }
        }

        if self.trace_enabled {
            result.evaluation_trace.push("OR 组无匹配".to_string());
        }
        result
    }

    /// 评估合取组（短路求值）
    fn evaluate_group(
        &self,
        index: usize,
        clauses: &[Clause],
        row: &Row,
        result: &mut EvaluationResult,
    ) -> bool {
        let mut matched_conditions = Vec::with_capacity(clauses.len());
        for (i, clause) in clauses.iter().enumerate() {
            let path = format!("groups[{}].clauses[{}]", index, i);
            let matched = match clause {
                Clause::Condition(cond) => ConditionEvaluator::evaluate(row, cond),
                Clause::Never { .. } => false,
            };

            if self.trace_enabled {
                result.evaluation_trace.push(format!(
                    "{}: {} => {}",
                    path,
                    clause,
                    if matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
            }

            if !matched {
                if self.trace_enabled {
                    result
                        .evaluation_trace
                        .push(format!("groups[{}]: AND 短路 - 子句 {} 不匹配", index, i));
                }
                return false;
            }
            matched_conditions.push(format!("{}: {}", path, clause));
        }
        // 只记录整组成立的条件
        result.matched_conditions.extend(matched_conditions);
        true
    }

    /// 按规则顺序找出首个命中的规则
    pub fn first_match<'a>(&self, rules: &'a RuleSet, row: &Row) -> Option<&'a Rule> {
        rules.ordered().find(|rule| rule.matches(row))
    }

    /// 为每一行重新计算标签，未命中任何规则的行标签为空串
    pub fn label_rows(&self, rows: &[Row], rules: &RuleSet) -> Vec<Row> {
        let start = Instant::now();

        let mut matched = 0usize;
        let labeled: Vec<Row> = rows
            .iter()
            .map(|row| {
                let label = match self.first_match(rules, row) {
                    Some(rule) => {
                        matched += 1;
                        rule.name.as_str()
                    }
                    None => "",
                };
                row.with_label(label)
            })
            .collect();

        let unmatched = rows.len() - matched;
        record_label_pass(matched, unmatched, start.elapsed().as_secs_f64());

        debug!(
            rows = rows.len(),
            rules = rules.len(),
            matched,
            unmatched,
            "标签计算完成"
        );
        labeled
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}
