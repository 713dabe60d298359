//! 工作簿
//!
//! 持有导入的行、规则集、分组键和求和字段，并维护当前汇总结果。
//! 每个变更操作完成后都同步执行一次全量重算（打标签和/或汇总），
//! 调用方在变更后重新读取 `rows()`、`rules()`、`summary()` 即可。

use crate::aggregation::{Aggregator, GroupFieldOption, GroupKey, SummaryRow};
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{EvaluationResult, Rule, RuleDraft};
use crate::row::Row;
use crate::store::{Direction, RuleSet};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// 工作簿的持久化形式
///
/// 只保存规则名称和原文，恢复时重新编译。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSnapshot {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub rules: Vec<RuleDraft>,
    #[serde(default)]
    pub rule_order: Vec<usize>,
    #[serde(default)]
    pub group_fields: Vec<String>,
    #[serde(default)]
    pub sum_field: Option<String>,
}

/// 工作簿
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    rows: Vec<Row>,
    rules: RuleSet,
    group_key: GroupKey,
    sum_field: Option<String>,
    summary: Vec<SummaryRow>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从快照恢复并立即重算
    ///
    /// 快照中分组字段为空时使用默认分组 `["Rule"]`。
    #[instrument(skip(snapshot), fields(rows = snapshot.rows.len(), rules = snapshot.rules.len()))]
    pub fn restore(snapshot: WorkbookSnapshot) -> Result<Self> {
        let rules = RuleSet::restore(snapshot.rules, snapshot.rule_order)?;
        let group_key = if snapshot.group_fields.is_empty() {
            GroupKey::default()
        } else {
            GroupKey::new(snapshot.group_fields)?
        };

        let mut workbook = Self {
            rows: snapshot.rows,
            rules,
            group_key,
            sum_field: normalize_field(snapshot.sum_field.as_deref()),
            summary: Vec::new(),
        };
        workbook.recompute();

        info!("工作簿已恢复");
        Ok(workbook)
    }

    /// 生成快照
    pub fn snapshot(&self) -> WorkbookSnapshot {
        WorkbookSnapshot {
            rows: self.rows.clone(),
            rules: self.rules.drafts(),
            rule_order: self.rules.order().to_vec(),
            group_fields: self.group_key.fields().to_vec(),
            sum_field: self.sum_field.clone(),
        }
    }

    // ==================== 变更操作 ====================

    /// 重新导入数据，替换全部行
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn import_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.recompute();
    }

    /// 新增规则，返回存储槽位
    pub fn add_rule(&mut self, name: &str, text: &str) -> Result<usize> {
        let index = self.rules.add(name, text)?;
        self.recompute();
        Ok(index)
    }

    /// 修改规则
    pub fn edit_rule(&mut self, index: usize, name: &str, text: &str) -> Result<()> {
        self.rules.edit(index, name, text)?;
        self.recompute();
        Ok(())
    }

    /// 删除规则
    pub fn delete_rule(&mut self, index: usize) -> Result<Rule> {
        let removed = self.rules.delete(index)?;
        self.recompute();
        Ok(removed)
    }

    /// 调整规则评估顺序，返回顺序是否变化
    pub fn move_rule(&mut self, index: usize, direction: Direction) -> bool {
        let moved = self.rules.move_rule(index, direction);
        self.recompute();
        moved
    }

    /// 设置分组字段
    pub fn set_group_fields<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_key = GroupKey::new(fields)?;
        self.resummarize();
        Ok(())
    }

    /// 按多选语义重新选择分组字段
    pub fn reselect_group_fields<S: AsRef<str>>(&mut self, selected: &[S]) -> Result<()> {
        self.group_key = self.group_key.reselect(selected)?;
        self.resummarize();
        Ok(())
    }

    /// 设置求和字段，`None` 或空串表示只计数
    pub fn set_sum_field(&mut self, field: Option<&str>) {
        self.sum_field = normalize_field(field);
        self.resummarize();
    }

    /// 全量重算：重新打标签并汇总
    pub fn recompute(&mut self) {
        self.rows = RuleExecutor::new().label_rows(&self.rows, &self.rules);
        self.resummarize();
    }

    /// 只重算汇总
    fn resummarize(&mut self) {
        self.summary =
            Aggregator::summarize(&self.rows, &self.group_key, self.sum_field.as_deref());
    }

    // ==================== 查询 ====================

    /// 已打标签的行
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn summary(&self) -> &[SummaryRow] {
        &self.summary
    }

    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }

    pub fn sum_field(&self) -> Option<&str> {
        self.sum_field.as_deref()
    }

    /// 表头（取首行的列）
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.columns().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// 字段的去重值数量
    pub fn field_cardinality(&self, field: &str) -> usize {
        Aggregator::field_cardinality(&self.rows, field)
    }

    /// 分组字段候选项
    pub fn group_field_options(&self) -> Vec<GroupFieldOption> {
        Aggregator::group_field_options(&self.rows, self.sum_field.as_deref())
    }

    /// 按评估顺序逐条解释某一行的求值过程，遇到首个命中即停止
    pub fn explain(&self, row_index: usize) -> Option<Vec<EvaluationResult>> {
        let row = self.rows.get(row_index)?;
        let executor = RuleExecutor::new().with_trace();

        let mut results = Vec::new();
        for rule in self.rules.ordered() {
            let result = executor.execute(rule, row);
            let matched = result.matched;
            results.push(result);
            if matched {
                break;
            }
        }
        Some(results)
    }
}

fn normalize_field(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// 多线程共享的工作簿
///
/// 核心操作本身不加锁；嵌入并发环境时通过读写锁保证单写多读。
#[derive(Debug, Clone, Default)]
pub struct SharedWorkbook {
    inner: Arc<RwLock<Workbook>>,
}

impl SharedWorkbook {
    pub fn new(workbook: Workbook) -> Self {
        Self {
            inner: Arc::new(RwLock::new(workbook)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Workbook> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Workbook> {
        self.inner.write()
    }

    /// 在写锁内执行一次变更
    pub fn update<T>(&self, f: impl FnOnce(&mut Workbook) -> T) -> T {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    pub fn snapshot(&self) -> WorkbookSnapshot {
        self.inner.read().snapshot()
    }
}

impl From<Workbook> for SharedWorkbook {
    fn from(workbook: Workbook) -> Self {
        Self::new(workbook)
    }
}

impl TryFrom<WorkbookSnapshot> for Workbook {
    type Error = RuleError;

    fn try_from(snapshot: WorkbookSnapshot) -> Result<Self> {
        Self::restore(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::UNMATCHED;
    use crate::row::RULE_COLUMN;

    fn sales_rows() -> Vec<Row> {
        vec![
            Row::from_pairs([("Region", "North"), ("Sales", "1500"), ("Product", "Widget")]),
            Row::from_pairs([("Region", "North"), ("Sales", "500"), ("Product", "Gadget")]),
            Row::from_pairs([("Region", "South"), ("Sales", "2500"), ("Product", "Widget")]),
            Row::from_pairs([("Region", "East"), ("Sales", "n/a"), ("Product", "Gizmo")]),
        ]
    }

    fn labels(workbook: &Workbook) -> Vec<&str> {
        workbook
            .rows()
            .iter()
            .map(|r| r.label().unwrap_or("<none>"))
            .collect()
    }

    #[test]
    fn test_import_labels_and_summarizes() {
        let mut workbook = Workbook::new();
        workbook.add_rule("north_big", "If Region is North and Sales > 1000").unwrap();
        workbook.import_rows(sales_rows());

        assert_eq!(labels(&workbook), vec!["north_big", "", "", ""]);
        assert_eq!(workbook.summary().len(), 2);
        assert_eq!(workbook.summary()[0].value(RULE_COLUMN), Some("north_big"));
        assert_eq!(workbook.summary()[1].value(RULE_COLUMN), Some(UNMATCHED));
        assert_eq!(workbook.summary()[1].count, 3);
    }

    #[test]
    fn test_every_rule_mutation_relabels() {
        let mut workbook = Workbook::new();
        workbook.import_rows(sales_rows());
        assert_eq!(labels(&workbook), vec!["", "", "", ""]);

        workbook.add_rule("widgets", "Product contains widget").unwrap();
        workbook.add_rule("big", "Sales >= 1000").unwrap();
        assert_eq!(labels(&workbook), vec!["widgets", "", "widgets", ""]);

        workbook.move_rule(1, Direction::Up);
        assert_eq!(labels(&workbook), vec!["big", "", "big", ""]);

        workbook.edit_rule(1, "huge", "Sales > 2000").unwrap();
        assert_eq!(labels(&workbook), vec!["widgets", "", "huge", ""]);

        workbook.delete_rule(1).unwrap();
        assert_eq!(labels(&workbook), vec!["widgets", "", "widgets", ""]);

        workbook.delete_rule(0).unwrap();
        assert_eq!(labels(&workbook), vec!["", "", "", ""]);
    }

    #[test]
    fn test_rejected_mutation_keeps_state() {
        let mut workbook = Workbook::new();
        workbook.import_rows(sales_rows());
        workbook.add_rule("north", "Region is North").unwrap();
        let before = workbook.snapshot();

        assert!(workbook.add_rule("north", "Region is South").is_err());
        assert!(workbook.edit_rule(0, "", "Region is South").is_err());
        assert!(workbook.delete_rule(5).is_err());
        assert!(workbook.set_group_fields(["Region", "Region"]).is_err());

        assert_eq!(workbook.snapshot(), before);
    }

    #[test]
    fn test_group_and_sum_settings() {
        let mut workbook = Workbook::new();
        workbook.import_rows(sales_rows());
        workbook.set_group_fields(["Region"]).unwrap();
        workbook.set_sum_field(Some("Sales"));

        let summary = workbook.summary();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].value("Region"), Some("North"));
        assert_eq!(summary[0].sum, Some(2000.0));
        assert_eq!(summary[2].value("Region"), Some("East"));
        assert_eq!(summary[2].sum, Some(0.0));

        workbook.set_sum_field(Some("  "));
        assert_eq!(workbook.sum_field(), None);
        assert!(workbook.summary().iter().all(|s| s.sum.is_none()));

        workbook.reselect_group_fields(&["Product", "Region"]).unwrap();
        assert_eq!(workbook.group_key().fields(), &["Region", "Product"]);
        assert_eq!(workbook.summary().len(), 4);
    }

    #[test]
    fn test_snapshot_round_trip_recompiles() {
        let mut workbook = Workbook::new();
        workbook.import_rows(sales_rows());
        workbook.add_rule("north", "Region is North").unwrap();
        workbook.add_rule("big", "Sales > 1000").unwrap();
        workbook.move_rule(1, Direction::Up);
        workbook.set_sum_field(Some("Sales"));

        let json = serde_json::to_string(&workbook.snapshot()).unwrap();
        assert!(!json.contains("expression"));

        let snapshot: WorkbookSnapshot = serde_json::from_str(&json).unwrap();
        let restored = Workbook::restore(snapshot).unwrap();

        assert_eq!(restored.rules().order(), &[1, 0]);
        assert_eq!(restored.rows(), workbook.rows());
        assert_eq!(restored.summary(), workbook.summary());
        assert_eq!(labels(&restored), vec!["big", "north", "big", ""]);
    }

    #[test]
    fn test_restore_defaults_group_key() {
        let snapshot: WorkbookSnapshot = serde_json::from_str(r#"{ "rows": [{"A": "1"}] }"#).unwrap();
        let workbook = Workbook::restore(snapshot).unwrap();
        assert_eq!(workbook.group_key(), &GroupKey::default());
        assert_eq!(workbook.columns(), vec!["A".to_string(), "Rule".to_string()]);
    }

    #[test]
    fn test_explain_stops_at_first_match() {
        let mut workbook = Workbook::new();
        workbook.import_rows(sales_rows());
        workbook.add_rule("south", "Region is South").unwrap();
        workbook.add_rule("widgets", "Product contains widget").unwrap();
        workbook.add_rule("any", "Sales > 0").unwrap();

        let results = workbook.explain(0).unwrap();
        assert_eq!(results.len(), 2);
        assert!(!results[0].matched);
        assert!(results[1].matched);
        assert_eq!(results[1].rule_name, "widgets");

        assert!(workbook.explain(99).is_none());
    }

    #[test]
    fn test_shared_workbook_concurrent_readers() {
        use std::thread;

        let shared = SharedWorkbook::new(Workbook::new());
        shared.update(|wb| {
            wb.import_rows(sales_rows());
            wb.add_rule("north", "Region is North")
        })
        .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reader = shared.clone();
                thread::spawn(move || reader.read().summary().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
        assert_eq!(shared.snapshot().rules.len(), 1);
    }
}
