//! 规则集管理
//!
//! 规则按存储槽位保存在数组中，评估优先级由独立的顺序表（槽位下标的排列）决定。
//! 删除规则会压缩存储槽位，顺序表中大于被删槽位的下标需同步减一，
//! 否则评估会引用错误的规则或越界。

use crate::error::{Result, RuleError, ValidationError};
use crate::models::{Rule, RuleDraft};
use rowrule_shared::observability::metrics::record_rule_rejected;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// 规则在顺序表中的移动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// 规则集
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// 按存储槽位排列的规则
    rules: Vec<Rule>,
    /// 评估顺序（槽位下标的排列）
    order: Vec<usize>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从持久化数据恢复，逐条重新编译
    ///
    /// 顺序表必须恰好是 `0..drafts.len()` 的一个排列。
    pub fn restore(drafts: Vec<RuleDraft>, order: Vec<usize>) -> Result<Self> {
        let mut set = Self::new();
        for draft in drafts {
            let name = set.validate(&draft.name, &draft.text, None)?;
            set.rules.push(Rule::new(name, draft.text));
        }

        let mut seen = HashSet::with_capacity(order.len());
        for &index in &order {
            if index >= set.rules.len() || !seen.insert(index) {
                return Err(RuleError::Snapshot(format!(
                    "规则顺序 {:?} 不是 0..{} 的排列",
                    order,
                    set.rules.len()
                )));
            }
        }
        if seen.len() != set.rules.len() {
            return Err(RuleError::Snapshot(format!(
                "规则顺序 {:?} 缺少部分规则（共 {} 条）",
                order,
                set.rules.len()
            )));
        }
        set.order = order;

        info!("规则集已恢复: {} 条规则", set.rules.len());
        Ok(set)
    }

    /// 当前规则数量
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 按槽位获取规则
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// 按存储槽位排列的规则
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// 评估顺序
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// 按评估顺序遍历规则
    pub fn ordered(&self) -> impl Iterator<Item = &Rule> {
        self.order.iter().filter_map(|&index| self.rules.get(index))
    }

    /// 规则在顺序表中的位置
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&i| i == index)
    }

    /// 持久化形式
    pub fn drafts(&self) -> Vec<RuleDraft> {
        self.rules.iter().map(Rule::to_draft).collect()
    }

    /// 新增规则，追加到存储末尾并排在评估顺序最后
    #[instrument(skip(self, text))]
    pub fn add(&mut self, name: &str, text: &str) -> Result<usize> {
        let name = self.validate(name, text, None).inspect_err(|e| {
            warn!("新增规则被拒绝: {}", e);
            record_rule_rejected("add", e.kind());
        })?;

        let index = self.rules.len();
        self.rules.push(Rule::new(name, text));
        self.order.push(index);

        info!("规则已新增: slot={}", index);
        Ok(index)
    }

    /// 修改规则名称和原文并重新编译，校验时排除自身槽位
    #[instrument(skip(self, text))]
    pub fn edit(&mut self, index: usize, name: &str, text: &str) -> Result<()> {
        self.ensure_index(index)?;
        let name = self.validate(name, text, Some(index)).inspect_err(|e| {
            warn!("修改规则被拒绝: {}", e);
            record_rule_rejected("edit", e.kind());
        })?;

        self.rules[index] = Rule::new(name, text);

        info!("规则已修改: slot={}", index);
        Ok(())
    }

    /// 删除规则并重排顺序表
    #[instrument(skip(self))]
    pub fn delete(&mut self, index: usize) -> Result<Rule> {
        self.ensure_index(index)?;

        let removed = self.rules.remove(index);
        self.order = self
            .order
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();

        info!("规则已删除: {} (slot={})", removed.name, index);
        Ok(removed)
    }

    /// 与相邻规则交换评估顺序，已在端点时不做任何事
    ///
    /// 返回顺序表是否发生变化。
    #[instrument(skip(self))]
    pub fn move_rule(&mut self, index: usize, direction: Direction) -> bool {
        let Some(pos) = self.position_of(index) else {
            warn!("移动不存在的规则: slot={}", index);
            return false;
        };

        let target = match direction {
            Direction::Up if pos > 0 => pos - 1,
            Direction::Down if pos + 1 < self.order.len() => pos + 1,
            _ => return false,
        };
        self.order.swap(pos, target);

        info!("规则顺序已调整: {:?}", self.order);
        true
    }

    fn ensure_index(&self, index: usize) -> Result<()> {
        if index >= self.rules.len() {
            warn!("规则槽位越界: slot={}", index);
            return Err(RuleError::RuleNotFound {
                index,
                len: self.rules.len(),
            });
        }
        Ok(())
    }

    /// 校验名称与原文，返回去除首尾空白后的名称
    fn validate(
        &self,
        name: &str,
        text: &str,
        exclude: Option<usize>,
    ) -> std::result::Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let duplicate = self
            .rules
            .iter()
            .enumerate()
            .any(|(i, r)| r.name == name && Some(i) != exclude);
        if duplicate {
            return Err(ValidationError::DuplicateName {
                name: name.to_string(),
            });
        }

        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }

        Ok(name.to_string())
    }
}
