//! 分组汇总
//!
//! 按有序的分组字段划分已打标签的行，统计每组行数，并可选地对一个数值字段求和。
//! 分组按首次出现的顺序输出，每次都全量重算。

use crate::error::ValidationError;
use crate::row::{RULE_COLUMN, Row, parse_number};
use rowrule_shared::observability::metrics::set_summary_groups;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// 分组值缺失（或为空）时使用的占位值
pub const UNMATCHED: &str = "Unmatched";

/// 超过该去重值数量的字段不建议作为分组字段（仅供展示层参考）
pub const MAX_GROUP_CARDINALITY: usize = 50;

/// 分组键：有序且不重复的字段名列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct GroupKey {
    fields: Vec<String>,
}

impl GroupKey {
    pub fn new<I, S>(fields: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(ValidationError::EmptyGroupKey);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.as_str()) {
                return Err(ValidationError::DuplicateGroupField {
                    field: field.clone(),
                });
            }
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// 多选框重新选择后的分组键
    ///
    /// 原先已选的字段保持相对顺序，新选中的字段按选择顺序追加到末尾。
    pub fn reselect<S: AsRef<str>>(&self, selected: &[S]) -> Result<Self, ValidationError> {
        let selected: Vec<&str> = selected.iter().map(AsRef::as_ref).collect();

        let mut fields: Vec<String> = self
            .fields
            .iter()
            .filter(|f| selected.contains(&f.as_str()))
            .cloned()
            .collect();
        for field in selected {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }

        Self::new(fields)
    }
}

impl Default for GroupKey {
    fn default() -> Self {
        Self {
            fields: vec![RULE_COLUMN.to_string()],
        }
    }
}

impl TryFrom<Vec<String>> for GroupKey {
    type Error = ValidationError;

    fn try_from(fields: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<GroupKey> for Vec<String> {
    fn from(key: GroupKey) -> Self {
        key.fields
    }
}

/// 汇总行
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// 各分组字段的取值，顺序与分组键一致
    pub keys: Vec<(String, String)>,
    pub count: usize,
    /// 配置了求和字段时为四舍五入后的合计
    pub sum: Option<f64>,
}

impl SummaryRow {
    /// 读取分组字段的取值
    pub fn value(&self, field: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }
}

impl Serialize for SummaryRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.keys.len() + 1 + usize::from(self.sum.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, value) in &self.keys {
            map.serialize_entry(field, value)?;
        }
        if let Some(sum) = self.sum {
            // 合计已取整，有限值按整数输出
            if sum.is_finite() {
                map.serialize_entry("Sum", &(sum as i64))?;
            } else {
                map.serialize_entry("Sum", &sum)?;
            }
        }
        map.serialize_entry("Count", &self.count)?;
        map.end()
    }
}

/// 分组字段候选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFieldOption {
    pub field: String,
    pub distinct_values: usize,
    /// 去重值不超过 `MAX_GROUP_CARDINALITY` 时可选
    pub selectable: bool,
}

/// 分组汇总器
pub struct Aggregator;

impl Aggregator {
    /// 计算汇总
    ///
    /// 分组值按列名精确读取，缺失或为空时归入 `Unmatched`；
    /// 求和时无法解析的单元格按 0 计。
    pub fn summarize(rows: &[Row], key: &GroupKey, sum_field: Option<&str>) -> Vec<SummaryRow> {
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut partials: Vec<(Vec<String>, usize, f64)> = Vec::new();

        for row in rows {
            let tuple: Vec<String> = key
                .fields()
                .iter()
                .map(|f| match row.get(f) {
                    Some(v) if !v.is_empty() => v.to_string(),
                    _ => UNMATCHED.to_string(),
                })
                .collect();

            let slot = match index.get(&tuple) {
                Some(&slot) => slot,
                None => {
                    let slot = partials.len();
                    index.insert(tuple.clone(), slot);
                    partials.push((tuple, 0, 0.0));
                    slot
                }
            };

            let entry = &mut partials[slot];
            entry.1 += 1;
            if let Some(field) = sum_field {
                let value = row.get(field).map(parse_number).unwrap_or(f64::NAN);
                if !value.is_nan() {
                    entry.2 += value;
                }
            }
        }

        let summary: Vec<SummaryRow> = partials
            .into_iter()
            .map(|(tuple, count, sum)| SummaryRow {
                keys: key.fields().iter().cloned().zip(tuple).collect(),
                count,
                sum: sum_field.map(|_| round_half_up(sum)),
            })
            .collect();

        set_summary_groups(summary.len());
        debug!(
            rows = rows.len(),
            groups = summary.len(),
            fields = ?key.fields(),
            sum_field = ?sum_field,
            "汇总计算完成"
        );
        summary
    }

    /// 字段的去重值数量（缺失按空串计）
    pub fn field_cardinality(rows: &[Row], field: &str) -> usize {
        rows.iter()
            .map(|row| row.get(field).unwrap_or(""))
            .collect::<HashSet<_>>()
            .len()
    }

    /// 列出可作为分组字段的候选项
    ///
    /// `Rule` 总是第一个候选项；其余为首行的列（排除 `Rule` 和求和字段）。
    pub fn group_field_options(rows: &[Row], sum_field: Option<&str>) -> Vec<GroupFieldOption> {
        let mut options = vec![GroupFieldOption {
            field: RULE_COLUMN.to_string(),
            distinct_values: Self::field_cardinality(rows, RULE_COLUMN),
            selectable: true,
        }];

        if let Some(first) = rows.first() {
            for column in first.columns() {
                if column == RULE_COLUMN || Some(column) == sum_field {
                    continue;
                }
                let distinct_values = Self::field_cardinality(rows, column);
                options.push(GroupFieldOption {
                    field: column.to_string(),
                    distinct_values,
                    selectable: distinct_values <= MAX_GROUP_CARDINALITY,
                });
            }
        }

        options
    }
}

/// 四舍五入，.5 向正无穷方向进位
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}
