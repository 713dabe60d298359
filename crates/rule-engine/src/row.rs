//! 行数据模型
//!
//! 一行是"列名 -> 单元格文本"的有序映射，列顺序与导入时的表头一致。
//! 单元格一律以文本保存，数值含义在比较或求和时按需解析。

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// 规则引擎写入的标签列
pub const RULE_COLUMN: &str = "Rule";

/// 一行导入数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (列名, 值) 序列创建，重复列名以后出现的为准
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.insert(column, value);
        }
        row
    }

    /// 写入单元格，列已存在时覆盖原值并保持列位置
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some((_, v)) => *v = value,
            None => self.cells.push((column, value)),
        }
    }

    /// 按列名精确读取
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// 将条件中的字段名解析为实际列名（忽略大小写）
    ///
    /// 找不到时原样返回字段名，后续读取自然落空。
    pub fn resolve_column<'a>(&'a self, field: &'a str) -> &'a str {
        self.cells
            .iter()
            .find(|(c, _)| same_column(c, field))
            .map(|(c, _)| c.as_str())
            .unwrap_or(field)
    }

    /// 按字段名读取（忽略大小写）
    pub fn lookup(&self, field: &str) -> Option<&str> {
        self.get(self.resolve_column(field))
    }

    /// 按字段名读取文本，缺失时为空串
    pub fn text(&self, field: &str) -> &str {
        self.lookup(field).unwrap_or("")
    }

    /// 按字段名读取数值，缺失或无法解析时为 NaN
    pub fn number(&self, field: &str) -> f64 {
        self.lookup(field).map(parse_number).unwrap_or(f64::NAN)
    }

    /// 当前标签（`Rule` 列）
    pub fn label(&self) -> Option<&str> {
        self.get(RULE_COLUMN)
    }

    /// 返回写入新标签后的行，旧标签被整体替换
    pub fn with_label(&self, label: &str) -> Self {
        let mut row = self.clone();
        row.insert(RULE_COLUMN, label);
        row
    }

    /// 列名（按导入顺序）
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

fn same_column(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// 解析单元格中的数值
///
/// 取文本开头最长的十进制数字前缀（允许前导空白、正负号、小数点和指数），
/// 因此 `"1500 USD"` 解析为 1500；没有任何数字前缀时返回 NaN。
pub fn parse_number(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };
    let sign = if negative { -1.0 } else { 1.0 };

    if s[i..].starts_with("Infinity") {
        return sign * f64::INFINITY;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = &s[int_start..i];

    let mut frac_digits = "";
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = &s[frac_start..j];
        i = j;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return f64::NAN;
    }

    let mut exponent = String::new();
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        let mut exp = String::from("e");
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            exp.push(bytes[j] as char);
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digits_start {
            exp.push_str(&s[digits_start..j]);
            exponent = exp;
        }
    }

    let normalized = format!(
        "{}.{}{}",
        if int_digits.is_empty() { "0" } else { int_digits },
        if frac_digits.is_empty() { "0" } else { frac_digits },
        exponent
    );
    normalized
        .parse::<f64>()
        .map(|v| sign * v)
        .unwrap_or(f64::NAN)
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of column name to cell value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut row = Row::new();
        while let Some((column, value)) = access.next_entry::<String, Value>()? {
            let text = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            row.insert(column, text);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}
