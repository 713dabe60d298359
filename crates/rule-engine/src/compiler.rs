//! 表达式编译器
//!
//! 将规则原文编译为析取范式表达式：
//! 1. 去掉开头的 `if` 和 `then ...` 尾部
//! 2. 按 `or` 切分为合取组（优先级低）
//! 3. 每组按 `and` 切分为叶子条件（优先级高），交给 `ConditionParser`
//!
//! 编译从不失败，无法识别的叶子降级为永不成立的子句。

use crate::models::{AndGroup, Expression};
use crate::operators::LogicalOperator;
use crate::parser::ConditionParser;
use crate::row::RULE_COLUMN;
use tracing::{debug, warn};

/// 表达式编译器
pub struct ExpressionCompiler;

impl ExpressionCompiler {
    /// 编译规则原文
    pub fn compile(text: &str) -> Expression {
        let body = strip_then(strip_if(text.trim()));

        let groups: Vec<AndGroup> = split_keyword(body, LogicalOperator::Or)
            .into_iter()
            .map(|part| {
                let clauses = split_keyword(part, LogicalOperator::And)
                    .into_iter()
                    .map(ConditionParser::parse)
                    .collect();
                AndGroup::new(clauses)
            })
            .collect();
        let expression = Expression::new(groups);

        for source in expression.unrecognized() {
            debug!(rule_text = %text, condition = %source, "无法识别的条件，按永不成立处理");
        }
        if expression.references(RULE_COLUMN) {
            warn!(rule_text = %text, "规则引用了 Rule 列，将读取上一轮评估写入的标签");
        }

        expression
    }
}

/// 去掉开头的 `if`（须后接空白）
fn strip_if(text: &str) -> &str {
    match text.get(..2) {
        Some(head) if head.eq_ignore_ascii_case("if") => {
            let rest = &text[2..];
            let trimmed = rest.trim_start();
            if trimmed.len() < rest.len() {
                trimmed
            } else {
                text
            }
        }
        _ => text,
    }
}

/// 去掉首个 `then` 及其后的全部内容
///
/// `then` 之前须为空白或文本开头，之后须为文本结尾或非单词字符（`then:`、`then,` 同样生效）。
fn strip_then(text: &str) -> &str {
    let bytes = text.as_bytes();
    let keyword = b"then";
    if bytes.len() < keyword.len() {
        return text;
    }

    for i in 0..=bytes.len() - keyword.len() {
        let end = i + keyword.len();
        let boundary_before = i == 0 || bytes[i - 1].is_ascii_whitespace();
        let boundary_after = end == bytes.len() || !is_word_byte(bytes[end]);
        if boundary_before && boundary_after && bytes[i..end].eq_ignore_ascii_case(keyword) {
            return text[..i].trim_end();
        }
    }
    text
}

/// 非 ASCII 字节视为单词的一部分
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || !b.is_ascii()
}

/// 按两侧带空白的连接词切分（忽略大小写）
fn split_keyword(text: &str, operator: LogicalOperator) -> Vec<&str> {
    let keyword = operator.keyword().as_bytes();
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let ws_start = i;
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let kw_end = j + keyword.len();
        let is_separator = kw_end < bytes.len()
            && bytes[j..kw_end].eq_ignore_ascii_case(keyword)
            && bytes[kw_end].is_ascii_whitespace();

        if is_separator {
            let mut k = kw_end;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            parts.push(&text[start..ws_start]);
            start = k;
            i = k;
        } else {
            i = j;
        }
    }

    parts.push(&text[start..]);
    parts
}
