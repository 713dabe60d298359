//! 条件解析器
//!
//! 把单个叶子条件（不含 and/or）解析为 `Condition`。语法固定为
//! `<字段> <操作符> <操作数>`，操作符按下表顺序逐一尝试，首个匹配者胜出。
//! 较长的写法必须排在其前缀之前（`>=` 先于 `>`，`is not` 先于 `is`），否则会被错误切分。

use crate::models::{Clause, Condition, Operand};
use crate::operators::Operator;
use crate::row::parse_number;

/// 操作符记号
#[derive(Debug, Clone, Copy)]
enum Token {
    /// 关键词短语，词与词之间允许任意空白，忽略大小写，末尾须为词边界
    Words(&'static [&'static str]),
    /// 符号
    Symbol(&'static str),
}

struct Matcher {
    token: Token,
    operator: Operator,
}

const MATCHERS: &[Matcher] = &[
    Matcher {
        token: Token::Words(&["does", "not", "contain"]),
        operator: Operator::NotContains,
    },
    Matcher {
        token: Token::Words(&["contains"]),
        operator: Operator::Contains,
    },
    Matcher {
        token: Token::Words(&["is", "not"]),
        operator: Operator::Neq,
    },
    Matcher {
        token: Token::Symbol("!="),
        operator: Operator::Neq,
    },
    Matcher {
        token: Token::Symbol("=="),
        operator: Operator::Eq,
    },
    Matcher {
        token: Token::Symbol(">="),
        operator: Operator::Gte,
    },
    Matcher {
        token: Token::Symbol("<="),
        operator: Operator::Lte,
    },
    Matcher {
        token: Token::Symbol(">"),
        operator: Operator::Gt,
    },
    Matcher {
        token: Token::Symbol("<"),
        operator: Operator::Lt,
    },
    Matcher {
        token: Token::Symbol("="),
        operator: Operator::Eq,
    },
    Matcher {
        token: Token::Words(&["is"]),
        operator: Operator::Eq,
    },
];

/// 条件解析器
pub struct ConditionParser;

impl ConditionParser {
    /// 解析叶子条件，无法识别时返回 `Clause::Never`
    pub fn parse(text: &str) -> Clause {
        match Self::parse_condition(text) {
            Some(cond) => Clause::Condition(cond),
            None => Clause::Never {
                source: text.trim().to_string(),
            },
        }
    }

    /// 解析叶子条件
    pub fn parse_condition(text: &str) -> Option<Condition> {
        let text = text.trim();

        let field_len = text
            .char_indices()
            .find(|(_, c)| !is_word_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        if field_len == 0 {
            return None;
        }
        let field = &text[..field_len];
        let rest = text[field_len..].trim_start();

        MATCHERS.iter().find_map(|m| {
            let remainder = match m.token {
                Token::Words(words) => match_words(rest, words)?,
                Token::Symbol(symbol) => rest.strip_prefix(symbol)?,
            };
            let operand = parse_operand(m.operator, remainder.trim())?;
            Some(Condition::new(field, m.operator, operand))
        })
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// 匹配关键词短语，成功时返回其后的剩余文本
fn match_words<'a>(input: &'a str, words: &[&str]) -> Option<&'a str> {
    let mut rest = input;
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            let trimmed = rest.trim_start();
            if trimmed.len() == rest.len() {
                return None;
            }
            rest = trimmed;
        }
        let head = rest.get(..word.len())?;
        if !head.eq_ignore_ascii_case(word) {
            return None;
        }
        rest = &rest[word.len()..];
    }

    match rest.chars().next() {
        Some(c) if is_word_char(c) => None,
        _ => Some(rest),
    }
}

fn parse_operand(operator: Operator, operand: &str) -> Option<Operand> {
    if operand.is_empty() {
        return None;
    }

    if operator.is_relational() {
        let digits = operand.strip_prefix('-').unwrap_or(operand);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        // "." 之类的文本解析为 NaN，比较结果恒为 false
        return Some(Operand::Number(parse_number(operand)));
    }

    let valid = operand
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-' || c == ' ');
    valid.then(|| Operand::Text(operand.to_string()))
}
