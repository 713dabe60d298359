//! 规则引擎错误类型
//!
//! 只有两类错误会暴露给调用方：规则增改时的校验失败，以及工作簿持久化相关的错误。
//! 条件解析失败不是错误，而是降级为永不满足的子句。

use thiserror::Error;

/// 校验失败原因
///
/// `Display` 输出即面向用户的原因说明。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("规则名称不能为空")]
    EmptyName,

    #[error("规则描述不能为空")]
    EmptyText,

    #[error("规则名称已存在: {name}")]
    DuplicateName { name: String },

    #[error("分组字段不能为空")]
    EmptyGroupKey,

    #[error("分组字段重复: {field}")]
    DuplicateGroupField { field: String },
}

impl ValidationError {
    /// 面向用户的原因说明
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// 稳定的原因标识，用作指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::EmptyText => "empty_text",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::EmptyGroupKey => "empty_group_key",
            Self::DuplicateGroupField { .. } => "duplicate_group_field",
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("参数验证失败: {0}")]
    Validation(#[from] ValidationError),

    #[error("规则未找到: index={index}, 当前共 {len} 条规则")]
    RuleNotFound { index: usize, len: usize },

    #[error("快照数据无效: {0}")]
    Snapshot(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RuleNotFound { .. } => "RULE_NOT_FOUND",
            Self::Snapshot(_) => "INVALID_SNAPSHOT",
            Self::JsonError(_) => "JSON_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// 校验失败时返回原因
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = RuleError::from(ValidationError::EmptyName);
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let err = RuleError::RuleNotFound { index: 3, len: 1 };
        assert_eq!(err.code(), "RULE_NOT_FOUND");
    }

    #[test]
    fn test_validation_reason() {
        let err = ValidationError::DuplicateName {
            name: "north".to_string(),
        };
        assert_eq!(err.reason(), "规则名称已存在: north");

        let wrapped = RuleError::from(err.clone());
        assert_eq!(wrapped.validation(), Some(&err));
    }
}
