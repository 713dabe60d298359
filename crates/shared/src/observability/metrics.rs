//! 指标模块
//!
//! 通过 `metrics` 门面记录，未安装 recorder 时所有记录均为空操作。

/// 注册指标描述
pub fn describe_metrics(service_name: &str) {
    metrics::describe_counter!(
        "rule_engine_rows_labeled_total",
        "Rows that matched a rule during a labeling pass"
    );
    metrics::describe_counter!(
        "rule_engine_rows_unmatched_total",
        "Rows that matched no rule during a labeling pass"
    );
    metrics::describe_histogram!(
        "rule_engine_label_pass_duration_seconds",
        "Labeling pass duration in seconds"
    );
    metrics::describe_gauge!(
        "rule_engine_summary_groups",
        "Number of partitions in the latest summary"
    );
    metrics::describe_counter!(
        "rule_engine_rules_rejected_total",
        "Rule mutations rejected by validation"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 记录一次打标签
#[inline]
pub fn record_label_pass(matched: usize, unmatched: usize, duration_secs: f64) {
    metrics::counter!("rule_engine_rows_labeled_total").increment(matched as u64);
    metrics::counter!("rule_engine_rows_unmatched_total").increment(unmatched as u64);
    metrics::histogram!("rule_engine_label_pass_duration_seconds").record(duration_secs);
}

/// 更新汇总分组数
#[inline]
pub fn set_summary_groups(groups: usize) {
    metrics::gauge!("rule_engine_summary_groups").set(groups as f64);
}

/// 记录被拒绝的规则变更
#[inline]
pub fn record_rule_rejected(operation: &str, reason: &str) {
    metrics::counter!(
        "rule_engine_rules_rejected_total",
        "operation" => operation.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        describe_metrics("rule-engine");
        record_label_pass(3, 1, 0.002);
        set_summary_groups(4);
        record_rule_rejected("add", "empty_name");
    }
}
