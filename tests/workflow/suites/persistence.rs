//! 持久化测试套件
//!
//! 测试工作簿保存、重新打开以及快照文件格式。

use crate::data::*;
use crate::setup::TestEnvironment;
use rule_engine::{Direction, UNMATCHED, Workbook};
use serde_json::Value;

fn build_workbook() -> Workbook {
    let mut workbook = Workbook::new();
    workbook.import_rows(sales_rows());
    for (name, text) in RULES {
        workbook.add_rule(name, text).unwrap();
    }
    workbook.set_sum_field(Some("Sales"));
    workbook
}

#[cfg(test)]
mod persistence_tests {
    use super::*;

    #[test]
    fn test_open_without_snapshot_is_empty() {
        let env = TestEnvironment::setup().unwrap();
        let workbook = env.open().unwrap();

        assert!(workbook.rows().is_empty());
        assert!(workbook.rules().is_empty());
        assert!(workbook.summary().is_empty());
        assert_eq!(workbook.group_key().fields(), &["Rule"]);
    }

    #[test]
    fn test_labels_and_summary() {
        let workbook = build_workbook();

        let labels: Vec<_> = workbook
            .rows()
            .iter()
            .map(|row| row.label().unwrap_or_default())
            .collect();
        assert_eq!(labels, vec!["Big North", "Not West", "Widgets", ""]);

        let summary = workbook.summary();
        let groups: Vec<_> = summary.iter().map(|s| s.value("Rule").unwrap()).collect();
        assert_eq!(groups, vec!["Big North", "Not West", "Widgets", UNMATCHED]);

        // 2200.5 四舍五入，空单元格按 0 计
        let sums: Vec<_> = summary.iter().map(|s| s.sum.unwrap()).collect();
        assert_eq!(sums, vec![1500.0, 500.0, 2201.0, 0.0]);
    }

    #[test]
    fn test_save_and_reopen() {
        let env = TestEnvironment::setup().unwrap();
        let mut workbook = build_workbook();
        workbook.move_rule(2, Direction::Up);
        env.save(&workbook).unwrap();
        assert!(env.snapshot_path.exists());

        let reopened = env.open().unwrap();
        assert_eq!(reopened.snapshot(), workbook.snapshot());
        assert_eq!(reopened.rows(), workbook.rows());
        assert_eq!(reopened.summary(), workbook.summary());
        assert_eq!(reopened.rules().order(), &[0, 2, 1]);
    }

    #[test]
    fn test_snapshot_file_format() {
        let env = TestEnvironment::setup().unwrap();
        env.save(&build_workbook()).unwrap();

        let content = std::fs::read_to_string(&env.snapshot_path).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();

        assert_eq!(value["rules"][0]["name"], "Big North");
        assert_eq!(
            value["rules"][0]["text"],
            "If Region is North and Sales > 1000 then flag"
        );
        assert_eq!(value["rule_order"], serde_json::json!([0, 1, 2]));
        assert_eq!(value["group_fields"], serde_json::json!(["Rule"]));
        assert_eq!(value["sum_field"], "Sales");

        // 行以对象形式保存，包含标签列
        let first = value["rows"][0].as_object().unwrap();
        assert_eq!(first["Region"], "North");
        assert_eq!(first["Rule"], "Big North");
    }

    #[test]
    fn test_edit_delete_survive_reopen() {
        let env = TestEnvironment::setup().unwrap();
        let mut workbook = build_workbook();

        workbook
            .edit_rule(0, "Big North", "Region is North and Sales > 100")
            .unwrap();
        workbook.delete_rule(1).unwrap();
        env.save(&workbook).unwrap();

        let reopened = env.open().unwrap();
        let names: Vec<_> = reopened.rules().ordered().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Big North", "Not West"]);
        assert_eq!(reopened.rows()[1].label(), Some("Big North"));
        assert_eq!(reopened.rows()[2].label(), Some(""));
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let env = TestEnvironment::setup().unwrap();
        std::fs::create_dir_all(env.snapshot_path.parent().unwrap()).unwrap();
        std::fs::write(&env.snapshot_path, r#"{"rules": [{"name": "a"}]}"#).unwrap();

        assert!(env.open().is_err());
    }
}
