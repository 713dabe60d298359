//! 重新导入测试套件
//!
//! 重新导入数据后，规则与分组配置保留，标签和汇总全部重算。

use crate::data::*;
use crate::setup::TestEnvironment;
use rule_engine::{SharedWorkbook, Workbook};

#[cfg(test)]
mod reimport_tests {
    use super::*;

    #[test]
    fn test_reimport_relabels_everything() {
        let mut workbook = Workbook::new();
        workbook.import_rows(sales_rows());
        for (name, text) in RULES {
            workbook.add_rule(name, text).unwrap();
        }
        workbook.set_sum_field(Some("Sales"));

        workbook.import_rows(reimported_rows());

        assert_eq!(workbook.rows().len(), 2);
        assert_eq!(workbook.rows()[0].label(), Some("Widgets"));
        assert_eq!(workbook.rows()[1].label(), Some("Big North"));
        assert_eq!(
            workbook.columns(),
            vec!["Region", "Product", "Sales", "Channel", "Rule"]
        );

        let summary = workbook.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].value("Rule"), Some("Widgets"));
        assert_eq!(summary[0].sum, Some(100.0));
        assert_eq!(summary[1].value("Rule"), Some("Big North"));
        assert_eq!(summary[1].sum, Some(3000.0));
    }

    #[test]
    fn test_group_by_new_column_after_reimport() {
        let env = TestEnvironment::setup().unwrap();

        let mut workbook = Workbook::new();
        workbook.import_rows(reimported_rows());
        workbook.add_rule("online", "Channel is online").unwrap();
        workbook.reselect_group_fields(&["Rule", "Channel"]).unwrap();
        env.save(&workbook).unwrap();

        let reopened = env.open().unwrap();
        assert_eq!(reopened.group_key().fields(), &["Rule", "Channel"]);

        let summary = reopened.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].value("Rule"), Some("online"));
        assert_eq!(summary[0].value("Channel"), Some("Online"));
        assert_eq!(summary[1].value("Rule"), Some("Unmatched"));
        assert_eq!(summary[1].value("Channel"), Some("Retail"));
    }

    #[test]
    fn test_shared_workbook_readers_see_recomputed_state() {
        let shared = SharedWorkbook::new(Workbook::new());
        shared.update(|wb| wb.import_rows(sales_rows()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    if i == 0 {
                        shared
                            .update(|wb| wb.add_rule("north", "Region is North"))
                            .unwrap();
                    }
                    // 读者看到的始终是完整重算后的状态
                    let wb = shared.read();
                    let labeled = wb.rows().iter().filter(|r| r.label() == Some("north")).count();
                    assert!(labeled == 0 || labeled == 2);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.read().summary()[0].value("Rule"), Some("north"));
    }
}
