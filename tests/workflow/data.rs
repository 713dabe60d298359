//! 测试数据

use rule_engine::Row;

/// 销售表样例
pub fn sales_rows() -> Vec<Row> {
    vec![
        Row::from_pairs([("Region", "North"), ("Product", "Widget A"), ("Sales", "1500")]),
        Row::from_pairs([("Region", "North"), ("Product", "Gadget"), ("Sales", "500")]),
        Row::from_pairs([("Region", "South"), ("Product", "Widget B"), ("Sales", "2200.5")]),
        Row::from_pairs([("Region", "West"), ("Product", "Gizmo"), ("Sales", "")]),
    ]
}

/// 重新导入的数据（多了一列，地区分布不同）
pub fn reimported_rows() -> Vec<Row> {
    vec![
        Row::from_pairs([
            ("Region", "South"),
            ("Product", "Widget C"),
            ("Sales", "100"),
            ("Channel", "Online"),
        ]),
        Row::from_pairs([
            ("Region", "North"),
            ("Product", "Widget D"),
            ("Sales", "3000"),
            ("Channel", "Retail"),
        ]),
    ]
}

/// 规则样例：名称与原文
pub const RULES: [(&str, &str); 3] = [
    ("Big North", "If Region is North and Sales > 1000 then flag"),
    ("Widgets", "Product contains widget"),
    ("Not West", "Region is not West and Sales < 1000"),
];
