// src/services/statements.rs
use log::warn;
use serde::Serialize;
use thiserror::Error;

use crate::models::StatementTable;
use super::formatting::{format_grouped, MISSING_LINE_ITEM};

pub const CASH_FLOW_ITEMS: [&str; 8] = [
    "Operating Cash Flow",
    "Investing Cash Flow",
    "Financing Cash Flow",
    "End Cash Position",
    "Changes in Cash",
    "Effect of Exchange Rate Changes",
    "Beginning Cash Position",
    "Capital Expenditure",
];

pub const NET_DEBT_ITEMS: [&str; 3] = ["Total Debt", "Cash And Cash Equivalents", "Net Debt"];
pub const NET_DEBT_FALLBACK_ITEMS: [&str; 2] = ["Total Debt", "Cash And Cash Equivalents"];

#[derive(Debug, Clone, Serialize)]
pub struct LineItemValue {
    pub item: String,
    pub value: String,
}

/// One statement column: the period end (`YYYY-MM-DD`) and its whitelisted items.
#[derive(Debug, Clone, Serialize)]
pub struct StatementColumn {
    pub period: String,
    pub items: Vec<LineItemValue>,
}

impl StatementColumn {
    pub fn get(&self, item: &str) -> Option<&str> {
        self.items.iter().find(|v| v.item == item).map(|v| v.value.as_str())
    }
}

/// Every period of `table` with every whitelisted item, most recent period
/// first. Items missing for a period are `"--"`.
pub fn extract_line_items(table: &StatementTable, whitelist: &[&str]) -> Vec<StatementColumn> {
    table.periods().iter()
        .map(|&period| StatementColumn {
            period: period.format("%Y-%m-%d").to_string(),
            items: whitelist.iter()
                .map(|&item| LineItemValue {
                    item: item.to_string(),
                    value: table.value(item, period)
                        .filter(|v| v.is_finite())
                        .map(format_grouped)
                        .unwrap_or_else(|| MISSING_LINE_ITEM.to_string()),
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Error)]
#[error("Balance sheet has no '{0}' line item")]
pub struct MissingLineItem(pub String);

/// Which line items the net-debt chart can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetDebtSelection {
    /// Total debt, cash and net debt.
    Full,
    /// Net debt is not reported; total debt and cash only.
    Partial,
}

impl NetDebtSelection {
    pub fn items(&self) -> &'static [&'static str] {
        match self {
            NetDebtSelection::Full => &NET_DEBT_ITEMS,
            NetDebtSelection::Partial => &NET_DEBT_FALLBACK_ITEMS,
        }
    }

    pub fn palette(&self) -> &'static [&'static str] {
        match self {
            NetDebtSelection::Full => &["#845adf", "#f5b849", "#23b7e5"],
            NetDebtSelection::Partial => &["#845adf", "#f5b849"],
        }
    }
}

/// Picks the three-item set when every item exists in the balance sheet,
/// otherwise the two-item set. Errors only when the two-item set is also
/// incomplete.
pub fn select_net_debt_items(balance_sheet: &StatementTable) -> Result<NetDebtSelection, MissingLineItem> {
    let first_missing = |items: &[&str]| {
        items.iter().find(|item| !balance_sheet.has_line_item(item)).map(|item| item.to_string())
    };

    match first_missing(&NET_DEBT_ITEMS[..]) {
        None => Ok(NetDebtSelection::Full),
        Some(missing) => {
            warn!("Balance sheet missing '{}', falling back to debt and cash only", missing);
            match first_missing(&NET_DEBT_FALLBACK_ITEMS[..]) {
                None => Ok(NetDebtSelection::Partial),
                Some(missing) => Err(MissingLineItem(missing)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, 31).unwrap()
    }

    #[test]
    fn missing_items_use_sentinel() {
        let mut table = StatementTable::new();
        table.insert("Operating Cash Flow", d(2023), 1_234_567.0);
        table.insert("Capital Expenditure", d(2022), -50_000.0);

        let columns = extract_line_items(&table, &CASH_FLOW_ITEMS);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].period, "2023-12-31");
        assert_eq!(columns[0].items.len(), CASH_FLOW_ITEMS.len());
        assert_eq!(columns[0].get("Operating Cash Flow"), Some("1,234,567"));
        assert_eq!(columns[0].get("Capital Expenditure"), Some("--"));
        assert_eq!(columns[1].get("Capital Expenditure"), Some("-50,000"));
        assert_eq!(columns[1].get("Operating Cash Flow"), Some("--"));
    }

    #[test]
    fn whitelist_order_is_kept() {
        let mut table = StatementTable::new();
        table.insert("Capital Expenditure", d(2023), 1.0);
        let columns = extract_line_items(&table, &CASH_FLOW_ITEMS);
        let names: Vec<&str> = columns[0].items.iter().map(|v| v.item.as_str()).collect();
        assert_eq!(names, CASH_FLOW_ITEMS.to_vec());
    }

    #[test]
    fn net_debt_selection_tiers() {
        let mut table = StatementTable::new();
        table.insert("Total Debt", d(2023), 1.0);
        table.insert("Cash And Cash Equivalents", d(2023), 1.0);
        assert_eq!(select_net_debt_items(&table).unwrap(), NetDebtSelection::Partial);

        table.insert("Net Debt", d(2022), 1.0);
        assert_eq!(select_net_debt_items(&table).unwrap(), NetDebtSelection::Full);

        let mut no_cash = StatementTable::new();
        no_cash.insert("Total Debt", d(2023), 1.0);
        let err = select_net_debt_items(&no_cash).unwrap_err();
        assert_eq!(err.0, "Cash And Cash Equivalents");
    }

    #[test]
    fn palettes_match_item_counts() {
        for selection in [NetDebtSelection::Full, NetDebtSelection::Partial] {
            assert_eq!(selection.items().len(), selection.palette().len());
        }
    }
}
