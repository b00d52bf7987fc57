// src/services/calculations.rs
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::models::{RawFundamentals, StatementTable};

/// Ratios derived from one symbol's fundamentals. `None` means an operand was
/// missing or a divisor was zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DerivedRatios {
    pub ev_ebitda: Option<f64>,
    pub ev_fcff: Option<f64>,
    pub total_debt_to_revenue: Option<f64>,
    pub cash_to_market_cap: Option<f64>,
}

/// Percentage change of one line item, per comparison year that could be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemChanges {
    pub item: String,
    pub changes: Vec<(i32, f64)>,
}

fn safe_divide(numerator: Option<f64>, divisor: Option<f64>) -> Option<f64> {
    match (numerator, divisor) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

pub fn ev_ebitda(enterprise_value: Option<f64>, ebitda: Option<f64>) -> Option<f64> {
    safe_divide(enterprise_value, ebitda)
}

pub fn ev_fcff(enterprise_value: Option<f64>, free_cash_flow: Option<f64>) -> Option<f64> {
    safe_divide(enterprise_value, free_cash_flow)
}

/// Debt over revenue with the sign flipped, so more leverage reads lower.
pub fn debt_to_revenue_inverted(total_debt: Option<f64>, total_revenue: Option<f64>) -> Option<f64> {
    safe_divide(total_debt, total_revenue).map(|ratio| -ratio)
}

pub fn cash_to_market_cap(free_cash_flow: Option<f64>, market_cap: Option<f64>) -> Option<f64> {
    safe_divide(free_cash_flow, market_cap)
}

pub fn derive_ratios(raw: &RawFundamentals) -> DerivedRatios {
    DerivedRatios {
        ev_ebitda: ev_ebitda(raw.enterprise_value, raw.ebitda),
        ev_fcff: ev_fcff(raw.enterprise_value, raw.free_cash_flow),
        total_debt_to_revenue: debt_to_revenue_inverted(raw.total_debt, raw.total_revenue),
        cash_to_market_cap: cash_to_market_cap(raw.free_cash_flow, raw.market_cap),
    }
}

fn year_end(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// `(value[year_b] / value[year_a] - 1) * 100` on the December 31 entries of
/// both years; `None` when either entry is missing or the base is zero.
pub fn year_over_year_percent_change(
    table: &StatementTable,
    item: &str,
    year_a: i32,
    year_b: i32,
) -> Option<f64> {
    let base = table.value(item, year_end(year_a)?)?;
    let current = table.value(item, year_end(year_b)?)?;
    if base == 0.0 {
        return None;
    }
    Some((current / base - 1.0) * 100.0)
}

/// Changes for each comparison year against the year before it. Years that
/// cannot be computed are left out.
pub fn item_changes(table: &StatementTable, item: &str, comparison_years: &[i32]) -> ItemChanges {
    let changes = comparison_years.iter()
        .filter_map(|&year| {
            let change = year_over_year_percent_change(table, item, year - 1, year);
            if change.is_none() {
                debug!("No {} change for {} vs {}", item, year, year - 1);
            }
            change.map(|c| (year, c))
        })
        .collect();

    ItemChanges { item: item.to_string(), changes }
}

/// Absolute and percent change of the last close against the previous one.
pub fn daily_change(previous: f64, last: f64) -> (f64, Option<f64>) {
    let change = last - previous;
    let percent = safe_divide(Some(change), Some(previous)).map(|r| r * 100.0);
    (change, percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: &[(i32, f64)]) -> StatementTable {
        let mut t = StatementTable::new();
        for (year, v) in values {
            t.insert("Total Debt", year_end(*year).unwrap(), *v);
        }
        t
    }

    #[test]
    fn ev_ebitda_guards() {
        assert_eq!(ev_ebitda(Some(100.0), Some(0.0)), None);
        assert_eq!(ev_ebitda(None, Some(20.0)), None);
        assert_eq!(ev_ebitda(Some(100.0), None), None);
        assert_eq!(ev_ebitda(Some(100.0), Some(20.0)), Some(5.0));
    }

    #[test]
    fn ev_fcff_guards() {
        assert_eq!(ev_fcff(Some(50.0), Some(0.0)), None);
        assert_eq!(ev_fcff(Some(50.0), Some(-10.0)), Some(-5.0));
    }

    #[test]
    fn debt_to_revenue_is_sign_flipped() {
        assert_eq!(debt_to_revenue_inverted(Some(50.0), Some(200.0)), Some(-0.25));
        assert_eq!(debt_to_revenue_inverted(None, Some(200.0)), None);
        assert_eq!(debt_to_revenue_inverted(Some(50.0), Some(0.0)), None);
    }

    #[test]
    fn cash_to_market_cap_keeps_sign_internally() {
        assert_eq!(cash_to_market_cap(Some(-10.0), Some(100.0)), Some(-0.1));
        assert_eq!(cash_to_market_cap(Some(10.0), None), None);
    }

    #[test]
    fn derived_ratios_propagate_absence() {
        let raw = RawFundamentals {
            enterprise_value: Some(1_000.0),
            ebitda: Some(100.0),
            free_cash_flow: None,
            ..Default::default()
        };
        let ratios = derive_ratios(&raw);
        assert_eq!(ratios.ev_ebitda, Some(10.0));
        assert_eq!(ratios.ev_fcff, None);
        assert_eq!(ratios.cash_to_market_cap, None);
        assert_eq!(ratios.total_debt_to_revenue, None);
    }

    #[test]
    fn year_over_year_change() {
        let t = table(&[(2020, 100.0), (2021, 150.0)]);
        assert_eq!(year_over_year_percent_change(&t, "Total Debt", 2020, 2021), Some(50.0));
        assert_eq!(year_over_year_percent_change(&t, "Total Debt", 2021, 2022), None);
        assert_eq!(year_over_year_percent_change(&t, "Net Debt", 2020, 2021), None);
    }

    #[test]
    fn missing_base_year_is_omitted_not_zero() {
        let t = table(&[(2021, 150.0), (2022, 75.0)]);
        let changes = item_changes(&t, "Total Debt", &[2021, 2022, 2023]);
        assert_eq!(changes.changes, vec![(2022, -50.0)]);
    }

    #[test]
    fn zero_base_is_guarded() {
        let t = table(&[(2020, 0.0), (2021, 10.0)]);
        assert_eq!(year_over_year_percent_change(&t, "Total Debt", 2020, 2021), None);
    }

    #[test]
    fn daily_change_against_previous_close() {
        let (change, percent) = daily_change(10.0, 11.0);
        assert_eq!(change, 1.0);
        assert!((percent.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(daily_change(0.0, 1.0).1, None);
    }
}
