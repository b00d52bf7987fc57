// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Numeric fundamentals for one symbol. Every field is independently optional;
/// a missing value is `None`, never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFundamentals {
    pub regular_market_price: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub ebitda: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_revenue: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub profile: CompanyProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub long_business_summary: Option<String>,
    pub officers: Vec<CompanyOfficer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyOfficer {
    pub name: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes, ascending by date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Last two closes as `(previous, last)`.
    pub fn last_two(&self) -> Option<(f64, f64)> {
        match self.points.as_slice() {
            [.., prev, last] => Some((prev.close, last.close)),
            _ => None,
        }
    }

    /// Divides every close by the rate on the same date. Dates without a
    /// rate (or with a zero rate) are dropped.
    pub fn divide_by(&self, rates: &PriceSeries) -> PriceSeries {
        let by_date: HashMap<NaiveDate, f64> = rates.points.iter()
            .map(|p| (p.date, p.close))
            .collect();

        let points = self.points.iter()
            .filter_map(|p| {
                let rate = *by_date.get(&p.date)?;
                if rate == 0.0 {
                    return None;
                }
                Some(PricePoint { date: p.date, close: p.close / rate })
            })
            .collect();

        PriceSeries { points }
    }
}

/// One financial statement (cash flow or balance sheet), annual periods.
///
/// A line item is *structurally* present when the provider reported it for at
/// least one period. Per-period gaps are a separate, weaker kind of absence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementTable {
    periods: Vec<NaiveDate>,
    line_items: HashMap<String, HashMap<NaiveDate, f64>>,
}

impl StatementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: &str, period: NaiveDate, value: f64) {
        if !self.periods.contains(&period) {
            self.periods.push(period);
            // most recent first
            self.periods.sort_by(|a, b| b.cmp(a));
        }
        self.line_items
            .entry(item.to_string())
            .or_default()
            .insert(period, value);
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn has_line_item(&self, item: &str) -> bool {
        self.line_items.get(item).map_or(false, |values| !values.is_empty())
    }

    pub fn value(&self, item: &str, period: NaiveDate) -> Option<f64> {
        self.line_items.get(item)?.get(&period).copied()
    }

    pub fn line_item_names(&self) -> impl Iterator<Item = &str> {
        self.line_items.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn price_series_is_sorted_and_last_two_ordered() {
        let series = PriceSeries::new(vec![
            PricePoint { date: d(2024, 1, 3), close: 12.0 },
            PricePoint { date: d(2024, 1, 2), close: 10.0 },
        ]);
        assert_eq!(series.points[0].date, d(2024, 1, 2));
        assert_eq!(series.last_close(), Some(12.0));
        assert_eq!(series.last_two(), Some((10.0, 12.0)));
    }

    #[test]
    fn divide_by_aligns_on_date() {
        let prices = PriceSeries::new(vec![
            PricePoint { date: d(2024, 1, 2), close: 30.0 },
            PricePoint { date: d(2024, 1, 3), close: 33.0 },
            PricePoint { date: d(2024, 1, 4), close: 36.0 },
        ]);
        let fx = PriceSeries::new(vec![
            PricePoint { date: d(2024, 1, 2), close: 30.0 },
            PricePoint { date: d(2024, 1, 4), close: 0.0 },
        ]);
        let usd = prices.divide_by(&fx);
        assert_eq!(usd.points, vec![PricePoint { date: d(2024, 1, 2), close: 1.0 }]);
    }

    #[test]
    fn statement_tracks_structural_presence() {
        let mut table = StatementTable::new();
        table.insert("Total Debt", d(2022, 12, 31), 10.0);
        table.insert("Total Debt", d(2023, 12, 31), 12.0);
        assert!(table.has_line_item("Total Debt"));
        assert!(!table.has_line_item("Net Debt"));
        assert_eq!(table.periods(), &[d(2023, 12, 31), d(2022, 12, 31)]);
        assert_eq!(table.value("Total Debt", d(2021, 12, 31)), None);
    }
}
