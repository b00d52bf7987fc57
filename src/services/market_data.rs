// src/services/market_data.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{PriceSeries, RawFundamentals, StatementTable};

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("No data for symbol {0}")]
    NoData(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Inclusive start, exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CashFlow,
    BalanceSheet,
}

/// Source of raw market data for a single page request.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn fundamentals(&self, symbol: &str) -> Result<RawFundamentals>;

    /// Daily closes in `range`, ascending.
    async fn price_history(&self, symbol: &str, range: DateRange) -> Result<PriceSeries>;

    /// Most recent daily close, if the provider has one.
    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>>;

    /// Annual statement, periods most recent first.
    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<StatementTable>;
}
