// src/state.rs
use chrono::{NaiveDate, Utc};

use crate::config::AppConfig;
use crate::services::market_data::Result;
use crate::services::yahoo::YahooClient;

/// Shared, read-only application state.
pub struct AppState {
    pub config: AppConfig,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = YahooClient::build_http(config.yahoo_timeout)?;
        Ok(Self { config, http })
    }

    /// A fresh client for one page request.
    pub fn client(&self) -> YahooClient {
        YahooClient::new(self.http.clone(), self.config.market_timezone)
    }

    /// Today's date at the exchange.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.config.market_timezone).date_naive()
    }
}
