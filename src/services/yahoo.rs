// src/services/yahoo.rs
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, error, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::models::{CompanyOfficer, CompanyProfile, PricePoint, PriceSeries, RawFundamentals, StatementTable};
use super::market_data::{DateRange, MarketDataClient, MarketDataError, Result, StatementKind};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const TIMESERIES_URL: &str = "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile";

/// Statements are requested from this date on; Yahoo only keeps a few years anyway.
const TIMESERIES_START: i64 = 493_590_046;

const CASH_FLOW_KEYS: [(&str, &str); 8] = [
    ("OperatingCashFlow", "Operating Cash Flow"),
    ("InvestingCashFlow", "Investing Cash Flow"),
    ("FinancingCashFlow", "Financing Cash Flow"),
    ("EndCashPosition", "End Cash Position"),
    ("ChangesInCash", "Changes in Cash"),
    ("EffectOfExchangeRateChanges", "Effect of Exchange Rate Changes"),
    ("BeginningCashPosition", "Beginning Cash Position"),
    ("CapitalExpenditure", "Capital Expenditure"),
];

const BALANCE_SHEET_KEYS: [(&str, &str); 3] = [
    ("TotalDebt", "Total Debt"),
    ("CashAndCashEquivalents", "Cash And Cash Equivalents"),
    ("NetDebt", "Net Debt"),
];

/// Yahoo Finance client. The cookie/crumb pair is obtained on first use and
/// kept for the lifetime of the client, which is one page request.
pub struct YahooClient {
    http: Client,
    crumb: OnceCell<String>,
    timezone: Tz,
}

impl YahooClient {
    pub fn new(http: Client, timezone: Tz) -> Self {
        Self { http, crumb: OnceCell::new(), timezone }
    }

    pub fn build_http(timeout: Duration) -> Result<Client> {
        Ok(Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?)
    }

    async fn crumb(&self) -> Result<&str> {
        let crumb = self.crumb.get_or_try_init(|| self.fetch_crumb()).await?;
        Ok(crumb.as_str())
    }

    async fn fetch_crumb(&self) -> Result<String> {
        // Sets the session cookie; the status is usually 404 and irrelevant.
        if let Err(e) = self.http.get(COOKIE_URL).send().await {
            debug!("Cookie request failed: {}", e);
        }

        let response = self.http.get(CRUMB_URL)
            .header("referer", "https://finance.yahoo.com/")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(MarketDataError::Auth(format!("crumb endpoint returned {}", response.status())));
        }

        let body = response.text().await?;
        let crumb = body.trim();
        if crumb.is_empty() || crumb.len() > 100 || crumb.contains(' ') || crumb.contains('<') {
            return Err(MarketDataError::Auth("unexpected crumb response".to_string()));
        }
        debug!("Obtained Yahoo crumb");
        Ok(crumb.to_string())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        info!("Fetching data from URL: {}", url);
        let response = self.http.get(url)
            .query(query)
            .header("referer", "https://finance.yahoo.com/")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Some(description) = api_error_description(&body) {
                error!("Yahoo error for {}: {}", url, description);
                return Err(MarketDataError::Upstream(description));
            }
            error!("Yahoo returned status {} for {}", status, url);
            return Err(MarketDataError::Status { status: status.as_u16(), url: url.to_string() });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn chart(&self, symbol: &str, query: &[(&str, String)]) -> Result<PriceSeries> {
        let url = format!("{}/{}", CHART_URL, symbol);
        let body: Value = self.get_json(&url, query).await?;
        parse_chart(symbol, body, self.timezone)
    }
}

#[async_trait]
impl MarketDataClient for YahooClient {
    async fn fundamentals(&self, symbol: &str) -> Result<RawFundamentals> {
        let crumb = self.crumb().await?.to_string();
        let url = format!("{}/{}", QUOTE_SUMMARY_URL, symbol);
        let body: Value = self.get_json(&url, &[
            ("modules", SUMMARY_MODULES.to_string()),
            ("crumb", crumb),
        ]).await?;
        parse_quote_summary(symbol, body)
    }

    async fn price_history(&self, symbol: &str, range: DateRange) -> Result<PriceSeries> {
        self.chart(symbol, &[
            ("period1", day_start_timestamp(range.start).to_string()),
            ("period2", day_start_timestamp(range.end).to_string()),
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ]).await
    }

    async fn latest_close(&self, symbol: &str) -> Result<Option<f64>> {
        let series = self.chart(symbol, &[
            ("range", "5d".to_string()),
            ("interval", "1d".to_string()),
        ]).await?;
        Ok(series.last_close())
    }

    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<StatementTable> {
        let keys: &[(&str, &str)] = match kind {
            StatementKind::CashFlow => &CASH_FLOW_KEYS,
            StatementKind::BalanceSheet => &BALANCE_SHEET_KEYS,
        };
        let types = keys.iter()
            .map(|(key, _)| format!("annual{}", key))
            .collect::<Vec<_>>()
            .join(",");

        let url = format!("{}/{}", TIMESERIES_URL, symbol);
        let body: Value = self.get_json(&url, &[
            ("symbol", symbol.to_string()),
            ("type", types),
            ("period1", TIMESERIES_START.to_string()),
            ("period2", Utc::now().timestamp().to_string()),
        ]).await?;
        parse_timeseries(body, keys)
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight).timestamp())
        .unwrap_or_default()
}

fn api_error_description(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.as_object()?
        .values()
        .find_map(|envelope| envelope.get("error"))?;
    error.get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| error.as_str().map(str::to_string))
}

fn envelope_error(envelope: &Value) -> Option<String> {
    let error = envelope.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(error.get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string()))
}

/// Yahoo wraps most numbers as `{"raw": 1.0, "fmt": "1.00"}`; some are bare,
/// and a few carry strings such as `"Infinity"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum YahooNumber {
    Plain(f64),
    Wrapped {
        #[serde(default)]
        raw: Option<f64>,
    },
    Other(Value),
}

impl YahooNumber {
    fn value(&self) -> Option<f64> {
        let value = match self {
            YahooNumber::Plain(v) => Some(*v),
            YahooNumber::Wrapped { raw } => *raw,
            YahooNumber::Other(_) => None,
        };
        value.filter(|v| v.is_finite())
    }
}

fn num(field: &Option<YahooNumber>) -> Option<f64> {
    field.as_ref().and_then(YahooNumber::value)
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(rename = "summaryDetail", default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(rename = "defaultKeyStatistics", default)]
    key_statistics: Option<KeyStatisticsModule>,
    #[serde(rename = "financialData", default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(rename = "assetProfile", default)]
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceModule {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<YahooNumber>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryDetailModule {
    #[serde(rename = "fiftyTwoWeekHigh", default)]
    fifty_two_week_high: Option<YahooNumber>,
    #[serde(rename = "fiftyTwoWeekLow", default)]
    fifty_two_week_low: Option<YahooNumber>,
    #[serde(rename = "trailingPE", default)]
    trailing_pe: Option<YahooNumber>,
    #[serde(rename = "forwardPE", default)]
    forward_pe: Option<YahooNumber>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyStatisticsModule {
    #[serde(rename = "enterpriseValue", default)]
    enterprise_value: Option<YahooNumber>,
    #[serde(rename = "forwardPE", default)]
    forward_pe: Option<YahooNumber>,
    #[serde(rename = "priceToBook", default)]
    price_to_book: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
struct FinancialDataModule {
    #[serde(rename = "currentPrice", default)]
    current_price: Option<YahooNumber>,
    #[serde(default)]
    ebitda: Option<YahooNumber>,
    #[serde(rename = "freeCashflow", default)]
    free_cash_flow: Option<YahooNumber>,
    #[serde(rename = "totalDebt", default)]
    total_debt: Option<YahooNumber>,
    #[serde(rename = "totalRevenue", default)]
    total_revenue: Option<YahooNumber>,
    #[serde(rename = "returnOnAssets", default)]
    return_on_assets: Option<YahooNumber>,
    #[serde(rename = "returnOnEquity", default)]
    return_on_equity: Option<YahooNumber>,
    #[serde(rename = "currentRatio", default)]
    current_ratio: Option<YahooNumber>,
    #[serde(rename = "quickRatio", default)]
    quick_ratio: Option<YahooNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfileModule {
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    address2: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    long_business_summary: Option<String>,
    #[serde(default)]
    company_officers: Vec<OfficerEntry>,
}

#[derive(Debug, Deserialize)]
struct OfficerEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

fn first_result(symbol: &str, body: &Value, envelope_key: &str) -> Result<Value> {
    let envelope = body.get(envelope_key)
        .ok_or_else(|| MarketDataError::Upstream(format!("missing '{}' in response", envelope_key)))?;
    if let Some(description) = envelope_error(envelope) {
        return Err(MarketDataError::Upstream(description));
    }
    envelope.get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .cloned()
        .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))
}

pub(crate) fn parse_quote_summary(symbol: &str, body: Value) -> Result<RawFundamentals> {
    let result: QuoteSummaryResult = serde_json::from_value(first_result(symbol, &body, "quoteSummary")?)?;

    let price = result.price.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.key_statistics.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();
    let profile = result.asset_profile.unwrap_or_default();

    Ok(RawFundamentals {
        regular_market_price: num(&price.regular_market_price).or(num(&financial.current_price)),
        fifty_two_week_high: num(&detail.fifty_two_week_high),
        fifty_two_week_low: num(&detail.fifty_two_week_low),
        market_cap: num(&price.market_cap).or(num(&detail.market_cap)),
        trailing_pe: num(&detail.trailing_pe),
        forward_pe: num(&stats.forward_pe).or(num(&detail.forward_pe)),
        enterprise_value: num(&stats.enterprise_value),
        ebitda: num(&financial.ebitda),
        free_cash_flow: num(&financial.free_cash_flow),
        total_debt: num(&financial.total_debt),
        total_revenue: num(&financial.total_revenue),
        return_on_assets: num(&financial.return_on_assets),
        return_on_equity: num(&financial.return_on_equity),
        current_ratio: num(&financial.current_ratio),
        quick_ratio: num(&financial.quick_ratio),
        price_to_book: num(&stats.price_to_book),
        profile: CompanyProfile {
            address1: profile.address1,
            address2: profile.address2,
            city: profile.city,
            country: profile.country,
            phone: profile.phone,
            website: profile.website,
            long_business_summary: profile.long_business_summary,
            officers: profile.company_officers.into_iter()
                .filter_map(|o| Some(CompanyOfficer { name: o.name?, title: o.title }))
                .collect(),
        },
    })
}

pub(crate) fn parse_chart(symbol: &str, body: Value, fallback_tz: Tz) -> Result<PriceSeries> {
    let result = first_result(symbol, &body, "chart")?;

    let tz = result.pointer("/meta/exchangeTimezoneName")
        .and_then(Value::as_str)
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(fallback_tz);

    let timestamps: Vec<i64> = match result.get("timestamp") {
        Some(ts) if !ts.is_null() => serde_json::from_value(ts.clone())?,
        _ => Vec::new(),
    };
    let closes: Vec<Option<f64>> = match result.pointer("/indicators/quote/0/close") {
        Some(c) if !c.is_null() => serde_json::from_value(c.clone())?,
        _ => Vec::new(),
    };

    let points = timestamps.iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close.filter(|c| c.is_finite())?;
            let date = Utc.timestamp_opt(ts, 0).single()?.with_timezone(&tz).date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    Ok(PriceSeries::new(points))
}

pub(crate) fn parse_timeseries(body: Value, keys: &[(&str, &str)]) -> Result<StatementTable> {
    let envelope = body.get("timeseries")
        .ok_or_else(|| MarketDataError::Upstream("missing 'timeseries' in response".to_string()))?;
    if let Some(description) = envelope_error(envelope) {
        return Err(MarketDataError::Upstream(description));
    }

    let mut table = StatementTable::new();
    let results = envelope.get("result").and_then(Value::as_array).cloned().unwrap_or_default();

    for entry in &results {
        let Some(series_type) = entry.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let Some(&(_, item)) = keys.iter().find(|(key, _)| format!("annual{}", key) == series_type) else {
            continue;
        };
        let Some(values) = entry.get(series_type).and_then(Value::as_array) else {
            continue;
        };

        for value in values.iter().filter(|v| !v.is_null()) {
            let period = value.get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            let reported = value.pointer("/reportedValue/raw").and_then(Value::as_f64);
            if let (Some(period), Some(reported)) = (period, reported) {
                table.insert(item, period, reported);
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quote_summary_keeps_missing_fields_absent() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "price": { "marketCap": { "raw": 2.3e9, "fmt": "2.3B" } },
                    "summaryDetail": {
                        "fiftyTwoWeekHigh": { "raw": 55.1 },
                        "trailingPE": { "raw": "Infinity", "fmt": "∞" },
                        "forwardPE": {}
                    },
                    "financialData": {
                        "ebitda": { "raw": 0.0 },
                        "freeCashflow": { "raw": -1.5e9 },
                        "returnOnAssets": 0.05
                    },
                    "assetProfile": {
                        "city": "Istanbul",
                        "companyOfficers": [
                            { "name": "Jane Doe", "title": "CEO & Director" },
                            { "title": "Nameless" }
                        ]
                    }
                }],
                "error": null
            }
        });

        let raw = parse_quote_summary("TEST.IS", body).unwrap();
        assert_eq!(raw.market_cap, Some(2.3e9));
        assert_eq!(raw.fifty_two_week_high, Some(55.1));
        assert_eq!(raw.trailing_pe, None);
        assert_eq!(raw.forward_pe, None);
        assert_eq!(raw.ebitda, Some(0.0));
        assert_eq!(raw.free_cash_flow, Some(-1.5e9));
        assert_eq!(raw.return_on_assets, Some(0.05));
        assert_eq!(raw.enterprise_value, None);
        assert_eq!(raw.profile.city.as_deref(), Some("Istanbul"));
        assert_eq!(raw.profile.officers.len(), 1);
    }

    #[test]
    fn quote_summary_error_is_reported() {
        let body = json!({
            "quoteSummary": {
                "result": null,
                "error": { "code": "Not Found", "description": "Quote not found for symbol: ZZZZ.IS" }
            }
        });
        let err = parse_quote_summary("ZZZZ.IS", body).unwrap_err();
        assert!(err.to_string().contains("ZZZZ.IS"));
    }

    #[test]
    fn chart_uses_exchange_timezone_and_skips_nulls() {
        // 2024-01-02 07:00 UTC is 10:00 in Istanbul
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "exchangeTimezoneName": "Europe/Istanbul" },
                    "timestamp": [1704178800, 1704265200, 1704351600],
                    "indicators": { "quote": [{ "close": [31.5, null, 32.25] }] }
                }],
                "error": null
            }
        });
        let series = parse_chart("TEST.IS", body, chrono_tz::UTC).unwrap();
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.last_close(), Some(32.25));
    }

    #[test]
    fn empty_chart_result_is_no_data() {
        let body = json!({ "chart": { "result": [], "error": null } });
        assert!(matches!(parse_chart("X.IS", body, chrono_tz::UTC), Err(MarketDataError::NoData(_))));
    }

    #[test]
    fn timeseries_maps_types_to_line_items() {
        let body = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": { "symbol": ["TEST.IS"], "type": ["annualTotalDebt"] },
                        "timestamp": [1672444800, 1703980800],
                        "annualTotalDebt": [
                            { "asOfDate": "2022-12-31", "reportedValue": { "raw": 100.0 } },
                            null,
                            { "asOfDate": "2023-12-31", "reportedValue": { "raw": 150.0 } }
                        ]
                    },
                    {
                        "meta": { "symbol": ["TEST.IS"], "type": ["annualNetDebt"] }
                    }
                ],
                "error": null
            }
        });
        let table = parse_timeseries(body, &BALANCE_SHEET_KEYS).unwrap();
        assert!(table.has_line_item("Total Debt"));
        assert!(!table.has_line_item("Net Debt"));
        assert_eq!(table.value("Total Debt", NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()), Some(150.0));
        assert_eq!(table.periods().len(), 2);
    }
}
