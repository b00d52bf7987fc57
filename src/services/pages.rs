// src/services/pages.rs
use std::future::Future;

use chrono::NaiveDate;
use futures::{stream, StreamExt, TryStreamExt};
use log::{error, info, warn};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, Currency};
use crate::models::CompanyOfficer;
use super::calculations::{daily_change, derive_ratios, ev_ebitda};
use super::charts::{build_net_debt_chart, build_price_line_chart, ChartSpec};
use super::formatting::{
    format_cash_to_market_cap, format_fixed, format_market_cap, format_or, format_roa, format_roe,
    format_signed_billions, MISSING_MARKET_CAP, NOT_AVAILABLE,
};
use super::market_data::{self, DateRange, MarketDataClient, MarketDataError, StatementKind};
use super::statements::{extract_line_items, NetDebtSelection, StatementColumn, CASH_FLOW_ITEMS};

const CEO_PATTERN: &str = r"(?i)\b(ceo|chief executive|gm|general manager)\b";
const CFO_PATTERN: &str = r"(?i)\b(cfo|chief financial|head of financial|director of finance|financial director)\b";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Failed to fetch {what} for {symbol}: {source}")]
    Fetch {
        symbol: String,
        what: &'static str,
        #[source]
        source: MarketDataError,
    },
}

/// One row of the market-cap overview.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewRow {
    pub symbol: String,
    pub label: String,
    pub current_price: String,
    pub market_cap: String,
    pub high_52w: String,
    pub low_52w: String,
    pub pe_ratio: Option<String>,
    pub ev_ebitda: Option<String>,
    pub free_cash_flow: Option<String>,
    pub total_debt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileRecord {
    pub symbol: String,
    pub label: String,

    pub last_close: String,
    pub price_change: Option<String>,
    pub price_change_pct: Option<String>,

    pub pe_ratio: String,
    pub price_to_book: String,
    pub ev_ebitda: String,
    pub ev_fcff: String,
    pub roa: String,
    pub roe: String,
    pub current_ratio: String,
    pub quick_ratio: String,
    pub total_debt_to_revenue: String,
    pub cash_market_cap: String,

    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: String,
    pub website: String,
    pub long_description: String,
    pub ceo: String,
    pub cfo: String,

    pub chart_div: String,
    pub usd_chart_div: String,
    pub chart_netdebt_div: Option<String>,
    pub net_debt_selection: Option<NetDebtSelection>,
    pub price_chart: ChartSpec,
    pub usd_chart: ChartSpec,
    pub net_debt_chart: Option<ChartSpec>,

    pub cash_flow_items: Vec<&'static str>,
    pub cash_flow: Vec<StatementColumn>,
}

async fn fetch<T>(
    symbol: &str,
    what: &'static str,
    request: impl Future<Output = market_data::Result<T>>,
) -> Result<T, PageError> {
    request.await.map_err(|source| {
        error!("Failed to fetch {} for {}: {}", what, symbol, source);
        PageError::Fetch { symbol: symbol.to_string(), what, source }
    })
}

fn or_na(value: Option<String>) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

async fn overview_row(
    client: &dyn MarketDataClient,
    symbol: String,
    label: String,
) -> Result<OverviewRow, PageError> {
    let (raw, close) = tokio::try_join!(
        fetch(&symbol, "fundamentals", client.fundamentals(&symbol)),
        fetch(&symbol, "latest close", client.latest_close(&symbol)),
    )?;

    Ok(OverviewRow {
        current_price: format_or(close.or(raw.regular_market_price), MISSING_MARKET_CAP),
        market_cap: format_market_cap(raw.market_cap),
        high_52w: format_or(raw.fifty_two_week_high, MISSING_MARKET_CAP),
        low_52w: format_or(raw.fifty_two_week_low, MISSING_MARKET_CAP),
        pe_ratio: format_fixed(raw.trailing_pe, 2),
        ev_ebitda: format_fixed(ev_ebitda(raw.enterprise_value, raw.ebitda), 2),
        free_cash_flow: format_signed_billions(raw.free_cash_flow),
        total_debt: format_signed_billions(raw.total_debt),
        symbol,
        label,
    })
}

/// Rows for every configured symbol, in configured order. Fetches run up to
/// `fetch_concurrency` at a time; the first failure aborts the page.
pub async fn build_overview(
    client: &dyn MarketDataClient,
    config: &AppConfig,
) -> Result<Vec<OverviewRow>, PageError> {
    let entries: Vec<(String, String)> = config.symbols.symbols()
        .map(|symbol| {
            let label = config.symbols.label(symbol).unwrap_or(symbol);
            (symbol.to_string(), label.to_string())
        })
        .collect();
    info!("Building overview for {} symbols", entries.len());

    stream::iter(entries)
        .map(|(symbol, label)| overview_row(client, symbol, label))
        .buffered(config.fetch_concurrency.max(1))
        .try_collect()
        .await
}

/// First officer whose title matches each role. The CFO search skips the
/// officer already picked as CEO.
pub fn find_officers(officers: &[CompanyOfficer]) -> (Option<String>, Option<String>) {
    let ceo_re = Regex::new(CEO_PATTERN).expect("CEO pattern is valid");
    let cfo_re = Regex::new(CFO_PATTERN).expect("CFO pattern is valid");

    let ceo = officers.iter().position(|o| ceo_re.is_match(officer_title(o)));
    let cfo = officers.iter()
        .enumerate()
        .find(|(i, o)| Some(*i) != ceo && cfo_re.is_match(officer_title(o)))
        .map(|(_, o)| o.name.clone());

    (ceo.map(|i| officers[i].name.clone()), cfo)
}

fn officer_title(officer: &CompanyOfficer) -> &str {
    officer.title.as_deref().unwrap_or("")
}

fn join_address(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{}, {}", a, b)),
        (a, b) => a.or(b),
    }
}

/// Full profile for one symbol. `today` closes the price history range.
pub async fn build_profile(
    client: &dyn MarketDataClient,
    config: &AppConfig,
    symbol: &str,
    today: NaiveDate,
) -> Result<ProfileRecord, PageError> {
    let label = match config.symbols.label(symbol) {
        Some(label) => label.to_string(),
        None => {
            warn!("Rejected unknown symbol {}", symbol);
            return Err(PageError::InvalidSymbol(symbol.to_string()));
        }
    };
    info!("Building profile for {}", symbol);

    let range = DateRange::new(config.history_start, today.succ_opt().unwrap_or(today));
    let (raw, native, fx, cash_flow, balance_sheet) = tokio::try_join!(
        fetch(symbol, "fundamentals", client.fundamentals(symbol)),
        fetch(symbol, "price history", client.price_history(symbol, range)),
        fetch(&config.fx_symbol, "exchange rates", client.price_history(&config.fx_symbol, range)),
        fetch(symbol, "cash flow", client.statement(symbol, StatementKind::CashFlow)),
        fetch(symbol, "balance sheet", client.statement(symbol, StatementKind::BalanceSheet)),
    )?;

    let usd = native.divide_by(&fx);
    let price_chart = build_price_line_chart(&native, &config.currency);
    let usd_chart = build_price_line_chart(&usd, &Currency::usd());

    let (net_debt_chart, net_debt_selection) = match build_net_debt_chart(&balance_sheet, &config.comparison_years) {
        Ok((spec, selection)) => (Some(spec), Some(selection)),
        Err(e) => {
            warn!("No net debt chart for {}: {}", symbol, e);
            (None, None)
        }
    };

    let ratios = derive_ratios(&raw);
    let (ceo, cfo) = find_officers(&raw.profile.officers);

    let (price_change, price_change_pct) = match native.last_two() {
        Some((previous, last)) => {
            let (change, percent) = daily_change(previous, last);
            (format_fixed(Some(change), 2), format_fixed(percent, 2))
        }
        None => (None, None),
    };

    let profile = raw.profile;
    Ok(ProfileRecord {
        symbol: symbol.to_string(),
        label,

        last_close: format_or(native.last_close(), MISSING_MARKET_CAP),
        price_change,
        price_change_pct,

        pe_ratio: format_or(raw.forward_pe, NOT_AVAILABLE),
        price_to_book: format_or(raw.price_to_book, NOT_AVAILABLE),
        ev_ebitda: format_or(ratios.ev_ebitda, NOT_AVAILABLE),
        ev_fcff: format_or(ratios.ev_fcff, NOT_AVAILABLE),
        roa: or_na(format_roa(raw.return_on_assets)),
        roe: or_na(format_roe(raw.return_on_equity)),
        current_ratio: format_or(raw.current_ratio, NOT_AVAILABLE),
        quick_ratio: format_or(raw.quick_ratio, NOT_AVAILABLE),
        total_debt_to_revenue: format_or(ratios.total_debt_to_revenue, NOT_AVAILABLE),
        cash_market_cap: or_na(format_cash_to_market_cap(ratios.cash_to_market_cap)),

        address: or_na(join_address(profile.address1, profile.address2)),
        city: or_na(profile.city),
        country: or_na(profile.country),
        phone: or_na(profile.phone),
        website: or_na(profile.website),
        long_description: or_na(profile.long_business_summary),
        ceo: or_na(ceo),
        cfo: or_na(cfo),

        chart_div: price_chart.to_html("price-chart"),
        usd_chart_div: usd_chart.to_html("usd-chart"),
        chart_netdebt_div: net_debt_chart.as_ref().map(|spec| spec.to_html("net-debt-chart")),
        net_debt_selection,
        price_chart,
        usd_chart,
        net_debt_chart,

        cash_flow_items: CASH_FLOW_ITEMS.to_vec(),
        cash_flow: extract_line_items(&cash_flow, &CASH_FLOW_ITEMS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn officer(name: &str, title: &str) -> CompanyOfficer {
        CompanyOfficer { name: name.to_string(), title: Some(title.to_string()) }
    }

    #[test]
    fn officers_are_matched_by_title() {
        let officers = vec![
            officer("A", "Chairman"),
            officer("B", "General Manager & Director"),
            officer("C", "Chief Financial Officer"),
            officer("D", "CFO"),
        ];
        let (ceo, cfo) = find_officers(&officers);
        assert_eq!(ceo.as_deref(), Some("B"));
        assert_eq!(cfo.as_deref(), Some("C"));
    }

    #[test]
    fn unmatched_officers_stay_absent() {
        let (ceo, cfo) = find_officers(&[officer("A", "Board Member")]);
        assert_eq!((ceo, cfo), (None, None));
    }

    #[test]
    fn address_parts_are_joined() {
        assert_eq!(join_address(Some("Street 1".into()), Some("Sisli".into())).as_deref(), Some("Street 1, Sisli"));
        assert_eq!(join_address(None, Some("Sisli".into())).as_deref(), Some("Sisli"));
        assert_eq!(join_address(None, None), None);
    }

    #[test]
    fn invalid_symbol_message_embeds_symbol() {
        let err = PageError::InvalidSymbol("ZZZZ.IS".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: ZZZZ.IS");
    }
}
