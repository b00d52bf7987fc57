use bist_dashboard::config::AppConfig;
use bist_dashboard::services::market_data::{DateRange, MarketDataClient, StatementKind};
use bist_dashboard::services::pages::build_profile;
use bist_dashboard::services::statements::{select_net_debt_items, CASH_FLOW_ITEMS};
use bist_dashboard::services::yahoo::YahooClient;
use chrono::{Duration, Utc};
use log::{info, error, warn};
use dotenv::dotenv;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let symbol = std::env::args().nth(1).unwrap_or_else(|| "THYAO.IS".to_string());
    if config.symbols.label(&symbol).is_none() {
        warn!("{} is not in the configured symbol table", symbol);
    }

    let http = YahooClient::build_http(config.yahoo_timeout)?;
    let client = YahooClient::new(http, config.market_timezone);

    info!("Testing Yahoo Finance fundamentals for {}...", symbol);
    match client.fundamentals(&symbol).await {
        Ok(raw) => {
            info!("SUCCESS: price={:?} market_cap={:?}", raw.regular_market_price, raw.market_cap);
            info!("  EV={:?} EBITDA={:?} FCF={:?}", raw.enterprise_value, raw.ebitda, raw.free_cash_flow);
            info!("  city={:?} website={:?} officers={}", raw.profile.city, raw.profile.website, raw.profile.officers.len());
        }
        Err(e) => {
            error!("ERROR: Failed to fetch fundamentals: {}", e);
            return Err(e.into());
        }
    }

    let today = Utc::now().with_timezone(&config.market_timezone).date_naive();
    let range = DateRange::new(today - Duration::days(30), today + Duration::days(1));
    let series = client.price_history(&symbol, range).await?;
    info!("Price history: {} closes, last {:?}", series.points.len(), series.last_close());

    let cash_flow = client.statement(&symbol, StatementKind::CashFlow).await?;
    info!("Cash flow periods: {:?}", cash_flow.periods());
    for item in CASH_FLOW_ITEMS {
        if !cash_flow.has_line_item(item) {
            warn!("  missing cash flow item {}", item);
        }
    }

    let balance_sheet = client.statement(&symbol, StatementKind::BalanceSheet).await?;
    info!("Balance sheet periods: {:?}", balance_sheet.periods());
    match select_net_debt_items(&balance_sheet) {
        Ok(selection) => info!("Net debt items: {:?}", selection.items()),
        Err(e) => warn!("Net debt chart unavailable: {}", e),
    }

    if config.symbols.label(&symbol).is_some() {
        let profile = build_profile(&client, &config, &symbol, today).await?;
        info!("Profile: last close {} change {:?} ({:?}%)", profile.last_close, profile.price_change, profile.price_change_pct);
        info!("  P/E {} P/B {} EV/EBITDA {} EV/FCFF {}", profile.pe_ratio, profile.price_to_book, profile.ev_ebitda, profile.ev_fcff);
        info!("  ROA {} ROE {} cash/mcap {}", profile.roa, profile.roe, profile.cash_market_cap);
        info!("  CEO {} CFO {}", profile.ceo, profile.cfo);
    }

    Ok(())
}
