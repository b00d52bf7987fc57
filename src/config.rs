// src/config.rs
use std::env;
use std::fs::File;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUNDLED_SYMBOLS: &str = include_str!("../config/symbols.csv");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Symbol table is empty")]
    EmptySymbolTable,
}

#[derive(Debug, Deserialize)]
struct SymbolRow {
    symbol: String,
    label: String,
}

/// Ordered ticker → label table. Row order is display order on the overview page.
#[derive(Debug, Clone)]
pub struct SymbolUniverse {
    entries: Vec<(String, String)>,
}

impl SymbolUniverse {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries: Vec<(String, String)> = Vec::new();

        for row in rdr.deserialize() {
            let row: SymbolRow = row?;
            if row.symbol.is_empty() {
                continue;
            }
            if entries.iter().any(|(symbol, _)| *symbol == row.symbol) {
                warn!("Duplicate symbol {} in symbol table, keeping first entry", row.symbol);
                continue;
            }
            entries.push((row.symbol, row.label));
        }

        if entries.is_empty() {
            return Err(ConfigError::EmptySymbolTable);
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// The table shipped in `config/symbols.csv`.
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_reader(BUNDLED_SYMBOLS.as_bytes())
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            entries: pairs.into_iter().map(|(s, l)| (s.into(), l.into())).collect(),
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(symbol, _)| symbol.as_str())
    }

    pub fn label(&self, symbol: &str) -> Option<&str> {
        self.entries.iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, label)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Display currency for a price chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Currency {
    pub code: String,
    pub symbol: String,
}

impl Currency {
    pub fn new(code: &str, symbol: &str) -> Self {
        Self { code: code.to_string(), symbol: symbol.to_string() }
    }

    pub fn usd() -> Self {
        Self::new("USD", "$")
    }

    pub fn lira() -> Self {
        Self::new("TL", "₺")
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub symbols: SymbolUniverse,
    pub history_start: NaiveDate,
    pub fx_symbol: String,
    pub currency: Currency,
    pub fetch_concurrency: usize,
    pub yahoo_timeout: Duration,
    pub market_timezone: Tz,
    pub comparison_years: Vec<i32>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let symbols = match env::var("SYMBOLS_FILE") {
            Ok(path) => {
                info!("Loading symbol table from {}", path);
                SymbolUniverse::from_file(&path)?
            }
            Err(_) => SymbolUniverse::bundled()?,
        };
        info!("Symbol table has {} entries", symbols.len());

        let history_start = env_or("HISTORY_START", "2020-01-01");
        let history_start = NaiveDate::parse_from_str(&history_start, "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidValue { key: "HISTORY_START", value: history_start.clone() })?;

        let fetch_concurrency: usize = parse_env("FETCH_CONCURRENCY", "4")?;
        let timeout_secs: u64 = parse_env("YAHOO_TIMEOUT_SECS", "10")?;
        let market_timezone: Tz = parse_env("MARKET_TIMEZONE", "Europe/Istanbul")?;
        let comparison_years = parse_years(&env_or("COMPARISON_YEARS", "2021,2022,2023"))?;

        Ok(Self {
            port: parse_env("PORT", "3030")?,
            symbols,
            history_start,
            fx_symbol: env_or("FX_SYMBOL", "TRY=X"),
            currency: Currency::new(&env_or("CURRENCY_CODE", "TL"), &env_or("CURRENCY_SYMBOL", "₺")),
            fetch_concurrency: fetch_concurrency.max(1),
            yahoo_timeout: Duration::from_secs(timeout_secs),
            market_timezone,
            comparison_years,
        })
    }

    /// Defaults with the bundled symbol table, no environment lookups.
    pub fn with_symbols(symbols: SymbolUniverse) -> Self {
        Self {
            port: 3030,
            symbols,
            history_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            fx_symbol: "TRY=X".to_string(),
            currency: Currency::lira(),
            fetch_concurrency: 4,
            yahoo_timeout: Duration::from_secs(10),
            market_timezone: chrono_tz::Europe::Istanbul,
            comparison_years: vec![2021, 2022, 2023],
        }
    }
}

fn env_or(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("${} not set, defaulting to {}", key, default);
        default.to_string()
    })
}

fn parse_env<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env_or(key, default);
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue { key, value })
}

fn parse_years(value: &str) -> Result<Vec<i32>, ConfigError> {
    let mut years = value.split(',')
        .map(|y| y.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::InvalidValue { key: "COMPARISON_YEARS", value: value.to_string() })?;
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_keeps_declared_order() {
        let universe = SymbolUniverse::bundled().unwrap();
        let symbols: Vec<&str> = universe.symbols().collect();
        assert_eq!(symbols.len(), 27);
        assert_eq!(symbols[0], "ARCLK.IS");
        assert_eq!(symbols[1], "ALARK.IS");
        assert_eq!(symbols[26], "TUPRS.IS");
        assert_eq!(universe.label("THYAO.IS"), Some("THYAO"));
        assert_eq!(universe.label("ZZZZ.IS"), None);
    }

    #[test]
    fn csv_rows_are_trimmed_and_deduplicated() {
        let csv = "symbol,label\n B.IS , B \nA.IS,A\nB.IS,Other\n";
        let universe = SymbolUniverse::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(universe.symbols().collect::<Vec<_>>(), vec!["B.IS", "A.IS"]);
        assert_eq!(universe.label("B.IS"), Some("B"));
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = SymbolUniverse::from_reader("symbol,label\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySymbolTable));
    }

    #[test]
    fn years_are_sorted() {
        assert_eq!(parse_years("2023, 2021,2022").unwrap(), vec![2021, 2022, 2023]);
        assert!(parse_years("20x1").is_err());
    }
}
