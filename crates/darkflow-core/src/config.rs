//! Run configuration: scan sizes, timeouts, pacing and the watchlist.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_TTL;
use crate::signal::SignalThresholds;
use crate::{Symbol, ValidationError};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 60;
pub const MIN_LOOKBACK_DAYS: u32 = 30;
pub const MAX_LOOKBACK_DAYS: u32 = 90;
pub const DEFAULT_SCAN_MARGIN_DAYS: u32 = 5;
pub const DEFAULT_MARKET_VOLUME_PADDING_DAYS: u32 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_QUOTE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Tunables for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of valid short-volume days to collect per symbol.
    pub lookback_days: u32,
    /// Extra weekday candidates tried beyond `lookback_days` before giving up.
    pub scan_margin_days: u32,
    /// Calendar days added to the market-volume request range.
    pub market_volume_padding_days: u32,
    /// Timeout for each short-volume file download.
    pub request_timeout_ms: u64,
    /// Timeout for quote-provider calls.
    pub quote_timeout_ms: u64,
    pub cache_ttl: Duration,
    /// Outbound request budget per upstream; zero disables pacing.
    pub requests_per_second: u32,
    pub thresholds: SignalThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            scan_margin_days: DEFAULT_SCAN_MARGIN_DAYS,
            market_volume_padding_days: DEFAULT_MARKET_VOLUME_PADDING_DAYS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            quote_timeout_ms: DEFAULT_QUOTE_TIMEOUT_MS,
            cache_ttl: DEFAULT_CACHE_TTL,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            thresholds: SignalThresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_lookback_days(mut self, lookback_days: u32) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range(
            "lookback_days",
            u64::from(self.lookback_days),
            u64::from(MIN_LOOKBACK_DAYS),
            u64::from(MAX_LOOKBACK_DAYS),
        )?;
        check_range("scan_margin_days", u64::from(self.scan_margin_days), 0, 30)?;
        check_range(
            "market_volume_padding_days",
            u64::from(self.market_volume_padding_days),
            0,
            60,
        )?;
        check_range("request_timeout_ms", self.request_timeout_ms, 100, 60_000)?;
        check_range("quote_timeout_ms", self.quote_timeout_ms, 100, 60_000)?;
        check_range("requests_per_second", u64::from(self.requests_per_second), 0, 1_000)?;
        Ok(())
    }

    /// Weekday candidates a scan may try.
    pub fn scan_budget(&self) -> u32 {
        self.lookback_days.saturating_add(self.scan_margin_days)
    }

    /// Calendar days the market-volume series must span so that every date a
    /// full scan can reach is covered (five weekdays per seven calendar days).
    pub fn market_volume_days(&self) -> u32 {
        self.scan_budget().saturating_mul(7).div_ceil(5).saturating_add(1)
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// A watched symbol and its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: Symbol,
    pub name: String,
}

impl FromStr for WatchlistEntry {
    type Err = ValidationError;

    /// `SYM` or `SYM=Display Name`; the name defaults to the symbol.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidWatchlistEntry {
            value: value.to_owned(),
        };
        let (raw_symbol, raw_name) = match value.split_once('=') {
            Some((symbol, name)) => (symbol, Some(name.trim())),
            None => (value, None),
        };
        if raw_name.is_some_and(str::is_empty) {
            return Err(invalid());
        }

        let symbol = Symbol::parse(raw_symbol)?;
        let name = raw_name.map_or_else(|| symbol.to_string(), str::to_owned);
        Ok(Self { symbol, name })
    }
}

impl Display for WatchlistEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.symbol, self.name)
    }
}

/// Ordered set of watched symbols, fixed for the lifetime of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist {
    entries: Vec<WatchlistEntry>,
}

const DEFAULT_WATCHLIST: [(&str, &str); 9] = [
    ("AAPL", "Apple"),
    ("MSFT", "Microsoft"),
    ("GOOGL", "Alphabet"),
    ("AMZN", "Amazon"),
    ("NVDA", "NVIDIA"),
    ("META", "Meta"),
    ("TSLA", "Tesla"),
    ("COIN", "Coinbase"),
    ("IBIT", "Bitcoin ETF"),
];

impl Default for Watchlist {
    fn default() -> Self {
        let entries = DEFAULT_WATCHLIST
            .iter()
            .filter_map(|(symbol, name)| {
                Symbol::parse(symbol).ok().map(|symbol| WatchlistEntry {
                    symbol,
                    name: (*name).to_owned(),
                })
            })
            .collect();
        Self { entries }
    }
}

impl Watchlist {
    /// Keeps the first entry for a repeated symbol.
    pub fn new(entries: Vec<WatchlistEntry>) -> Result<Self, ValidationError> {
        let mut unique: Vec<WatchlistEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.iter().any(|existing| existing.symbol == entry.symbol) {
                unique.push(entry);
            }
        }
        if unique.is_empty() {
            return Err(ValidationError::EmptyWatchlist);
        }
        Ok(Self { entries: unique })
    }

    /// Parses `SYM[=Name]` arguments.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, ValidationError> {
        let entries = values
            .iter()
            .map(|value| value.as_ref().parse::<WatchlistEntry>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_of(&self, symbol: &Symbol) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| &entry.symbol == symbol)
            .map(|entry| entry.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_budget(), 65);
        assert_eq!(config.market_volume_days(), 92);
    }

    #[test]
    fn lookback_outside_range_is_rejected() {
        let err = PipelineConfig::default()
            .with_lookback_days(120)
            .validate()
            .expect_err("too long");
        assert_eq!(
            err,
            ValidationError::OutOfRange {
                field: "lookback_days",
                value: 120,
                min: 30,
                max: 90,
            }
        );
        assert!(PipelineConfig::default().with_lookback_days(29).validate().is_err());
        assert!(PipelineConfig::default().with_lookback_days(30).validate().is_ok());
    }

    #[test]
    fn default_watchlist_has_nine_symbols_in_order() {
        let watchlist = Watchlist::default();
        assert_eq!(watchlist.len(), 9);
        assert_eq!(watchlist.entries()[0].symbol.as_str(), "AAPL");
        assert_eq!(watchlist.entries()[8].name, "Bitcoin ETF");
    }

    #[test]
    fn parses_symbol_and_optional_name() {
        let watchlist = Watchlist::parse(&["gme=GameStop", "AMC", "GME=Again"]).expect("valid");
        assert_eq!(watchlist.len(), 2);
        assert_eq!(watchlist.entries()[0].name, "GameStop");
        assert_eq!(watchlist.entries()[1].name, "AMC");
        assert_eq!(
            watchlist.name_of(&Symbol::parse("GME").expect("symbol")),
            Some("GameStop")
        );
    }

    #[test]
    fn rejects_blank_names_and_empty_lists() {
        assert!(matches!(
            "AAPL=".parse::<WatchlistEntry>(),
            Err(ValidationError::InvalidWatchlistEntry { .. })
        ));
        assert_eq!(
            Watchlist::parse::<&str>(&[]).expect_err("empty"),
            ValidationError::EmptyWatchlist
        );
    }
}
