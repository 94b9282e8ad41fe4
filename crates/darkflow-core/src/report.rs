use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sources::SourceError;
use crate::{Symbol, SymbolAnalysisResult, TradingDate, ValidationError};

/// Why a symbol produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The market-volume request failed or came back empty.
    MarketVolumeUnavailable { code: String, message: String },
    /// Every candidate date of the backward scan failed.
    NoShortVolume { candidates_tried: u32 },
    /// Short volume was found but no day had usable volumes on both sides.
    NoUsableDays { observations: usize },
}

impl SkipReason {
    pub fn market_volume(error: &SourceError) -> Self {
        Self::MarketVolumeUnavailable {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarketVolumeUnavailable { code, message } => {
                write!(f, "market volume unavailable: {message} ({code})")
            }
            Self::NoShortVolume { candidates_tried } => {
                write!(f, "no short volume in {candidates_tried} candidate dates")
            }
            Self::NoUsableDays { observations } => {
                write!(f, "none of {observations} short volume days had market volume")
            }
        }
    }
}

/// A watchlist symbol excluded from a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    pub name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Ordering of results in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Highest latest off-exchange ratio first.
    #[default]
    OffExchangeRatio,
    /// Highest days-to-cover first; symbols without a snapshot sort last.
    DaysToCover,
    Symbol,
}

impl SortKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OffExchangeRatio => "off-exchange-ratio",
            Self::DaysToCover => "days-to-cover",
            Self::Symbol => "symbol",
        }
    }

    /// Sorts in place; ties fall back to ascending symbol.
    pub fn sort(self, results: &mut [SymbolAnalysisResult]) {
        results.sort_by(|left, right| {
            let primary = match self {
                Self::OffExchangeRatio => descending(
                    left.latest.off_exchange_ratio,
                    right.latest.off_exchange_ratio,
                ),
                Self::DaysToCover => descending(days_to_cover(left), days_to_cover(right)),
                Self::Symbol => Ordering::Equal,
            };
            primary.then_with(|| left.symbol.cmp(&right.symbol))
        });
    }
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "off-exchange-ratio" => Ok(Self::OffExchangeRatio),
            "days-to-cover" => Ok(Self::DaysToCover),
            "symbol" => Ok(Self::Symbol),
            _ => Err(ValidationError::InvalidSortKey {
                value: value.to_owned(),
            }),
        }
    }
}

fn days_to_cover(result: &SymbolAnalysisResult) -> f64 {
    result
        .short_interest
        .map(|snapshot| snapshot.days_to_cover)
        .unwrap_or(-1.0)
}

fn descending(left: f64, right: f64) -> Ordering {
    right.total_cmp(&left)
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub as_of: TradingDate,
    pub results: Vec<SymbolAnalysisResult>,
    pub skipped: Vec<SkippedSymbol>,
}

impl RunReport {
    pub fn result_for(&self, symbol: &Symbol) -> Option<&SymbolAnalysisResult> {
        self.results.iter().find(|result| &result.symbol == symbol)
    }

    pub fn attempted(&self) -> usize {
        self.results.len() + self.skipped.len()
    }
}
