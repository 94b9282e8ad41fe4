use serde::{Deserialize, Serialize};

use crate::signal::{PositioningQuadrant, Signal};
use crate::{Symbol, TradingDate, ValidationError};

/// One symbol's volumes for one trading day, joined from both upstream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyVolumeSample {
    pub date: TradingDate,
    pub total_market_volume: u64,
    pub off_exchange_total_volume: u64,
    pub off_exchange_short_volume: u64,
}

impl DailyVolumeSample {
    /// `off_exchange_total_volume` may exceed `total_market_volume`; the ratio
    /// engine clamps that case instead of rejecting the sample.
    pub fn new(
        date: TradingDate,
        total_market_volume: u64,
        off_exchange_total_volume: u64,
        off_exchange_short_volume: u64,
    ) -> Result<Self, ValidationError> {
        if off_exchange_short_volume > off_exchange_total_volume {
            return Err(ValidationError::ShortExceedsTotal {
                short: off_exchange_short_volume,
                total: off_exchange_total_volume,
            });
        }

        Ok(Self {
            date,
            total_market_volume,
            off_exchange_total_volume,
            off_exchange_short_volume,
        })
    }
}

/// Percent ratios derived from a single [`DailyVolumeSample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedDailyRatios {
    /// Off-exchange share of all traded volume, clamped to `[0, 100]`.
    pub off_exchange_ratio: f64,
    /// Short share of off-exchange volume; `None` when nothing traded off-exchange.
    pub off_exchange_short_ratio: Option<f64>,
    /// Off-exchange short volume against all traded volume.
    pub market_wide_short_ratio: f64,
}

impl DerivedDailyRatios {
    pub fn rounded(self) -> Self {
        Self {
            off_exchange_ratio: round2(self.off_exchange_ratio),
            off_exchange_short_ratio: self.off_exchange_short_ratio.map(round2),
            market_wide_short_ratio: round2(self.market_wide_short_ratio),
        }
    }
}

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A history row as presented: the sample, its rounded ratios and the trailing
/// ten-day average of the off-exchange short ratio ending at this row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub sample: DailyVolumeSample,
    pub ratios: DerivedDailyRatios,
    pub ten_day_average_off_exchange_short_ratio: f64,
}

impl HistoryRow {
    pub fn date(&self) -> TradingDate {
        self.sample.date
    }
}

/// Rows for one symbol, strictly ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolHistory {
    rows: Vec<HistoryRow>,
}

impl SymbolHistory {
    /// Sorts by date and keeps the first row seen for any duplicated date.
    pub fn new(mut rows: Vec<HistoryRow>) -> Self {
        rows.sort_by_key(HistoryRow::date);
        rows.dedup_by_key(|row| row.date());
        Self { rows }
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    pub fn latest(&self) -> Option<&HistoryRow> {
        self.rows.last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Latest-day ratios carried on the summary record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestRatios {
    pub off_exchange_ratio: f64,
    pub off_exchange_short_ratio: f64,
    pub market_wide_short_ratio: f64,
}

impl LatestRatios {
    /// Off-exchange short ratio minus market-wide short ratio.
    pub fn concentration_spread(&self) -> f64 {
        round2(self.off_exchange_short_ratio - self.market_wide_short_ratio)
    }
}

/// Standard short-interest fields from the quote provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShortInterestSnapshot {
    pub shares_short: u64,
    pub short_percent_of_float: f64,
    pub days_to_cover: f64,
    pub shares_outstanding: u64,
    /// Set when the snapshot could not be fetched and every field defaulted to zero.
    pub degraded: bool,
}

impl ShortInterestSnapshot {
    pub const fn degraded() -> Self {
        Self {
            shares_short: 0,
            short_percent_of_float: 0.0,
            days_to_cover: 0.0,
            shares_outstanding: 0,
            degraded: true,
        }
    }
}

/// Per-symbol unit handed to presenters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAnalysisResult {
    pub symbol: Symbol,
    pub name: String,
    pub latest_date: TradingDate,
    pub latest: LatestRatios,
    pub ten_day_average_off_exchange_short_ratio: f64,
    pub change_vs_ten_day_average: f64,
    pub short_interest: Option<ShortInterestSnapshot>,
    /// Latest off-exchange short volume as a percent of reported shares short.
    pub off_exchange_short_coverage: f64,
    pub quadrant: PositioningQuadrant,
    pub signal: Signal,
    pub history: SymbolHistory,
}
