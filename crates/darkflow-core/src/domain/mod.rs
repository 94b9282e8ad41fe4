//! # Domain Models
//!
//! Strongly-typed records that flow through the metric pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker |
//! | [`TradingDate`] | Calendar date of a session |
//! | [`DailyVolumeSample`] | Market and off-exchange volumes for one day |
//! | [`DerivedDailyRatios`] | Percent ratios computed from one sample |
//! | [`HistoryRow`] / [`SymbolHistory`] | Ascending per-symbol series |
//! | [`ShortInterestSnapshot`] | Days-to-cover and short float from the quote provider |
//! | [`SymbolAnalysisResult`] | Summary consumed by presenters |
//!
//! Samples validate their volume invariant at construction; everything
//! downstream of a sample is derived and immutable.

mod models;
mod symbol;
mod trading_date;

pub use models::{
    round2, DailyVolumeSample, DerivedDailyRatios, HistoryRow, LatestRatios,
    ShortInterestSnapshot, SymbolAnalysisResult, SymbolHistory,
};
pub use symbol::Symbol;
pub use trading_date::TradingDate;
