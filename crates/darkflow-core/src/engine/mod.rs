//! Ratio engine: turns aligned daily volumes into percent ratios, the
//! per-row trailing average and the summary comparison.
//!
//! | Step | Function |
//! |------|----------|
//! | Join feeds by date | [`align_samples`] |
//! | Per-day ratios | [`compute_ratios`] |
//! | Ascending series, rows, summary | [`RatioSeries`] |
//! | Short-interest coverage | [`off_exchange_short_coverage`] |

mod ratios;
mod rolling;
mod series;

pub use ratios::{align_samples, compute_ratios, off_exchange_short_coverage, OFF_EXCHANGE_RATIO_CAP};
pub use rolling::{tail_mean, TrailingMean};
pub use series::{RatioDay, RatioSeries, SeriesSummary, TEN_DAY_WINDOW};
