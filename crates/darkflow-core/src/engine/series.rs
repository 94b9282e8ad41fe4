use crate::engine::ratios::compute_ratios;
use crate::engine::rolling::{tail_mean, TrailingMean};
use crate::{
    round2, DailyVolumeSample, DerivedDailyRatios, HistoryRow, LatestRatios, SymbolHistory,
    TradingDate,
};

/// Window of the trailing average and of the summary comparison.
pub const TEN_DAY_WINDOW: usize = 10;

/// A day that survived ratio computation, with its unrounded ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioDay {
    pub sample: DailyVolumeSample,
    pub ratios: DerivedDailyRatios,
    pub off_exchange_short_ratio: f64,
}

/// Ascending, de-duplicated series of usable days for one symbol.
///
/// Days without market volume or without off-exchange volume are dropped
/// during construction. Every statistic is computed on unrounded values;
/// rounding happens only when rows and summaries are produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioSeries {
    days: Vec<RatioDay>,
}

/// Top-level figures derived from the tail of a [`RatioSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub latest_date: TradingDate,
    /// Rounded latest ratios, as displayed and classified.
    pub latest: LatestRatios,
    /// Unrounded latest market-wide short ratio.
    pub latest_market_wide_short_ratio: f64,
    pub latest_total_market_volume: u64,
    pub ten_day_average_off_exchange_short_ratio: f64,
    pub change_vs_ten_day_average: f64,
}

impl RatioSeries {
    pub fn from_samples(mut samples: Vec<DailyVolumeSample>) -> Self {
        samples.sort_by_key(|sample| sample.date);
        samples.dedup_by_key(|sample| sample.date);

        let days = samples
            .into_iter()
            .filter_map(|sample| {
                let ratios = compute_ratios(&sample)?;
                let off_exchange_short_ratio = ratios.off_exchange_short_ratio?;
                Some(RatioDay {
                    sample,
                    ratios,
                    off_exchange_short_ratio,
                })
            })
            .collect();

        Self { days }
    }

    pub fn days(&self) -> &[RatioDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Presentation rows with the per-row trailing ten-day average.
    pub fn history(&self) -> SymbolHistory {
        let mut trailing = TrailingMean::new(TEN_DAY_WINDOW);
        let rows = self
            .days
            .iter()
            .map(|day| {
                trailing.push(day.off_exchange_short_ratio);
                HistoryRow {
                    sample: day.sample,
                    ratios: day.ratios.rounded(),
                    ten_day_average_off_exchange_short_ratio: round2(
                        trailing.mean().unwrap_or(day.off_exchange_short_ratio),
                    ),
                }
            })
            .collect();
        SymbolHistory::new(rows)
    }

    /// Latest day against the mean of the last ten days, `None` when empty.
    pub fn summary(&self) -> Option<SeriesSummary> {
        let latest = self.days.last()?;
        let short_ratios = self
            .days
            .iter()
            .map(|day| day.off_exchange_short_ratio)
            .collect::<Vec<_>>();
        let average = tail_mean(&short_ratios, TEN_DAY_WINDOW)?;

        Some(SeriesSummary {
            latest_date: latest.sample.date,
            latest: LatestRatios {
                off_exchange_ratio: round2(latest.ratios.off_exchange_ratio),
                off_exchange_short_ratio: round2(latest.off_exchange_short_ratio),
                market_wide_short_ratio: round2(latest.ratios.market_wide_short_ratio),
            },
            latest_market_wide_short_ratio: latest.ratios.market_wide_short_ratio,
            latest_total_market_volume: latest.sample.total_market_volume,
            ten_day_average_off_exchange_short_ratio: round2(average),
            change_vs_ten_day_average: round2(latest.off_exchange_short_ratio - average),
        })
    }
}
