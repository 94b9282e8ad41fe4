use crate::sources::{ShortVolumeObservation, VolumeSeries};
use crate::{round2, DailyVolumeSample, DerivedDailyRatios};

/// Upper bound for the off-exchange share. The short-volume file sometimes
/// reports more off-exchange volume than traded in total.
pub const OFF_EXCHANGE_RATIO_CAP: f64 = 100.0;

/// Unrounded percent ratios for one sample.
///
/// Returns `None` when the day has no market volume; such days are dropped
/// from the history rather than reported as zero.
pub fn compute_ratios(sample: &DailyVolumeSample) -> Option<DerivedDailyRatios> {
    if sample.total_market_volume == 0 {
        return None;
    }

    let total = sample.total_market_volume as f64;
    let off_exchange_total = sample.off_exchange_total_volume as f64;
    let off_exchange_short = sample.off_exchange_short_volume as f64;

    let off_exchange_ratio = (off_exchange_total / total * 100.0).min(OFF_EXCHANGE_RATIO_CAP);
    let off_exchange_short_ratio = (sample.off_exchange_total_volume > 0)
        .then(|| off_exchange_short / off_exchange_total * 100.0);
    let market_wide_short_ratio = off_exchange_short / total * 100.0;

    Some(DerivedDailyRatios {
        off_exchange_ratio,
        off_exchange_short_ratio,
        market_wide_short_ratio,
    })
}

/// Joins scanned short-volume observations with market volume by calendar
/// date. A date missing from `market` gets zero market volume, which
/// [`compute_ratios`] later drops.
pub fn align_samples(
    observations: &[ShortVolumeObservation],
    market: &VolumeSeries,
) -> Vec<DailyVolumeSample> {
    observations
        .iter()
        .filter_map(|observation| {
            let sample = DailyVolumeSample::new(
                observation.date,
                market.volume_on(observation.date),
                observation.record.total_volume,
                observation.record.short_volume,
            );
            match sample {
                Ok(sample) => Some(sample),
                Err(error) => {
                    tracing::debug!(date = %observation.date, %error, "discarding inconsistent sample");
                    None
                }
            }
        })
        .collect()
}

/// Latest off-exchange short volume as a percent of reported shares short.
///
/// `market_wide_short_ratio × total_market_volume / 100` recovers the
/// off-exchange short volume. Zero when no shares are reported short.
pub fn off_exchange_short_coverage(
    market_wide_short_ratio: f64,
    total_market_volume: u64,
    shares_short: u64,
) -> f64 {
    if shares_short == 0 {
        return 0.0;
    }
    let short_volume = market_wide_short_ratio * total_market_volume as f64 / 100.0;
    round2(short_volume / shares_short as f64 * 100.0)
}
