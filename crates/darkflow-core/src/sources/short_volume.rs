use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::sources::SourceError;
use crate::{Symbol, TradingDate};

/// Off-exchange volumes reported for one symbol on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortVolumeRecord {
    pub total_volume: u64,
    pub short_volume: u64,
}

/// A record paired with the date it was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortVolumeObservation {
    pub date: TradingDate,
    pub record: ShortVolumeRecord,
}

/// Per-date off-exchange short volume.
pub trait ShortVolumeFeed: Send + Sync {
    /// Looks up `symbol` in the file published for `date`.
    ///
    /// Weekends, holidays, outages and symbols absent from that day's file are
    /// all reported as errors; a scan treats them identically.
    fn daily_short_volume<'a>(
        &'a self,
        symbol: &'a Symbol,
        date: TradingDate,
    ) -> Pin<Box<dyn Future<Output = Result<ShortVolumeRecord, SourceError>> + Send + 'a>>;
}

/// Result of a backward scan, newest observation first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Observations the caller accepted as usable.
    pub observations: Vec<ShortVolumeObservation>,
    /// Weekday candidates that were fetched.
    pub candidates_tried: u32,
    /// Candidates whose fetch failed and were skipped.
    pub misses: u32,
    /// Candidates that were fetched but rejected by the caller.
    pub unusable: u32,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Walks back from `as_of` one calendar day at a time, skipping weekends.
///
/// Every weekday is one candidate fetch. An observation is kept only when
/// `usable` accepts it, typically because the other feed has volume for that
/// date too. The scan stops when `target` usable observations were collected
/// or `target + margin` candidates were tried, whichever comes first. Failed
/// and rejected candidates never count toward the target, so the result is a
/// sparse series with gaps where nothing usable was found.
pub async fn scan_short_volume<F>(
    feed: &dyn ShortVolumeFeed,
    symbol: &Symbol,
    as_of: TradingDate,
    target: u32,
    margin: u32,
    usable: F,
) -> ScanOutcome
where
    F: Fn(&ShortVolumeObservation) -> bool,
{
    let budget = target.saturating_add(margin);
    let mut outcome = ScanOutcome::default();
    let mut date = as_of;

    while outcome.candidates_tried < budget && (outcome.observations.len() as u32) < target {
        if date.is_weekend() {
            date = date.previous_day();
            continue;
        }

        outcome.candidates_tried += 1;
        match feed.daily_short_volume(symbol, date).await {
            Ok(record) => {
                let observation = ShortVolumeObservation { date, record };
                if usable(&observation) {
                    outcome.observations.push(observation);
                } else {
                    outcome.unusable += 1;
                    tracing::debug!(%symbol, %date, "short volume found but day is unusable; skipping date");
                }
            }
            Err(error) => {
                outcome.misses += 1;
                tracing::debug!(%symbol, %date, %error, "short volume unavailable; skipping date");
            }
        }

        date = date.previous_day();
    }

    outcome
}
