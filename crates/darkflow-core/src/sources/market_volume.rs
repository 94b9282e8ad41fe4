use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::sources::SourceError;
use crate::{Symbol, TradingDate};

/// Total consolidated volume for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub date: TradingDate,
    pub volume: u64,
}

/// Dated total-volume series for one symbol, ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeSeries {
    points: Vec<VolumePoint>,
}

impl VolumeSeries {
    /// Sorts by date; for duplicated dates the last point wins.
    pub fn new(mut points: Vec<VolumePoint>) -> Self {
        points.reverse();
        points.sort_by_key(|point| point.date);
        points.dedup_by_key(|point| point.date);
        Self { points }
    }

    pub fn points(&self) -> &[VolumePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Exact calendar-date match; a missing date reads as zero volume.
    pub fn volume_on(&self, date: TradingDate) -> u64 {
        self.points
            .binary_search_by_key(&date, |point| point.date)
            .map(|index| self.points[index].volume)
            .unwrap_or(0)
    }
}

/// Total traded volume per day for a symbol.
pub trait MarketVolumeSource: Send + Sync {
    /// Fetches at least `lookback_days` of sessions ending at `as_of`.
    ///
    /// Adapters request a wider calendar range than `lookback_days` so that
    /// weekends and holidays do not starve the series. An empty series is
    /// reported as [`SourceError`] with kind `NotFound`.
    fn daily_volume<'a>(
        &'a self,
        symbol: &'a Symbol,
        lookback_days: u32,
        as_of: TradingDate,
    ) -> Pin<Box<dyn Future<Output = Result<VolumeSeries, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, volume: u64) -> VolumePoint {
        VolumePoint {
            date: TradingDate::parse(date).expect("valid date"),
            volume,
        }
    }

    #[test]
    fn looks_up_by_calendar_date() {
        let series = VolumeSeries::new(vec![point("2024-03-08", 300), point("2024-03-07", 200)]);

        assert_eq!(series.volume_on(TradingDate::parse("2024-03-07").expect("date")), 200);
        assert_eq!(series.volume_on(TradingDate::parse("2024-03-08").expect("date")), 300);
        assert_eq!(series.volume_on(TradingDate::parse("2024-03-06").expect("date")), 0);
    }

    #[test]
    fn later_duplicate_replaces_earlier() {
        let series = VolumeSeries::new(vec![point("2024-03-08", 1), point("2024-03-08", 2)]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].volume, 2);
    }
}
