//! Upstream data access.
//!
//! Each upstream is a trait with one production adapter:
//!
//! | Trait | Adapter | Upstream |
//! |-------|---------|----------|
//! | [`MarketVolumeSource`] | [`YahooMarketVolume`] | Daily chart volume from the quote provider |
//! | [`ShortVolumeFeed`] | [`FinraShortVolumeFeed`] | Daily pipe-delimited short-sale volume file |
//! | [`ShortInterestSource`] | [`YahooShortInterest`] | Key-statistics snapshot |
//!
//! Every call returns `Result<_, SourceError>`; none of them panic or retry
//! on their own, and deciding whether a failure skips a date or a symbol is
//! left to the caller.

use std::fmt::{Display, Formatter};

mod finra;
mod market_volume;
mod pacer;
mod short_interest;
mod short_volume;
mod yahoo;

pub use finra::{parse_short_volume_file, FinraShortVolumeFeed, ShortVolumeRow, FINRA_DAILY_BASE_URL};
pub use market_volume::{MarketVolumeSource, VolumePoint, VolumeSeries};
pub use pacer::RequestPacer;
pub use short_interest::ShortInterestSource;
pub use short_volume::{
    scan_short_volume, ScanOutcome, ShortVolumeFeed, ShortVolumeObservation, ShortVolumeRecord,
};
pub use yahoo::{YahooMarketVolume, YahooSession, YahooShortInterest, YAHOO_QUERY_BASE_URL};

/// Source failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Network error, timeout or non-success status.
    Unavailable,
    /// Upstream asked us to slow down.
    RateLimited,
    /// The request itself was rejected before any call was made.
    InvalidRequest,
    /// Upstream answered, but has nothing for this symbol or date.
    NotFound,
    /// Upstream answered with a payload we could not parse.
    Malformed,
}

/// Structured failure for a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message)
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Maps a non-success HTTP status to the matching kind.
    pub fn from_status(upstream: &str, status: u16) -> Self {
        match status {
            404 => Self::not_found(format!("{upstream} returned status 404")),
            429 => Self::rate_limited(format!("{upstream} returned status 429")),
            _ => Self::unavailable(format!("{upstream} returned status {status}")),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Malformed => "source.malformed",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(SourceError::from_status("cdn", 404).kind(), SourceErrorKind::NotFound);
        assert_eq!(SourceError::from_status("cdn", 429).kind(), SourceErrorKind::RateLimited);
        assert_eq!(SourceError::from_status("cdn", 503).kind(), SourceErrorKind::Unavailable);
    }

    #[test]
    fn display_includes_code() {
        let error = SourceError::malformed("missing header");
        assert_eq!(error.to_string(), "missing header (source.malformed)");
    }
}
