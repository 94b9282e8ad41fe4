use thiserror::Error;

use crate::report::SkippedSymbol;

/// Validation and contract errors exposed by `darkflow-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("date must be YYYY-MM-DD or YYYYMMDD: '{value}'")]
    InvalidDate { value: String },
    #[error("{date} is not a weekday")]
    NotATradingDay { date: String },

    #[error("short volume {short} exceeds off-exchange total volume {total}")]
    ShortExceedsTotal { short: u64, total: u64 },

    #[error("watchlist must contain at least one symbol")]
    EmptyWatchlist,
    #[error("watchlist entry '{value}' must be SYMBOL or SYMBOL=Name")]
    InvalidWatchlistEntry { value: String },

    #[error("unknown sort key '{value}'")]
    InvalidSortKey { value: String },

    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Hard failures of a pipeline run. Per-date and per-symbol failures never
/// surface here; they are skipped and listed in the run report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no symbol produced a result ({attempted} attempted)")]
    EmptyRunResult {
        attempted: usize,
        skipped: Vec<SkippedSymbol>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
