//! # Darkflow Core
//!
//! Off-exchange short-volume metrics for a watchlist of equities.
//!
//! ## Overview
//!
//! For every watched symbol a run:
//!
//! - fetches daily consolidated volume from the quote provider
//! - scans backward through the regulator's daily short-volume files
//! - joins both feeds by calendar date into [`DailyVolumeSample`]s
//! - derives off-exchange, off-exchange short and market-wide short ratios
//! - compares the latest day with its ten-day average and classifies a [`Signal`]
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Time-bounded memoization shared by the sources |
//! | [`config`] | Pipeline tunables and the watchlist |
//! | [`domain`] | Samples, ratios, history rows and results |
//! | [`engine`] | Ratio computation and rolling statistics |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Run orchestration |
//! | [`report`] | Run report, skip reasons and ordering |
//! | [`signal`] | Classifier strategies and positioning quadrant |
//! | [`sources`] | Upstream adapters |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use darkflow_core::{CacheStore, Pipeline, PipelineConfig, PipelineSources, Watchlist};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let cache = CacheStore::new(config.cache_ttl);
//!     let sources = PipelineSources::live(&config, &cache);
//!     let pipeline = Pipeline::new(config, Watchlist::default(), sources, cache)?;
//!
//!     let report = pipeline.run().await?;
//!     for result in &report.results {
//!         println!("{} {:.2}% {}", result.symbol, result.latest.off_exchange_ratio, result.signal.kind());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Source calls return [`SourceError`]; the pipeline turns them into skipped
//! dates or skipped symbols. Only [`PipelineError::EmptyRunResult`] reaches
//! the caller when nothing could be computed.

pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod report;
pub mod signal;
pub mod sources;

// Caching
pub use cache::{CacheKey, CacheMode, CacheOperation, CacheStore, DEFAULT_CACHE_TTL};

// Configuration
pub use config::{PipelineConfig, Watchlist, WatchlistEntry};

// Domain models
pub use domain::{
    round2, DailyVolumeSample, DerivedDailyRatios, HistoryRow, LatestRatios,
    ShortInterestSnapshot, SymbolAnalysisResult, SymbolHistory, Symbol, TradingDate,
};

// Ratio engine
pub use engine::{align_samples, compute_ratios, off_exchange_short_coverage, RatioSeries};

// Error types
pub use error::{CoreError, PipelineError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, ScriptedHttpClient,
};

// Orchestration
pub use pipeline::{Pipeline, PipelineSources};
pub use report::{RunReport, SkipReason, SkippedSymbol, SortKey};

// Classification
pub use signal::{
    PositioningQuadrant, ShortInterestStrategy, Signal, SignalInput, SignalStrategy,
    SignalThresholds, StandardStrategy,
};

// Sources
pub use sources::{
    scan_short_volume, FinraShortVolumeFeed, MarketVolumeSource, RequestPacer, ShortInterestSource,
    ShortVolumeFeed, ShortVolumeObservation, ShortVolumeRecord, SourceError, SourceErrorKind,
    VolumePoint, VolumeSeries, YahooMarketVolume, YahooSession, YahooShortInterest,
};
