//! One run over the watchlist: fetch, scan, align, compute, classify.
//!
//! Symbols are processed one after another. Any failure scoped to a date or
//! a symbol is logged and skipped; the only hard failure is a run in which
//! no symbol produced a result.

use std::sync::Arc;

use crate::cache::{CacheMode, CacheStore};
use crate::config::{PipelineConfig, Watchlist, WatchlistEntry};
use crate::engine::{align_samples, off_exchange_short_coverage, RatioSeries};
use crate::error::PipelineError;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::report::{RunReport, SkipReason, SkippedSymbol, SortKey};
use crate::signal::{PositioningQuadrant, SignalInput, SignalStrategy, StandardStrategy};
use crate::sources::{
    scan_short_volume, FinraShortVolumeFeed, MarketVolumeSource, RequestPacer, ShortInterestSource,
    ShortVolumeFeed, YahooMarketVolume, YahooSession, YahooShortInterest,
};
use crate::{ShortInterestSnapshot, SymbolAnalysisResult, TradingDate};

/// Upstream adapters a pipeline reads from.
#[derive(Clone)]
pub struct PipelineSources {
    pub market_volume: Arc<dyn MarketVolumeSource>,
    pub short_volume: Arc<dyn ShortVolumeFeed>,
    /// Optional; when absent results carry no snapshot.
    pub short_interest: Option<Arc<dyn ShortInterestSource>>,
}

impl PipelineSources {
    /// Production adapters sharing one HTTP client and `cache`.
    pub fn live(config: &PipelineConfig, cache: &CacheStore) -> Self {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let finra_pacer = RequestPacer::per_second(config.requests_per_second);
        let quote_pacer = RequestPacer::per_second(config.requests_per_second);
        let session = Arc::new(YahooSession::new(Arc::clone(&http_client)));

        Self {
            market_volume: Arc::new(
                YahooMarketVolume::new(Arc::clone(&http_client), cache.clone())
                    .with_pacer(quote_pacer.clone())
                    .with_timeout_ms(config.quote_timeout_ms)
                    .with_padding_days(config.market_volume_padding_days),
            ),
            short_volume: Arc::new(
                FinraShortVolumeFeed::new(Arc::clone(&http_client), cache.clone())
                    .with_pacer(finra_pacer)
                    .with_timeout_ms(config.request_timeout_ms),
            ),
            short_interest: Some(Arc::new(
                YahooShortInterest::new(http_client, session, cache.clone())
                    .with_pacer(quote_pacer)
                    .with_timeout_ms(config.quote_timeout_ms),
            )),
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    watchlist: Watchlist,
    sources: PipelineSources,
    cache: CacheStore,
    strategy: Arc<dyn SignalStrategy>,
    sort: SortKey,
}

impl Pipeline {
    /// Validates `config`; the standard strategy and default ordering apply
    /// until overridden.
    pub fn new(
        config: PipelineConfig,
        watchlist: Watchlist,
        sources: PipelineSources,
        cache: CacheStore,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let strategy = Arc::new(StandardStrategy::new(config.thresholds));
        Ok(Self {
            config,
            watchlist,
            sources,
            cache,
            strategy,
            sort: SortKey::default(),
        })
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn SignalStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    /// Runs as of the current UTC date, honoring the cache.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        self.run_as_of(TradingDate::today_utc(), CacheMode::Use).await
    }

    pub async fn run_as_of(
        &self,
        as_of: TradingDate,
        mode: CacheMode,
    ) -> Result<RunReport, PipelineError> {
        let lift_bypass = self.cache.prepare(mode).await;
        let report = self.run_watchlist(as_of).await;
        if lift_bypass {
            self.cache.set_bypass(false).await;
        }
        report
    }

    async fn run_watchlist(&self, as_of: TradingDate) -> Result<RunReport, PipelineError> {
        tracing::info!(
            %as_of,
            symbols = self.watchlist.len(),
            lookback_days = self.config.lookback_days,
            strategy = self.strategy.name(),
            "starting run"
        );

        let mut results = Vec::with_capacity(self.watchlist.len());
        let mut skipped = Vec::new();

        for entry in self.watchlist.entries() {
            match self.analyze(entry, as_of).await {
                Ok(result) => results.push(result),
                Err(reason) => {
                    tracing::warn!(symbol = %entry.symbol, %reason, "symbol skipped");
                    skipped.push(SkippedSymbol {
                        symbol: entry.symbol.clone(),
                        name: entry.name.clone(),
                        reason,
                    });
                }
            }
        }

        if results.is_empty() {
            return Err(PipelineError::EmptyRunResult {
                attempted: self.watchlist.len(),
                skipped,
            });
        }

        self.sort.sort(&mut results);
        tracing::info!(%as_of, produced = results.len(), skipped = skipped.len(), "run finished");

        Ok(RunReport {
            as_of,
            results,
            skipped,
        })
    }

    async fn analyze(
        &self,
        entry: &WatchlistEntry,
        as_of: TradingDate,
    ) -> Result<SymbolAnalysisResult, SkipReason> {
        let symbol = &entry.symbol;

        let market = self
            .sources
            .market_volume
            .daily_volume(symbol, self.config.market_volume_days(), as_of)
            .await
            .map_err(|error| SkipReason::market_volume(&error))?;

        let scan = scan_short_volume(
            self.sources.short_volume.as_ref(),
            symbol,
            as_of,
            self.config.lookback_days,
            self.config.scan_margin_days,
            |observation| {
                observation.record.total_volume > 0 && market.volume_on(observation.date) > 0
            },
        )
        .await;
        if scan.is_empty() {
            if scan.unusable > 0 {
                return Err(SkipReason::NoUsableDays {
                    observations: scan.unusable as usize,
                });
            }
            return Err(SkipReason::NoShortVolume {
                candidates_tried: scan.candidates_tried,
            });
        }
        tracing::debug!(
            %symbol,
            found = scan.observations.len(),
            misses = scan.misses,
            unusable = scan.unusable,
            "short volume scan complete"
        );

        let series = RatioSeries::from_samples(align_samples(&scan.observations, &market));
        let summary = series.summary().ok_or(SkipReason::NoUsableDays {
            observations: scan.observations.len(),
        })?;

        let short_interest = match &self.sources.short_interest {
            Some(source) => Some(match source.snapshot(symbol).await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    tracing::warn!(%symbol, %error, "short interest unavailable; using degraded snapshot");
                    ShortInterestSnapshot::degraded()
                }
            }),
            None => None,
        };

        let off_exchange_short_coverage = short_interest
            .map(|snapshot| {
                off_exchange_short_coverage(
                    summary.latest_market_wide_short_ratio,
                    summary.latest_total_market_volume,
                    snapshot.shares_short,
                )
            })
            .unwrap_or(0.0);

        let signal = self.strategy.classify(&SignalInput {
            latest: summary.latest,
            change_vs_ten_day_average: summary.change_vs_ten_day_average,
            short_interest,
        });

        Ok(SymbolAnalysisResult {
            symbol: symbol.clone(),
            name: entry.name.clone(),
            latest_date: summary.latest_date,
            latest: summary.latest,
            ten_day_average_off_exchange_short_ratio: summary
                .ten_day_average_off_exchange_short_ratio,
            change_vs_ten_day_average: summary.change_vs_ten_day_average,
            short_interest,
            off_exchange_short_coverage,
            quadrant: PositioningQuadrant::from_ratios(&summary.latest),
            signal,
            history: series.history(),
        })
    }
}
