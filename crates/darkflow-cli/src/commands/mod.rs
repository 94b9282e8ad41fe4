mod analyze;
mod watch;
mod watchlist;

use std::sync::Arc;

use darkflow_core::{
    CacheMode, CacheStore, Pipeline, PipelineConfig, PipelineSources, ShortInterestStrategy,
    SignalStrategy, StandardStrategy, TradingDate, Watchlist,
};

use crate::cli::{Cli, Command, RunArgs, StrategyArg};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Analyze(args) => analyze::run(cli, args).await,
        Command::Watch(args) => watch::run(cli, args).await,
        Command::Watchlist(args) => watchlist::run(cli, args),
    }
}

/// `--symbol` overrides, or the default watchlist when none were given.
fn resolve_watchlist(symbols: &[String]) -> Result<Watchlist, CliError> {
    if symbols.is_empty() {
        return Ok(Watchlist::default());
    }
    Ok(Watchlist::parse(symbols)?)
}

fn config_from(args: &RunArgs) -> Result<PipelineConfig, CliError> {
    let config = PipelineConfig::default()
        .with_lookback_days(args.days)
        .with_request_timeout_ms(args.timeout_ms);
    let config = PipelineConfig {
        requests_per_second: args.requests_per_second,
        ..config
    };
    config.validate()?;
    Ok(config)
}

fn strategy_from(args: &RunArgs, config: &PipelineConfig) -> Arc<dyn SignalStrategy> {
    match args.strategy {
        StrategyArg::Standard => Arc::new(StandardStrategy::new(config.thresholds)),
        StrategyArg::ShortInterest => Arc::new(ShortInterestStrategy::new(config.thresholds)),
    }
}

fn as_of_from(args: &RunArgs) -> Result<Option<TradingDate>, CliError> {
    args.as_of
        .as_deref()
        .map(TradingDate::parse)
        .transpose()
        .map_err(CliError::from)
}

fn cache_mode(args: &RunArgs) -> CacheMode {
    if args.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    }
}

/// Builds a pipeline over live sources sharing one process-wide cache.
fn build_pipeline(args: &RunArgs) -> Result<Pipeline, CliError> {
    let config = config_from(args)?;
    let cache = CacheStore::new(config.cache_ttl);
    let watchlist = resolve_watchlist(&args.symbols)?;
    let strategy = strategy_from(args, &config);

    let mut sources = PipelineSources::live(&config, &cache);
    if args.no_short_interest {
        sources.short_interest = None;
    }

    Ok(Pipeline::new(config, watchlist, sources, cache)?
        .with_strategy(strategy)
        .with_sort(args.sort.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).expect("parses");
        match cli.command {
            Command::Analyze(args) => args.run,
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn days_outside_range_fail_validation() {
        let args = run_args(&["darkflow", "analyze", "--days", "10"]);
        let err = config_from(&args).expect_err("too short");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn symbol_overrides_replace_the_default_watchlist() {
        let args = run_args(&["darkflow", "analyze", "--symbol", "GME=GameStop"]);
        let watchlist = resolve_watchlist(&args.symbols).expect("valid");
        assert_eq!(watchlist.len(), 1);
        assert_eq!(watchlist.entries()[0].name, "GameStop");

        assert_eq!(resolve_watchlist(&[]).expect("default").len(), 9);
    }

    #[test]
    fn strategy_and_date_flags() {
        let args = run_args(&[
            "darkflow",
            "analyze",
            "--strategy",
            "short-interest",
            "--as-of",
            "2024-03-08",
            "--refresh",
        ]);
        let config = config_from(&args).expect("valid");

        assert_eq!(strategy_from(&args, &config).name(), "short-interest");
        assert_eq!(
            as_of_from(&args).expect("valid date"),
            Some(TradingDate::parse("2024-03-08").expect("date"))
        );
        assert_eq!(cache_mode(&args), CacheMode::Refresh);
    }
}
