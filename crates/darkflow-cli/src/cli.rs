//! CLI argument definitions for darkflow.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | One run over the watchlist |
//! | `watch` | Repeated runs on a shared cache |
//! | `watchlist` | Print the configured watchlist |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | `false` | Debug logging for darkflow crates |
//!
//! # Examples
//!
//! ```bash
//! darkflow analyze
//! darkflow analyze --symbol GME=GameStop --symbol AMC --days 30 --format json --pretty
//! darkflow analyze --strategy short-interest --sort days-to-cover
//! darkflow watch --interval-secs 600 --refresh
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use darkflow_core::config::{DEFAULT_LOOKBACK_DAYS, DEFAULT_REQUESTS_PER_SECOND, DEFAULT_REQUEST_TIMEOUT_MS};
use darkflow_core::SortKey;

/// Off-exchange short volume monitor.
///
/// Combines the daily consolidated short-sale volume files with market volume
/// to report off-exchange share, short ratios and positioning signals.
#[derive(Debug, Parser)]
#[command(name = "darkflow", author, version, about = "Off-exchange short volume monitor")]
pub struct Cli {
    /// Output format for results.
    ///
    /// - table: aligned text for terminals (default)
    /// - json: single JSON object
    /// - ndjson: one JSON object per symbol
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log debug events from darkflow to stderr (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze the watchlist once and print the results.
    ///
    /// # Examples
    ///
    ///   darkflow analyze
    ///   darkflow analyze --days 90 --history --format json
    Analyze(AnalyzeArgs),

    /// Re-run the analysis on a fixed interval until interrupted.
    ///
    /// Upstream answers are cached for an hour across runs; pass
    /// `--refresh` to clear the cache before every run.
    Watch(WatchArgs),

    /// Print the watchlist that a run would use.
    Watchlist(WatchlistArgs),
}

/// Options shared by every command that runs the pipeline.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Number of trading days of short volume to collect (30-90).
    #[arg(long, env = "DARKFLOW_LOOKBACK_DAYS", default_value_t = DEFAULT_LOOKBACK_DAYS)]
    pub days: u32,

    /// Replace the watchlist; repeat as `--symbol SYM` or `--symbol SYM=Name`.
    #[arg(long = "symbol", value_name = "SYM[=NAME]")]
    pub symbols: Vec<String>,

    /// Classifier rule table.
    #[arg(long, value_enum, default_value_t = StrategyArg::Standard)]
    pub strategy: StrategyArg,

    /// Result ordering.
    #[arg(long, value_enum, default_value_t = SortArg::OffExchangeRatio)]
    pub sort: SortArg,

    /// Include each symbol's daily history in the output.
    #[arg(long, default_value_t = false)]
    pub history: bool,

    /// Clear cached upstream answers before running.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,

    /// Run as of this date (YYYY-MM-DD) instead of today.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<String>,

    /// Timeout for each short volume file download, in milliseconds.
    #[arg(long, env = "DARKFLOW_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Outbound request budget per upstream (0 disables pacing).
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    pub requests_per_second: u32,

    /// Skip the short-interest snapshot.
    #[arg(long, default_value_t = false)]
    pub no_short_interest: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Seconds to wait between runs.
    #[arg(long, default_value_t = 900)]
    pub interval_secs: u64,

    /// Stop after this many runs.
    #[arg(long)]
    pub max_runs: Option<u32>,
}

#[derive(Debug, Args)]
pub struct WatchlistArgs {
    /// Replace the watchlist; repeat as `--symbol SYM` or `--symbol SYM=Name`.
    #[arg(long = "symbol", value_name = "SYM[=NAME]")]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Ratio-only rules.
    Standard,
    /// Adds days-to-cover rules ahead of the ratio rules.
    ShortInterest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    OffExchangeRatio,
    DaysToCover,
    Symbol,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::OffExchangeRatio => Self::OffExchangeRatio,
            SortArg::DaysToCover => Self::DaysToCover,
            SortArg::Symbol => Self::Symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_defaults() {
        let cli = Cli::try_parse_from(["darkflow", "analyze"]).expect("parses");
        assert_eq!(cli.format, OutputFormat::Table);

        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.run.days, 60);
        assert_eq!(args.run.strategy, StrategyArg::Standard);
        assert_eq!(SortKey::from(args.run.sort), SortKey::OffExchangeRatio);
        assert!(args.run.symbols.is_empty());
    }

    #[test]
    fn repeated_symbols_and_global_flags() {
        let cli = Cli::try_parse_from([
            "darkflow",
            "analyze",
            "--symbol",
            "GME=GameStop",
            "--symbol",
            "AMC",
            "--strategy",
            "short-interest",
            "--sort",
            "days-to-cover",
            "--format",
            "json",
            "--pretty",
        ])
        .expect("parses");

        assert!(cli.pretty);
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.run.symbols, vec!["GME=GameStop", "AMC"]);
        assert_eq!(args.run.strategy, StrategyArg::ShortInterest);
        assert_eq!(args.run.sort, SortArg::DaysToCover);
    }

    #[test]
    fn watch_takes_interval() {
        let cli = Cli::try_parse_from(["darkflow", "watch", "--interval-secs", "60", "--max-runs", "2"])
            .expect("parses");
        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.interval_secs, 60);
        assert_eq!(args.max_runs, Some(2));
    }
}
