use std::time::Duration;

use darkflow_core::{PipelineError, TradingDate};

use super::{as_of_from, build_pipeline, cache_mode};
use crate::cli::{Cli, WatchArgs};
use crate::error::CliError;
use crate::output::{self, RunOutput};

/// Runs until interrupted or `--max-runs` is reached. One cache outlives all
/// runs, so unchanged upstream answers are served from it within the TTL.
pub async fn run(cli: &Cli, args: &WatchArgs) -> Result<(), CliError> {
    if args.interval_secs == 0 {
        return Err(CliError::Command(String::from("--interval-secs must be positive")));
    }

    let pipeline = build_pipeline(&args.run)?;
    let pinned_as_of = as_of_from(&args.run)?;
    let interval = Duration::from_secs(args.interval_secs);
    let mut completed = 0_u32;

    loop {
        let as_of = pinned_as_of.unwrap_or_else(TradingDate::today_utc);
        pipeline.cache().clear_expired().await;

        match pipeline.run_as_of(as_of, cache_mode(&args.run)).await {
            Ok(report) => {
                let output = RunOutput::from_report(
                    &report,
                    pipeline.strategy_name(),
                    pipeline.sort_key(),
                    args.run.history,
                )?;
                output::render(&report, &output, cli.format, cli.pretty, args.run.history)?;
            }
            // An empty run is a transient state while watching; try again next tick.
            Err(PipelineError::EmptyRunResult { attempted, .. }) => {
                tracing::warn!(attempted, "no symbol produced a result");
            }
            Err(error) => return Err(error.into()),
        }

        completed += 1;
        if args.max_runs.is_some_and(|max| completed >= max) {
            return Ok(());
        }

        tracing::info!(next_in_secs = args.interval_secs, "waiting for next run");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                return Ok(());
            }
        }
    }
}
