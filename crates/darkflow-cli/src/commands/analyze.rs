use darkflow_core::TradingDate;

use super::{as_of_from, build_pipeline, cache_mode};
use crate::cli::{AnalyzeArgs, Cli};
use crate::error::CliError;
use crate::output::{self, RunOutput};

pub async fn run(cli: &Cli, args: &AnalyzeArgs) -> Result<(), CliError> {
    let pipeline = build_pipeline(&args.run)?;
    let as_of = as_of_from(&args.run)?.unwrap_or_else(TradingDate::today_utc);

    let report = pipeline.run_as_of(as_of, cache_mode(&args.run)).await?;
    let output = RunOutput::from_report(
        &report,
        pipeline.strategy_name(),
        pipeline.sort_key(),
        args.run.history,
    )?;
    output::render(&report, &output, cli.format, cli.pretty, args.run.history)
}
