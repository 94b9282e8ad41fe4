mod table;

use darkflow_core::{RunReport, SkippedSymbol, SortKey, TradingDate};
use serde::Serialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Rendered form of one run. Only `run_id` and `generated_at` vary between
/// identical runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub generated_at: String,
    pub as_of: TradingDate,
    pub strategy: &'static str,
    pub sort: &'static str,
    pub results: Vec<Value>,
    pub skipped: Vec<SkippedSymbol>,
}

impl RunOutput {
    pub fn from_report(
        report: &RunReport,
        strategy: &'static str,
        sort: SortKey,
        include_history: bool,
    ) -> Result<Self, CliError> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| CliError::Command(format!("failed to format timestamp: {e}")))?;

        let results = report
            .results
            .iter()
            .map(|result| {
                let mut value = serde_json::to_value(result)?;
                if !include_history {
                    if let Some(object) = value.as_object_mut() {
                        object.remove("history");
                    }
                }
                Ok(value)
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            generated_at,
            as_of: report.as_of,
            strategy,
            sort: sort.as_str(),
            results,
            skipped: report.skipped.clone(),
        })
    }
}

/// Table output reads typed values from `report`; JSON formats serialize `output`.
pub fn render(
    report: &RunReport,
    output: &RunOutput,
    format: OutputFormat,
    pretty: bool,
    include_history: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(output)?
            } else {
                serde_json::to_string(output)?
            };
            println!("{payload}");
        }
        OutputFormat::Ndjson => {
            for line in ndjson_lines(output)? {
                println!("{line}");
            }
        }
        OutputFormat::Table => table::render(report, output, include_history),
    }

    Ok(())
}

/// One line per result, then one per skipped symbol, each tagged with the run.
fn ndjson_lines(output: &RunOutput) -> Result<Vec<String>, CliError> {
    let results = output.results.iter().map(|result| {
        json!({
            "type": "result",
            "run_id": output.run_id,
            "generated_at": output.generated_at,
            "data": result,
        })
    });
    let skipped = output.skipped.iter().map(|skipped| {
        json!({
            "type": "skipped",
            "run_id": output.run_id,
            "generated_at": output.generated_at,
            "data": skipped,
        })
    });

    results
        .chain(skipped)
        .map(|line| serde_json::to_string(&line).map_err(CliError::from))
        .collect()
}
