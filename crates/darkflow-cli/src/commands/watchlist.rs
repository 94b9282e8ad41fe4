use serde_json::json;

use super::resolve_watchlist;
use crate::cli::{Cli, OutputFormat, WatchlistArgs};
use crate::error::CliError;

pub fn run(cli: &Cli, args: &WatchlistArgs) -> Result<(), CliError> {
    let watchlist = resolve_watchlist(&args.symbols)?;

    match cli.format {
        OutputFormat::Table => {
            for entry in watchlist.entries() {
                println!("{:<7} {}", entry.symbol.as_str(), entry.name);
            }
        }
        OutputFormat::Ndjson => {
            for entry in watchlist.entries() {
                println!("{}", serde_json::to_string(entry)?);
            }
        }
        OutputFormat::Json => {
            let payload = json!({ "watchlist": watchlist });
            let rendered = if cli.pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            println!("{rendered}");
        }
    }

    Ok(())
}
