use std::fmt::Write as _;

use darkflow_core::{RunReport, Signal, SymbolAnalysisResult};

use super::RunOutput;

/// Short text badge for a signal, used only by the table view.
pub fn badge(signal: &Signal) -> &'static str {
    match signal {
        Signal::SharpDecline { .. } => "[UNWIND]",
        Signal::InstitutionalBearish { .. } => "[BEARISH]",
        Signal::InstitutionalAccumulation { .. } => "[ACCUM]",
        Signal::ConcentratedOffExchange { .. } => "[DARK-SHORT]",
        Signal::ConcentratedOnExchange { .. } => "[LIT-SHORT]",
        Signal::SqueezeImminent { .. } => "[SQUEEZE]",
        Signal::ExtremeShortInterest { .. } => "[EXTREME-SI]",
        Signal::LowShortInterest { .. } => "[LOW-SI]",
        Signal::Neutral => "[NEUTRAL]",
    }
}

pub fn render(report: &RunReport, output: &RunOutput, include_history: bool) {
    print!("{}", format_table(report, output, include_history));
}

fn format_table(report: &RunReport, output: &RunOutput, include_history: bool) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "run_id      : {}", output.run_id);
    let _ = writeln!(text, "generated_at: {}", output.generated_at);
    let _ = writeln!(text, "as_of       : {}", output.as_of);
    let _ = writeln!(text, "strategy    : {}", output.strategy);
    let _ = writeln!(text);

    let _ = writeln!(
        text,
        "{:<7} {:<14} {:<10} {:>7} {:>7} {:>7} {:>7} {:>7} {:>6} {:<22} {}",
        "SYMBOL", "NAME", "DATE", "OFFEX%", "SHORT%", "MKT%", "AVG10", "CHG", "DTC", "QUADRANT", "SIGNAL"
    );
    for result in &report.results {
        let _ = writeln!(text, "{}", summary_line(result));
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "skipped:");
        for skipped in &report.skipped {
            let _ = writeln!(text, "  - {} ({}): {}", skipped.symbol, skipped.name, skipped.reason);
        }
    }

    if include_history {
        for result in &report.results {
            let _ = writeln!(text);
            let _ = writeln!(text, "{} history:", result.symbol);
            let _ = writeln!(
                text,
                "  {:<10} {:>14} {:>12} {:>12} {:>7} {:>7} {:>7} {:>7}",
                "DATE", "MARKET_VOL", "OFFEX_VOL", "SHORT_VOL", "OFFEX%", "SHORT%", "MKT%", "AVG10"
            );
            for row in result.history.rows() {
                let _ = writeln!(
                    text,
                    "  {:<10} {:>14} {:>12} {:>12} {:>7.2} {:>7.2} {:>7.2} {:>7.2}",
                    row.date(),
                    row.sample.total_market_volume,
                    row.sample.off_exchange_total_volume,
                    row.sample.off_exchange_short_volume,
                    row.ratios.off_exchange_ratio,
                    row.ratios.off_exchange_short_ratio.unwrap_or_default(),
                    row.ratios.market_wide_short_ratio,
                    row.ten_day_average_off_exchange_short_ratio,
                );
            }
        }
    }

    text
}

fn summary_line(result: &SymbolAnalysisResult) -> String {
    let days_to_cover = match result.short_interest {
        Some(snapshot) if snapshot.degraded => String::from("n/a"),
        Some(snapshot) => format!("{:.2}", snapshot.days_to_cover),
        None => String::from("-"),
    };
    format!(
        "{:<7} {:<14} {:<10} {:>7.2} {:>7.2} {:>7.2} {:>7.2} {:>+7.2} {:>6} {:<22} {} {}",
        result.symbol.as_str(),
        truncate(&result.name, 14),
        result.latest_date.to_string(),
        result.latest.off_exchange_ratio,
        result.latest.off_exchange_short_ratio,
        result.latest.market_wide_short_ratio,
        result.ten_day_average_off_exchange_short_ratio,
        result.change_vs_ten_day_average,
        days_to_cover,
        result.quadrant.as_str(),
        badge(&result.signal),
        result.signal.description(),
    )
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}
