use analytics::{ReportKind, ReportOutput};
use redditstats_core::{CoreError, OutputFormat, Value};
use std::fmt::Write;

pub fn render(output: &ReportOutput, format: OutputFormat) -> Result<String, CoreError> {
    match format {
        OutputFormat::Table => Ok(table(output)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(output)?),
    }
}

/// Renders several reports. JSON output is one array so it stays parseable.
pub fn render_many(outputs: &[ReportOutput], format: OutputFormat) -> Result<String, CoreError> {
    match format {
        OutputFormat::Table => Ok(outputs.iter().map(table).collect::<Vec<_>>().join("\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outputs)?),
    }
}

pub fn catalogue() -> String {
    let width = ReportKind::ALL
        .iter()
        .map(|kind| kind.name().len())
        .max()
        .unwrap_or_default();
    let mut out = String::new();
    for kind in ReportKind::ALL {
        let _ = writeln!(out, "{:<width$}  {}", kind.name(), kind.description());
    }
    out
}

fn table(output: &ReportOutput) -> String {
    let cells: Vec<Vec<String>> = output
        .rows
        .iter()
        .map(|row| row.values().map(ToString::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = output.columns.iter().map(|c| c.len()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "== {} ({} rows) ==", output.report, output.rows.len());
    if output.rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    let header: Vec<String> = output
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, width)| format!("{name:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));

    for (row, rendered) in output.rows.iter().zip(&cells) {
        let line: Vec<String> = row
            .values()
            .zip(rendered)
            .zip(&widths)
            .map(|((value, text), width)| match value {
                Value::Int(_) | Value::Float(_) => format!("{text:>width$}"),
                _ => format!("{text:<width$}"),
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    out
}
