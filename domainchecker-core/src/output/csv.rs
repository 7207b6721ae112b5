//! CSV export of check outcomes.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::checker::CheckOutcome;
use crate::error::Result;

pub const CSV_HEADERS: [&str; 11] = [
    "Domain",
    "Success",
    "Status",
    "Registrar",
    "Creation Date",
    "Expiration Date",
    "Days Until Expiration",
    "Name Servers",
    "Error Message",
    "Check Duration",
    "Cached",
];

/// Render outcomes as CSV with a header row. Absent values are empty
/// fields; dates are ISO-8601 in UTC.
pub fn render_csv(results: &[CheckOutcome]) -> String {
    let mut csv = CSV_HEADERS.join(",");
    csv.push('\n');

    for result in results {
        let row = outcome_row(result)
            .iter()
            .map(|field| escape_csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&row);
        csv.push('\n');
    }

    csv
}

pub fn write_csv(path: impl AsRef<Path>, results: &[CheckOutcome]) -> Result<()> {
    std::fs::write(path, render_csv(results))?;
    Ok(())
}

fn outcome_row(result: &CheckOutcome) -> [String; 11] {
    let whois = result.snapshot.as_ref().and_then(|s| s.whois.as_ref());

    [
        result.domain.clone(),
        python_bool(result.success),
        result.status().to_string(),
        whois
            .and_then(|w| w.registrar.clone())
            .unwrap_or_default(),
        iso_date(whois.and_then(|w| w.creation_date)),
        iso_date(whois.and_then(|w| w.expiration_date)),
        result
            .days_until_expiration()
            .map(|d| d.to_string())
            .unwrap_or_default(),
        whois.map(|w| w.name_servers.join("; ")).unwrap_or_default(),
        result.error.clone().unwrap_or_default(),
        format!("{:.2}s", result.duration.as_secs_f64()),
        python_bool(result.cached),
    ]
}

fn python_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

fn iso_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn escape_csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
