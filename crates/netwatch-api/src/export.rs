//! CSV rendering of the full transition log.
//!
//! One row per record, oldest first, with the columns
//! `IP,Name,Group,Status,Time`. Fields are quoted per RFC 4180 when they
//! contain a comma, a quote, or a line break.

use netwatch_core::format_time;
use netwatch_state::TransitionRecord;

/// Header row of the export.
pub const CSV_HEADER: &str = "IP,Name,Group,Status,Time";

/// Render transition records as CSV text.
pub fn render_csv(records: &[TransitionRecord]) -> String {
    let mut out = String::with_capacity(32 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");
    for r in records {
        out.push_str(&format!(
            "{},{},{},{},{}\r\n",
            csv_field(&r.address),
            csv_field(&r.name),
            csv_field(&r.group),
            r.status.as_str().to_uppercase(),
            format_time(&r.at)
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
