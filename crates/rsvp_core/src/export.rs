use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::RsvpResponse;

pub const EXPORT_FILENAME: &str = "wedding-rsvp-responses.csv";
pub const EXPORT_CONTENT_TYPE: &str = "text/csv";

const HEADERS: [&str; 8] = [
    "Guest Name",
    "Email",
    "Welcome Event",
    "Wedding",
    "Farewell Event",
    "Entree Choice",
    "Note",
    "Timestamp",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Offset from UTC, in minutes, used when rendering timestamps.
    pub utc_offset_minutes: i32,
}

impl ExportOptions {
    /// Falls back to UTC when the configured offset is out of range.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Renders responses as CSV, one row per response in the given order.
/// Every field is quoted; zero responses yield the header row alone.
pub fn export_csv(responses: &[RsvpResponse], options: &ExportOptions) -> String {
    let offset = options.offset();
    let mut lines = Vec::with_capacity(responses.len() + 1);
    lines.push(csv_row(HEADERS.iter().copied()));
    for response in responses {
        let timestamp = local_timestamp(response.timestamp, offset);
        lines.push(csv_row([
            response.guest_name.as_str(),
            response.guest_email.as_str(),
            response.welcome_event.as_str(),
            response.wedding.as_str(),
            response.farewell_event.as_str(),
            response.entree_choice.map(|e| e.as_str()).unwrap_or(""),
            response.note.as_deref().unwrap_or(""),
            timestamp.as_str(),
        ]));
    }
    lines.join("\n")
}

/// `8/20/2025, 6:45:00 PM` style rendering.
pub fn local_timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(",")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
