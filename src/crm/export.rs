//! CSV export of the filtered application list.
//!
//! The header row is written bare; every record field is double-quoted with
//! internal quotes doubled, so spreadsheets never split a cell on embedded
//! commas or newlines.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::model::Application;

pub const EXPORT_HEADERS: [&str; 8] = [
    "Full Name",
    "Email",
    "Phone",
    "Location",
    "Application Type",
    "Status",
    "Submission Date",
    "Additional Data",
];

/// Render `apps` in the given order. No pagination is applied here.
///
/// # Errors
///
/// Returns a [`csv::Error`] if a record cannot be written to the buffer.
pub fn applications_csv(apps: &[Application]) -> Result<Vec<u8>, csv::Error> {
    let mut out = EXPORT_HEADERS.join(",").into_bytes();
    out.push(b'\n');

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);

    for app in apps {
        let additional = serde_json::Value::Object(app.additional_data.clone()).to_string();
        let submitted = submission_date(app.created_at);
        writer.write_record([
            app.full_name.as_str(),
            app.email_address.as_str(),
            app.phone_number.as_deref().unwrap_or_default(),
            app.location.as_deref().unwrap_or_default(),
            app.application_type.label(),
            app.status.label(),
            submitted.as_str(),
            additional.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::new(e.error().kind(), e.error().to_string())))
}

/// `M/D/YYYY` in UTC, no zero padding.
#[must_use]
pub fn submission_date(ts: OffsetDateTime) -> String {
    let date = ts.to_offset(UtcOffset::UTC).date();
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

#[must_use]
pub fn export_filename(today: Date) -> String {
    format!(
        "applications_export_{:04}-{:02}-{:02}.csv",
        today.year(),
        u8::from(today.month()),
        today.day()
    )
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
