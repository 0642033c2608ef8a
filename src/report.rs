//! Event report bodies.
//!
//! A report travels as the body of a SEND (outbound) or MESSAGE (inbound)
//! frame:
//!
//! ```text
//! user:alice
//! city:Beersheba
//! event name:Fire
//! date time:1000
//! general information:
//!         active:true
//! description:
//! Smoke seen
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::warn;

use crate::error::FrameError;
use crate::events::EventRecord;

/// A parsed event report as stored per (topic, user).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventReport {
    pub event_name: String,
    pub city: String,
    /// Unix timestamp in seconds
    pub occurred_at: i64,
    pub description: String,
    /// Free-form attributes such as `active` or `forces_arrival_at_scene`
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fields,
    Description,
    Details,
}

/// Parse a report body into an [`EventReport`].
///
/// Fails with [`FrameError::InvalidTimestamp`] when `date time` is not an
/// integer; no partial report is returned. Unknown fields are ignored and a
/// missing `date time` leaves `occurred_at` at zero.
pub fn parse_report(body: &str) -> Result<EventReport, FrameError> {
    let mut report = EventReport::default();
    let mut section = Section::Fields;
    let mut description: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let split = line.split_once(':').map(|(k, v)| (k.trim(), v.trim()));

        if section == Section::Description {
            match split {
                Some(("general information", _)) => section = Section::Details,
                _ => description.push(line),
            }
            continue;
        }

        let Some((field, value)) = split else {
            continue;
        };
        match (section, field) {
            (_, "description") => {
                section = Section::Description;
                if !value.is_empty() {
                    description.push(value);
                }
            }
            (_, "general information") => section = Section::Details,
            (Section::Details, key) => {
                report.details.insert(key.to_string(), value.to_string());
            }
            (_, "user") => {}
            (_, "city") => report.city = value.to_string(),
            (_, "event name") => report.event_name = value.to_string(),
            (_, "date time") => {
                report.occurred_at = value
                    .parse()
                    .map_err(|_| FrameError::InvalidTimestamp(value.to_string()))?;
            }
            _ => {}
        }
    }

    report.description = description.join(" ");
    Ok(report)
}

/// The reporting user named on the first `user:` line of a body, trimmed.
pub fn report_user(body: &str) -> Option<String> {
    body.lines()
        .filter_map(|line| line.trim().split_once(':'))
        .find(|(field, _)| field.trim() == "user")
        .map(|(_, user)| user.trim().to_string())
}

/// Field names that open a section; a detail with one of these keys would be
/// read back as a section header.
const SECTION_KEYS: [&str; 2] = ["description", "general information"];

/// Render the SEND body for `event`, reported by `user`.
///
/// Details keyed `description` or `general information` are left out.
pub fn render_report(user: &str, event: &EventRecord) -> String {
    let mut body = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(body, "user:{}", user);
    let _ = writeln!(body, "city:{}", event.city);
    let _ = writeln!(body, "event name:{}", event.name);
    let _ = writeln!(body, "date time:{}", event.occurred_at);
    let _ = writeln!(body, "general information:");
    for (key, value) in &event.details {
        if SECTION_KEYS.contains(&key.trim()) {
            warn!(event = %event.name, key = %key, "skipping detail named like a section");
            continue;
        }
        let _ = writeln!(body, "        {}:{}", key, value);
    }
    let _ = writeln!(body, "description:");
    let _ = writeln!(body, "{}", event.description);
    body
}
