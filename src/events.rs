//! Loading event definitions from a JSON document for the `report` command.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ClientError;

/// One event ready to be reported on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub channel: String,
    pub city: String,
    pub name: String,
    /// Unix timestamp in seconds
    pub occurred_at: i64,
    pub description: String,
    /// `general_information` entries; non-string JSON values keep their
    /// textual JSON form (`true`, `3`, ...).
    pub details: BTreeMap<String, String>,
}

/// The channel named by a document and its events, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsFile {
    pub channel_name: String,
    pub events: Vec<EventRecord>,
}

#[derive(Deserialize)]
struct Document {
    channel_name: String,
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    event_name: String,
    city: String,
    date_time: i64,
    description: String,
    #[serde(default)]
    general_information: serde_json::Map<String, Value>,
}

impl RawEvent {
    fn into_record(self, channel: &str) -> EventRecord {
        let details = self
            .general_information
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();
        EventRecord {
            channel: channel.to_string(),
            city: self.city,
            name: self.event_name,
            occurred_at: self.date_time,
            description: self.description,
            details,
        }
    }
}

/// Read and parse the event document at `path`.
pub fn load_events(path: impl AsRef<Path>) -> Result<EventsFile, ClientError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| ClientError::DocumentLoadFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_events(&text).map_err(|reason| ClientError::DocumentLoadFailure {
        path: path.display().to_string(),
        reason,
    })
}

/// Parse an event document from JSON text.
///
/// Returns the serde error message when the document is malformed or an
/// event lacks `event_name`, `city`, `date_time` or `description`.
pub fn parse_events(json: &str) -> Result<EventsFile, String> {
    let doc: Document = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let channel_name = doc.channel_name;
    let events = doc
        .events
        .into_iter()
        .map(|raw| raw.into_record(&channel_name))
        .collect();
    Ok(EventsFile {
        channel_name,
        events,
    })
}
