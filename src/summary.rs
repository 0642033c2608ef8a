use chrono::{DateTime, Local};
use std::fmt::Write as _;

use crate::report::EventReport;

/// Descriptions longer than this are truncated in a summary.
pub const DESCRIPTION_LIMIT: usize = 30;

/// Aggregated view of the reports one user sent on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub channel: String,
    pub user: String,
    pub total: usize,
    /// Reports whose `active` detail is `"true"`
    pub active: usize,
    /// Reports whose `forces_arrival_at_scene` detail is `"true"`
    pub forces_arrival: usize,
    /// Reports in ascending `occurred_at` order; ties keep arrival order
    pub reports: Vec<EventReport>,
}

fn detail_is_true(report: &EventReport, key: &str) -> bool {
    report.details.get(key).is_some_and(|v| v == "true")
}

impl Summary {
    /// Build a summary. `channel` is the channel name without its leading `/`.
    pub fn new(
        channel: impl Into<String>,
        user: impl Into<String>,
        mut reports: Vec<EventReport>,
    ) -> Self {
        let active = reports
            .iter()
            .filter(|r| detail_is_true(r, "active"))
            .count();
        let forces_arrival = reports
            .iter()
            .filter(|r| detail_is_true(r, "forces_arrival_at_scene"))
            .count();
        reports.sort_by_key(|r| r.occurred_at);
        Self {
            channel: channel.into(),
            user: user.into(),
            total: reports.len(),
            active,
            forces_arrival,
            reports,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Render the human-readable summary written by the `summary` command.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Channel {}", self.channel);
        let _ = writeln!(out, "Stats:");
        let _ = writeln!(out, "Total: {}", self.total);
        let _ = writeln!(out, "active: {}", self.active);
        let _ = writeln!(out, "forces arrival at scene: {}", self.forces_arrival);
        let _ = writeln!(out);
        let _ = writeln!(out, "Event Reports:");
        let _ = writeln!(out);

        for (i, report) in self.reports.iter().enumerate() {
            let _ = writeln!(out, "Report_{}:", i + 1);
            let _ = writeln!(out, "city: {}", report.city);
            let _ = writeln!(out, "date time: {}", format_timestamp(report.occurred_at));
            let _ = writeln!(out, "event name: {}", report.event_name);
            let _ = writeln!(out, "summary: {}", truncate_description(&report.description));
            let _ = writeln!(out);
        }
        out
    }
}

/// Format Unix seconds as `dd/mm/YYYY HH:MM:SS` in local time. Timestamps
/// outside chrono's range are printed as the raw number.
pub fn format_timestamp(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string(),
        None => secs.to_string(),
    }
}

/// Keep descriptions of up to 30 characters; longer ones become their first
/// 27 characters followed by `...`.
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_LIMIT {
        return description.to_string();
    }
    let mut short: String = description.chars().take(DESCRIPTION_LIMIT - 3).collect();
    short.push_str("...");
    short
}
