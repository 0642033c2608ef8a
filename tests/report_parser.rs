//! Tests for parsing and rendering event report bodies.

use emergency_stomp::report::{parse_report, render_report, report_user};
use emergency_stomp::{EventRecord, FrameError};
use std::collections::BTreeMap;

#[test]
fn parses_reference_body() {
    let body = "user:alice\ncity:Beersheba\nevent name:Fire\ndate time:1000\ndescription:\nSmoke seen\ngeneral information:\nactive:true\n";
    let report = parse_report(body).expect("parse");
    assert_eq!(report.event_name, "Fire");
    assert_eq!(report.city, "Beersheba");
    assert_eq!(report.occurred_at, 1000);
    assert_eq!(report.description, "Smoke seen");
    assert_eq!(report.details.len(), 1);
    assert_eq!(report.details.get("active").map(String::as_str), Some("true"));
}

#[test]
fn parses_details_before_description() {
    let body = "user:bob\ncity:Haifa\nevent name:Robbery\ndate time:1700000000\ngeneral information:\n        active:false\n        forces_arrival_at_scene:true\ndescription:\nTwo suspects\n  fled north  \n";
    let report = parse_report(body).expect("parse");
    assert_eq!(report.occurred_at, 1_700_000_000);
    assert_eq!(report.details.get("active").map(String::as_str), Some("false"));
    assert_eq!(
        report.details.get("forces_arrival_at_scene").map(String::as_str),
        Some("true")
    );
    assert_eq!(report.description, "Two suspects fled north");
}

#[test]
fn trims_whitespace_around_colon() {
    let report =
        parse_report("  city :  Eilat \n event name:  Flood\n date time : 42 \n").expect("parse");
    assert_eq!(report.city, "Eilat");
    assert_eq!(report.event_name, "Flood");
    assert_eq!(report.occurred_at, 42);
}

#[test]
fn non_numeric_timestamp_is_rejected() {
    let err = parse_report("city:Haifa\ndate time:yesterday\n").expect_err("must fail");
    assert_eq!(err, FrameError::InvalidTimestamp("yesterday".to_string()));
}

#[test]
fn unknown_fields_are_ignored() {
    let report = parse_report("priority:high\ncity:Acre\nweather:rain\n").expect("parse");
    assert_eq!(report.city, "Acre");
    assert!(report.details.is_empty());
    assert!(report.description.is_empty());
}

#[test]
fn user_line_is_not_stored() {
    let report = parse_report("user:carol\ncity:Acre\n").expect("parse");
    assert_eq!(report.city, "Acre");
    assert!(report.details.is_empty());
}

#[test]
fn missing_timestamp_defaults_to_zero() {
    let report = parse_report("city:Acre\nevent name:Quake\n").expect("parse");
    assert_eq!(report.occurred_at, 0);
}

#[test]
fn report_user_is_trimmed() {
    assert_eq!(report_user("user:  dana \ncity:x\n"), Some("dana".to_string()));
    assert_eq!(report_user(""), None);
}

#[test]
fn rendered_body_parses_back() {
    let mut details = BTreeMap::new();
    details.insert("active".to_string(), "true".to_string());
    details.insert("forces_arrival_at_scene".to_string(), "false".to_string());
    let event = EventRecord {
        channel: "fire_dept".to_string(),
        city: "Liberty City".to_string(),
        name: "Grand Theft Auto".to_string(),
        occurred_at: 1_687_000_000,
        description: "Stolen car seen heading south".to_string(),
        details,
    };

    let body = render_report("alice", &event);
    assert!(body.starts_with("user:alice\ncity:Liberty City\nevent name:Grand Theft Auto\n"));
    assert!(body.contains("general information:\n        active:true\n"));

    assert_eq!(report_user(&body), Some("alice".to_string()));
    let report = parse_report(&body).expect("parse");
    assert_eq!(report.event_name, event.name);
    assert_eq!(report.city, event.city);
    assert_eq!(report.occurred_at, event.occurred_at);
    assert_eq!(report.description, event.description);
    assert_eq!(report.details, event.details);
}

#[test]
fn section_named_details_are_not_rendered() {
    let mut details = BTreeMap::new();
    details.insert("active".to_string(), "true".to_string());
    details.insert("description".to_string(), "stray".to_string());
    details.insert("general information".to_string(), "stray".to_string());
    details.insert("zone".to_string(), "north".to_string());
    let event = EventRecord {
        channel: "police".to_string(),
        city: "Haifa".to_string(),
        name: "Theft".to_string(),
        occurred_at: 5,
        description: "Bike stolen".to_string(),
        details,
    };

    let body = render_report("alice", &event);
    assert!(!body.contains("stray"));

    let report = parse_report(&body).expect("parse");
    assert_eq!(report.description, "Bike stolen");
    assert_eq!(report.details.len(), 2);
    assert_eq!(report.details.get("active").map(String::as_str), Some("true"));
    assert_eq!(report.details.get("zone").map(String::as_str), Some("north"));
}
