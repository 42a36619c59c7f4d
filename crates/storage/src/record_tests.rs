// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kv_core::Mutation;

#[test]
fn record_fields_are_in_order() {
    let record = Record::new(&Mutation::put("a", "1").sequenced(1));
    let line = record.to_line().unwrap();

    let prefix = r#"{"sequence":1,"type":2,"key":"a","value":"1","checksum":"#;
    assert!(line.starts_with(prefix), "unexpected line: {}", line);
    assert!(!line.contains('\n'));
}

#[test]
fn delete_record_has_empty_value() {
    let record = Record::new(&Mutation::delete("a").sequenced(4));
    let parsed = Record::from_line(&record.to_line().unwrap()).unwrap();

    assert_eq!(parsed.kind, EventKind::Delete);
    assert_eq!(parsed.value, "");
    assert!(parsed.verify());
}

#[test]
fn value_with_newlines_and_tabs_survives() {
    let event = Mutation::put("multi", "line one\nline\ttwo").sequenced(2);
    let line = Record::new(&event).to_line().unwrap();
    assert!(!line.contains('\n'));

    let parsed = Record::from_line(&line).unwrap();
    assert!(parsed.verify());
    assert_eq!(parsed.into_event(), event);
}

#[test]
fn tampered_value_fails_verification() {
    let mut record = Record::new(&Mutation::put("a", "1").sequenced(1));
    record.value = "2".to_string();
    assert!(!record.verify());
}

#[test]
fn shifted_key_value_boundary_fails_verification() {
    let mut record = Record::new(&Mutation::put("ab", "c").sequenced(1));
    record.key = "a".to_string();
    record.value = "bc".to_string();
    assert!(!record.verify());
}

#[test]
fn unknown_type_is_a_parse_error() {
    let line = r#"{"sequence":1,"type":9,"key":"a","value":"","checksum":0}"#;
    assert!(matches!(Record::from_line(line), Err(LogError::Json(_))));
}

#[test]
fn truncated_line_is_a_parse_error() {
    let line = r#"{"sequence":1,"type":2,"ke"#;
    assert!(Record::from_line(line).is_err());
}
