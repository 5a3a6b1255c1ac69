//! Tests for the record set pipeline and change tracking.
//!
//! Exercises the full mutation path end to end: payload promotion, coercion,
//! validation, application order, notifications and the previous-snapshot
//! machinery.

use attrcast_core::{
    AttrType, AttrValue, EventFilter, Record, RecordError, RecordEvent, RecordOptions, RecordType,
    SetOptions, Strictness, TypeMap,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn task_types() -> TypeMap {
    TypeMap::builder()
        .attr("id", AttrType::Number)
        .attr("title", AttrType::String)
        .attr("done", AttrType::Boolean)
        .attr("due", AttrType::Date)
        .build()
        .unwrap()
}

fn task_type() -> Rc<RecordType> {
    Rc::new(RecordType::builder("task", task_types()).build().unwrap())
}

/// Attach a listener that records a short name per delivered event.
fn event_log(record: &mut Record) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&log);
    record.on(EventFilter::All, move |event| {
        seen.borrow_mut().push(match event {
            RecordEvent::AttributeChanged { attribute, .. } => attribute.clone(),
            RecordEvent::Changed => "change".to_string(),
            RecordEvent::Destroyed => "destroy".to_string(),
        });
    });
    log
}

// =========================================================================
// Application Order and Notifications
// =========================================================================

#[test]
fn test_events_follow_type_table_order() {
    let mut record = Record::new(task_type()).unwrap();
    let log = event_log(&mut record);
    record
        .set_json(
            json!({"done": "TRUE", "id": "5", "title": "t"}),
            SetOptions::parsed(),
        )
        .unwrap();
    // declaration order, not payload order
    assert_eq!(log.borrow().as_slice(), ["id", "title", "done", "change"]);
}

#[test]
fn test_unknowns_merge_after_known_attributes() {
    let mut record = Record::new(task_type()).unwrap();
    let log = event_log(&mut record);
    record
        .set_json(json!({"zeta": 1, "title": "t"}), SetOptions::default())
        .unwrap();
    assert_eq!(log.borrow().as_slice(), ["title", "zeta", "change"]);
    assert_eq!(record.get("zeta"), Some(&AttrValue::Number(1.0)));
}

#[test]
fn test_unchanged_values_fire_no_attribute_events() {
    let mut record = Record::new(task_type()).unwrap();
    record
        .set_json(json!({"title": "same"}), SetOptions::parsed())
        .unwrap();
    let log = event_log(&mut record);
    record
        .set_json(json!({"title": "same"}), SetOptions::parsed())
        .unwrap();
    assert_eq!(log.borrow().as_slice(), ["change"]);
}

#[test]
fn test_silent_set_emits_nothing() {
    let mut record = Record::new(task_type()).unwrap();
    let log = event_log(&mut record);
    record
        .set_with("title", "quiet", SetOptions::default().silenced())
        .unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(record.get("title"), Some(&AttrValue::Text("quiet".into())));
}

#[test]
fn test_per_attribute_filter_and_detach() {
    let mut record = Record::new(task_type()).unwrap();
    let count = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&count);
    let subscription = record.on(EventFilter::attribute("title"), move |_| {
        *seen.borrow_mut() += 1;
    });
    record.set("title", "a").unwrap();
    record.set("done", true).unwrap();
    assert_eq!(*count.borrow(), 1);

    assert!(record.off(subscription));
    record.set("title", "b").unwrap();
    assert_eq!(*count.borrow(), 1);
    // already detached
    assert!(!record.off(subscription));
}

// =========================================================================
// Payload Promotion
// =========================================================================

#[test]
fn test_bare_scalar_promotes_to_identity() {
    let record = Record::with_attributes(task_type(), json!(3)).unwrap();
    assert_eq!(record.id(), Some(&AttrValue::Number(3.0)));
    assert!(!record.is_new());
}

#[test]
fn test_null_payload_reads_as_empty() {
    let record = Record::with_attributes(task_type(), json!(null)).unwrap();
    assert!(record.attributes().is_empty());
    assert!(record.is_new());
}

#[test]
fn test_unpromotable_payload_is_rejected() {
    // the identity attribute is numeric, so a bare string cannot stand in
    let err = Record::with_attributes(task_type(), json!("seven")).unwrap_err();
    assert!(matches!(err, RecordError::Coerce(_)));
}

#[test]
fn test_custom_identity_attribute() {
    let types = TypeMap::builder()
        .attr("guid", AttrType::String)
        .attr("name", AttrType::String)
        .build()
        .unwrap();
    let rtype = Rc::new(
        RecordType::builder("node", types)
            .id_attribute("guid")
            .build()
            .unwrap(),
    );
    let record = Record::with_attributes(rtype, json!("abc-1")).unwrap();
    assert_eq!(record.id(), Some(&AttrValue::Text("abc-1".into())));
}

#[test]
fn test_identity_mirror_follows_the_id_attribute() {
    let mut record = Record::with_attributes(task_type(), json!({"id": 4})).unwrap();
    assert!(!record.is_new());
    record
        .set_json(json!({"id": null}), SetOptions::parsed())
        .unwrap();
    assert!(record.is_new());
    assert_eq!(record.get("id"), Some(&AttrValue::Null));
}

// =========================================================================
// Change Tracking
// =========================================================================

#[test]
fn test_snapshot_survives_across_multiple_sets() {
    let mut record = Record::with_attributes(task_type(), json!({"id": 1, "title": "a"})).unwrap();
    record.set("title", "b").unwrap();
    record.set("done", true).unwrap();

    let since_save = record.changed_since_save();
    assert_eq!(since_save.len(), 2);
    assert_eq!(
        since_save.get("title").unwrap().previous,
        Some(AttrValue::Text("a".into()))
    );
    assert_eq!(since_save.get("done").unwrap().previous, None);

    // the last-set view only covers the second call
    let since_set = record.changed_since_set();
    assert_eq!(since_set.len(), 1);
    assert!(since_set.contains_key("done"));
}

#[test]
fn test_restore_rolls_back_and_notifies() {
    let mut record = Record::with_attributes(task_type(), json!({"id": 1, "title": "a"})).unwrap();
    record
        .set_json(json!({"title": "b", "done": true}), SetOptions::parsed())
        .unwrap();
    let log = event_log(&mut record);
    record.restore();
    assert_eq!(record.get("title"), Some(&AttrValue::Text("a".into())));
    // "done" was not in the snapshot, so restore leaves it alone
    assert_eq!(record.get("done"), Some(&AttrValue::Bool(true)));
    assert_eq!(log.borrow().as_slice(), ["title", "change"]);
    assert!(!record.has_unsaved_changes());
}

#[test]
fn test_restore_without_snapshot_is_a_no_op() {
    let mut record = Record::with_attributes(task_type(), json!({"title": "a"})).unwrap();
    let log = event_log(&mut record);
    record.restore();
    assert!(log.borrow().is_empty());
    assert_eq!(record.get("title"), Some(&AttrValue::Text("a".into())));
}

#[test]
fn test_mark_synced_drops_the_snapshot() {
    let mut record = Record::with_attributes(task_type(), json!({"title": "a"})).unwrap();
    record.set("title", "b").unwrap();
    assert!(record.has_unsaved_changes());
    record.mark_synced();
    assert!(!record.has_unsaved_changes());
    // the next change starts a fresh snapshot
    record.set("title", "c").unwrap();
    assert_eq!(record.previous("title"), Some(&AttrValue::Text("b".into())));
}

// =========================================================================
// Strictness and Validation
// =========================================================================

#[test]
fn test_lenient_parse_drops_and_reports() {
    let mut record = Record::new(task_type()).unwrap();
    let report = record
        .set_json(
            json!({"id": "abc", "title": "kept", "mystery": 1}),
            SetOptions::parsed(),
        )
        .unwrap();
    assert_eq!(report.dropped_count(), 2);
    assert!(record.get("id").is_none());
    assert!(record.get("mystery").is_none());
    assert_eq!(record.get("title"), Some(&AttrValue::Text("kept".into())));
}

#[test]
fn test_strict_aborts_atomically() {
    let rtype = Rc::new(
        RecordType::builder("task", task_types())
            .strict()
            .build()
            .unwrap(),
    );
    let mut record = Record::with_attributes(rtype, json!({"title": "a"})).unwrap();
    let err = record
        .set_json(
            json!({"title": "b", "due": "not a date"}),
            SetOptions::parsed(),
        )
        .unwrap_err();
    assert!(matches!(err, RecordError::Coerce(_)));
    // nothing applied, not even the convertible part
    assert_eq!(record.get("title"), Some(&AttrValue::Text("a".into())));
}

#[test]
fn test_instance_strictness_overrides_the_type() {
    let mut record = Record::with_options(
        task_type(),
        None,
        RecordOptions {
            strictness: Some(Strictness::Strict),
            ..RecordOptions::default()
        },
    )
    .unwrap();
    let err = record
        .set_json(json!({"mystery": 1}), SetOptions::parsed())
        .unwrap_err();
    assert!(matches!(err, RecordError::Coerce(_)));
}

#[test]
fn test_validator_sees_the_candidate_state() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let observed = Rc::clone(&seen);
    let rtype = Rc::new(
        RecordType::builder("task", task_types())
            .validator(move |attrs| {
                observed.borrow_mut().push(
                    attrs
                        .get("title")
                        .and_then(|value| value.as_str().map(str::to_string)),
                );
                Ok(())
            })
            .build()
            .unwrap(),
    );
    let mut record = Record::new(rtype).unwrap();
    record.set("title", "first").unwrap();
    record.set("done", true).unwrap();
    assert_eq!(
        seen.borrow().as_slice(),
        [Some("first".to_string()), Some("first".to_string())]
    );
}

// =========================================================================
// Serialization
// =========================================================================

#[test]
fn test_to_json_reproduces_the_parsed_object() {
    let mut record = Record::new(task_type()).unwrap();
    record
        .set_json(
            json!({"id": "7", "title": "t", "done": "TRUE", "due": "2024-03-01"}),
            SetOptions::parsed(),
        )
        .unwrap();
    assert_eq!(
        record.to_json(),
        json!({
            "id": 7,
            "title": "t",
            "done": true,
            "due": "2024-03-01T00:00:00.000Z"
        })
    );
}

#[test]
fn test_duplicate_is_independent() {
    let record = Record::with_attributes(task_type(), json!({"id": 1, "title": "a"})).unwrap();
    let mut copy = record.duplicate().unwrap();
    copy.set("title", "copied").unwrap();
    assert_eq!(record.get("title"), Some(&AttrValue::Text("a".into())));
    assert_eq!(copy.get("title"), Some(&AttrValue::Text("copied".into())));
    assert!(!record.has_unsaved_changes());
    assert!(copy.has_unsaved_changes());
}

// =========================================================================
// Attribute Access
// =========================================================================

#[test]
fn test_has_requires_a_non_null_value() {
    let mut record =
        Record::with_attributes(task_type(), json!({"title": "x", "due": null})).unwrap();
    assert!(record.has("title"));
    assert!(!record.has("due")); // present but null
    assert!(!record.has("done")); // absent
    record.unset("title").unwrap();
    assert!(!record.has("title"));
    assert!(record.get("title").is_none());
}
