#![allow(clippy::unwrap_used, clippy::expect_used)]

use aggrel_core::logging_facility::test_capture::{
    init_test_capture, BoundaryCounts, CapturedEvent,
};
use aggrel_core::{
    AggregateDescriptor, ElementDescriptor, FieldDescriptor, PrimitiveType, Record,
    SchemaCompiler, Value,
};
use aggrel_core_types::schema::{EVENT_END_ERROR, EVENT_START};
use aggrel_store::{DynamicRepository, SqliteConnection, TransactionalRepository};
use std::sync::Arc;
use uuid::Uuid;

/// Repository for an aggregate whose name no other test uses
fn tracked_repo(type_name: &str) -> DynamicRepository<SqliteConnection> {
    let descriptor = AggregateDescriptor::new(type_name)
        .field(FieldDescriptor::primitive("id", PrimitiveType::Uuid))
        .field(FieldDescriptor::primitive("label", PrimitiveType::Text))
        .field(FieldDescriptor::list(
            "points",
            ElementDescriptor::primitive(PrimitiveType::Int),
        ));
    let schema = SchemaCompiler::compile(&descriptor).unwrap();
    let repo = TransactionalRepository::new(
        Arc::new(schema),
        SqliteConnection::open_in_memory().unwrap(),
    );
    repo.create_tables().unwrap();
    repo
}

#[test]
fn test_successful_operations_log_one_start_and_one_end() {
    // GIVEN a capturing subscriber and a tracked repository
    let capture = init_test_capture();
    let repo = tracked_repo("LogTrackOk");
    let id = Uuid::new_v4();
    let record = Record::new()
        .with("id", id)
        .with("label", "tracked")
        .with("points", vec![1i64, 2, 3]);

    // WHEN saving, loading and deleting
    repo.save_record(&record).unwrap();
    let loaded = repo.load_record(id).unwrap();
    repo.delete(id).unwrap();

    // THEN each operation has exactly one start and one end event
    assert_eq!(loaded.get("points"), &Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    let once = BoundaryCounts {
        starts: 1,
        ends: 1,
        errors: 0,
    };
    for op in ["save", "get_by_id", "delete_by_id"] {
        assert_eq!(capture.boundary_counts(op, "LogTrackOk"), once, "{}", op);
    }
}

#[test]
fn test_failed_operation_logs_end_error_with_code() {
    // GIVEN a capturing subscriber and an empty tracked repository
    let capture = init_test_capture();
    let repo = tracked_repo("LogTrackMissing");
    let id = Uuid::new_v4();

    // WHEN loading an unknown id
    let err = repo.load_record(id).unwrap_err();

    // THEN one start and one end_error event carry the taxonomy code
    assert!(err.is_not_found());
    let counts = capture.boundary_counts("get_by_id", "LogTrackMissing");
    assert_eq!((counts.starts, counts.ends, counts.errors), (1, 0, 1));
    let errors: Vec<CapturedEvent> = capture
        .events_for_op("get_by_id")
        .into_iter()
        .filter(|e| {
            e.event.as_deref() == Some(EVENT_END_ERROR)
                && e.field("aggregate") == Some("LogTrackMissing")
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("err_code"), Some("ERR_NOT_FOUND"));
    assert_eq!(errors[0].field("err_kind"), Some("NotFound"));
}

#[test]
fn test_start_event_carries_aggregate_id() {
    let capture = init_test_capture();
    let repo = tracked_repo("LogTrackId");
    let id = Uuid::new_v4();

    let _ = repo.exists_by_id(id).unwrap();

    let starts: Vec<CapturedEvent> = capture
        .events_for_op("exists_by_id")
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START) && e.field("aggregate") == Some("LogTrackId"))
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].field("aggregate_id"), Some(id.to_string().as_str()));
}

#[test]
fn test_count_child_rows_logs_its_own_boundary() {
    // GIVEN a capturing subscriber and a saved aggregate
    let capture = init_test_capture();
    let repo = tracked_repo("LogTrackCount");
    let id = Uuid::new_v4();
    repo.save_record(&Record::new().with("id", id).with("label", "x").with("points", vec![7i64]))
        .unwrap();

    // WHEN counting its child rows
    let counts = repo.count_child_rows(id).unwrap();

    // THEN the count has its own start/end pair and no load is logged
    assert_eq!(counts, vec![("log_track_count_points".to_string(), 1)]);
    let once = BoundaryCounts {
        starts: 1,
        ends: 1,
        errors: 0,
    };
    assert_eq!(capture.boundary_counts("count_child_rows", "LogTrackCount"), once);
    assert_eq!(
        capture.boundary_counts("get_by_id", "LogTrackCount"),
        BoundaryCounts::default()
    );
}
