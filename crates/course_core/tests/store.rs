use std::sync::{Arc, Once};

use chrono::{TimeZone, Utc};
use course_core::{
    FormSnapshot, GenerationStatus, GenerationStore, KeyValueStore, MemoryStorage, PROGRESS_KEY,
    RESULT_KEY, START_KEY, STATUS_KEY,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(course_logging::initialize_for_tests);
}

fn physics() -> FormSnapshot {
    FormSnapshot::new("Physics", "Thermodynamics", "10")
}

#[test]
fn read_before_any_job_is_idle() {
    init_logging();
    let job = GenerationStore::in_memory().read();

    assert_eq!(job.status, GenerationStatus::Idle);
    assert_eq!(job.progress_percent, 0);
    assert!(job.start_time.is_none());
    assert!(job.result_course_id.is_none());
    assert!(!job.session_alive);
}

#[test]
fn start_records_running_job() {
    init_logging();
    let store = GenerationStore::in_memory();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    assert!(store.start(&physics(), now));
    let job = store.read();

    assert_eq!(job.status, GenerationStatus::Running);
    assert_eq!(job.progress_percent, 0);
    assert_eq!(job.start_time, Some(now));
    assert_eq!(job.form, Some(physics()));
    assert_eq!(job.topic(), Some("Thermodynamics"));
    assert!(job.session_alive);
    assert!(job.result_course_id.is_none());
}

#[test]
fn start_with_incomplete_form_writes_nothing() {
    init_logging();
    let durable = MemoryStorage::new();
    let store = GenerationStore::new(Arc::new(durable.clone()), Arc::new(MemoryStorage::new()));

    let started = store.start(&FormSnapshot::new("Physics", "  ", "10"), Utc::now());

    assert!(!started);
    assert!(durable.is_empty());
    assert_eq!(store.read().status, GenerationStatus::Idle);
}

#[test]
fn start_clears_previous_result() {
    init_logging();
    let durable = MemoryStorage::new();
    durable.set(STATUS_KEY, "completed").unwrap();
    durable.set(RESULT_KEY, "7").unwrap();
    let store = GenerationStore::new(Arc::new(durable.clone()), Arc::new(MemoryStorage::new()));
    assert_eq!(store.read().result_course_id, Some(7));

    store.start(&physics(), Utc::now());

    assert!(durable.get(RESULT_KEY).unwrap().is_none());
    assert!(store.read().result_course_id.is_none());
}

#[test]
fn reset_clears_fully() {
    init_logging();
    let store = GenerationStore::in_memory();
    store.start(&physics(), Utc::now());
    store.mark_backend_result(42);

    store.reset();
    let job = store.read();

    assert_eq!(job.status, GenerationStatus::Idle);
    assert_eq!(job.progress_percent, 0);
    assert!(job.result_course_id.is_none());
    assert!(job.backend_result.is_none());
    assert!(job.start_time.is_none());
    assert!(job.form.is_none());
    assert!(!job.session_alive);

    // Idempotent.
    store.reset();
    assert_eq!(store.read(), job);
}

#[test]
fn backend_result_does_not_change_status() {
    init_logging();
    let store = GenerationStore::in_memory();
    store.start(&physics(), Utc::now());

    store.mark_backend_result(42);
    let job = store.read();

    assert_eq!(job.status, GenerationStatus::Running);
    assert_eq!(job.backend_result, Some(42));
    assert!(job.result_course_id.is_none());
}

#[test]
fn backend_result_without_job_is_dropped() {
    init_logging();
    let store = GenerationStore::in_memory();

    store.mark_backend_result(42);

    assert!(store.read().backend_result.is_none());
}

#[test]
fn malformed_values_read_as_defaults() {
    init_logging();
    let durable = MemoryStorage::new();
    durable.set(STATUS_KEY, "exploded").unwrap();
    durable.set(START_KEY, "yesterday").unwrap();
    durable.set(PROGRESS_KEY, "lots").unwrap();
    let store = GenerationStore::new(Arc::new(durable), Arc::new(MemoryStorage::new()));

    let job = store.read();

    assert_eq!(job.status, GenerationStatus::Idle);
    assert!(job.start_time.is_none());
    assert_eq!(job.progress_percent, 0);
}

#[test]
fn other_session_sees_job_but_not_liveness() {
    init_logging();
    let store = GenerationStore::in_memory();
    store.start(&physics(), Utc::now());

    let other_tab = store.with_session(Arc::new(MemoryStorage::new()));
    let job = other_tab.read();

    assert_eq!(job.status, GenerationStatus::Running);
    assert!(!job.session_alive);
    assert!(job.is_interrupted());
}

#[test]
fn form_accepts_numeric_standard() {
    let form: FormSnapshot =
        serde_json::from_str(r#"{"subject":"Physics","topic":"Optics","standard":10}"#).unwrap();
    assert_eq!(form.standard, "10");
}
