use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use course_core::{
    Clock, Effect, FormSnapshot, GenerationSettings, GenerationStatus, GenerationStore,
    KeyValueStore, ManualClock, MemoryStorage, Notice, ProgressDisplay, ProgressEstimator, Route,
    StatusBroadcastReceiver, Surface,
};
use pretty_assertions::assert_eq;

const EXPECTED: Duration = Duration::from_secs(100);
const DISMISS: Duration = Duration::from_secs(5);

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(course_logging::initialize_for_tests);
}

fn settings() -> GenerationSettings {
    GenerationSettings {
        expected_duration: EXPECTED,
        dismiss_delay: DISMISS,
        ..GenerationSettings::default()
    }
}

fn setup() -> (GenerationStore, ManualClock) {
    init_logging();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    (GenerationStore::in_memory(), clock)
}

fn start(store: &GenerationStore, clock: &ManualClock) {
    store.start(
        &FormSnapshot::new("Physics", "Thermodynamics", "10"),
        clock.now(),
    );
}

fn complete(store: &GenerationStore, clock: &ManualClock, course_id: u64) {
    store.mark_backend_result(course_id);
    ProgressEstimator::new(settings()).tick(store, clock.now());
}

fn count_dismissals(effects: &[Effect]) -> usize {
    effects.iter().filter(|e| **e == Effect::Dismiss).count()
}

#[test]
fn mount_without_liveness_resets_and_reports_interruption() {
    let (store, clock) = setup();
    start(&store, &clock);
    clock.advance(Duration::from_secs(20));

    // Browser closed: the durable state survives, the session flag does not.
    let reopened = store.with_session(Arc::new(MemoryStorage::new()));
    let (receiver, effects) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &reopened, settings(), clock.now());

    assert_eq!(effects[0], Effect::ShowNotice(Notice::Interrupted));
    assert_eq!(receiver.view().status, GenerationStatus::Idle);
    assert_eq!(receiver.view().progress, ProgressDisplay::Hidden);
    assert!(!receiver.is_visible());
    assert_eq!(store.read().status, GenerationStatus::Idle);
}

#[test]
fn closing_the_session_then_remounting_is_interrupted() {
    let (store, clock) = setup();
    start(&store, &clock);
    store.end_session();

    let (_receiver, effects) =
        StatusBroadcastReceiver::mount(Surface::DashboardTab, &store, settings(), clock.now());

    assert!(effects.contains(&Effect::ShowNotice(Notice::Interrupted)));
    assert_eq!(store.read().status, GenerationStatus::Idle);
}

#[test]
fn mount_in_same_session_resumes() {
    let (store, clock) = setup();
    start(&store, &clock);
    clock.advance(EXPECTED / 4);

    let (receiver, effects) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());

    assert!(!effects.contains(&Effect::ShowNotice(Notice::Interrupted)));
    assert_eq!(receiver.view().status, GenerationStatus::Running);
    assert_eq!(receiver.view().progress, ProgressDisplay::Percent(25));
    assert_eq!(receiver.view().topic.as_deref(), Some("Thermodynamics"));
    assert!(receiver.is_visible());
}

#[test]
fn poll_redraws_only_on_change() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut receiver, _) =
        StatusBroadcastReceiver::mount(Surface::DashboardTab, &store, settings(), clock.now());

    assert!(receiver.poll(&store, clock.now()).is_empty());

    clock.advance(Duration::from_secs(10));
    let effects = receiver.poll(&store, clock.now());
    assert_eq!(effects.len(), 1);
    assert!(matches!(
        &effects[0],
        Effect::Redraw(view) if view.progress == ProgressDisplay::Percent(10)
    ));

    assert!(receiver.poll(&store, clock.now()).is_empty());
}

#[test]
fn receivers_converge_without_talking() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    clock.advance(Duration::from_secs(30));
    let (mut tab, _) =
        StatusBroadcastReceiver::mount(Surface::DashboardTab, &store, settings(), clock.now());

    clock.advance(Duration::from_secs(7));
    toast.poll(&store, clock.now());
    tab.poll(&store, clock.now());

    assert_eq!(toast.view(), tab.view());
    assert_eq!(tab.view().progress, ProgressDisplay::Percent(37));
}

#[test]
fn completion_schedules_one_dismissal() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());

    complete(&store, &clock, 42);
    let effects = toast.poll(&store, clock.now());
    assert!(matches!(
        &effects[0],
        Effect::Redraw(view) if view.status == GenerationStatus::Completed
    ));
    let deadline = toast.dismiss_deadline().expect("dismissal scheduled");

    // Polls that keep reading `completed` leave the deadline alone.
    clock.advance(Duration::from_secs(2));
    assert!(toast.poll(&store, clock.now()).is_empty());
    assert_eq!(toast.dismiss_deadline(), Some(deadline));

    let mut dismissals = 0;
    for _ in 0..10 {
        clock.advance(Duration::from_secs(1));
        dismissals += count_dismissals(&toast.poll(&store, clock.now()));
    }

    assert_eq!(dismissals, 1);
    assert!(!toast.is_visible());
    assert_eq!(toast.dismiss_deadline(), None);
}

#[test]
fn only_the_toast_auto_dismisses() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut tab, _) =
        StatusBroadcastReceiver::mount(Surface::DashboardTab, &store, settings(), clock.now());

    complete(&store, &clock, 42);
    tab.poll(&store, clock.now());
    clock.advance(DISMISS * 2);

    assert_eq!(count_dismissals(&tab.poll(&store, clock.now())), 0);
    assert!(tab.is_visible());
}

#[test]
fn mounting_on_completed_job_schedules_dismissal() {
    let (store, clock) = setup();
    start(&store, &clock);
    complete(&store, &clock, 42);

    let (toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());

    assert!(toast.dismiss_deadline().is_some());
    assert_eq!(toast.view().course_id, Some(42));
}

#[test]
fn new_run_after_dismissal_shows_again() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    complete(&store, &clock, 42);
    toast.poll(&store, clock.now());
    clock.advance(DISMISS);
    toast.poll(&store, clock.now());
    assert!(!toast.is_visible());

    store.reset();
    toast.poll(&store, clock.now());
    start(&store, &clock);
    toast.poll(&store, clock.now());

    assert!(toast.is_visible());
    assert_eq!(toast.view().status, GenerationStatus::Running);
}

#[test]
fn activation_follows_status_and_surface() {
    let (store, clock) = setup();
    let (idle, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    assert_eq!(idle.activate(), None);

    start(&store, &clock);
    let (running, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    assert_eq!(running.activate(), Some(Effect::Navigate(Route::Generate)));

    complete(&store, &clock, 42);
    let (toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    assert_eq!(toast.activate(), Some(Effect::Navigate(Route::Course(42))));

    let (same_course, _) = StatusBroadcastReceiver::mount(
        Surface::CourseDetail { course_id: 42 },
        &store,
        settings(),
        clock.now(),
    );
    assert_eq!(same_course.activate(), Some(Effect::ScrollToTop));

    let (other_course, _) = StatusBroadcastReceiver::mount(
        Surface::CourseDetail { course_id: 7 },
        &store,
        settings(),
        clock.now(),
    );
    assert_eq!(
        other_course.activate(),
        Some(Effect::Navigate(Route::Course(42)))
    );
}

#[test]
fn completed_without_course_id_reports_missing_result() {
    let (store, clock) = setup();
    start(&store, &clock);
    complete(&store, &clock, 42);
    store.durable().remove(course_core::RESULT_KEY).unwrap();

    let (toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());

    assert_eq!(
        toast.activate(),
        Some(Effect::ShowNotice(Notice::MissingResult))
    );
}

#[test]
fn unmount_drops_pending_dismissal() {
    let (store, clock) = setup();
    start(&store, &clock);
    complete(&store, &clock, 42);
    let (toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    assert!(toast.dismiss_deadline().is_some());
    let before = store.read();

    toast.unmount();
    clock.advance(DISMISS * 2);

    assert_eq!(store.read(), before);
}

#[test]
fn same_session_receiver_finalizes_an_overdue_job_without_an_estimator() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());

    clock.advance(EXPECTED * 6);
    let effects = toast.poll(&store, clock.now());

    assert!(matches!(
        &effects[0],
        Effect::Redraw(view) if view.status == GenerationStatus::Finalizing
    ));
    assert_eq!(toast.view().progress, ProgressDisplay::Indeterminate);
    assert_eq!(store.read().status, GenerationStatus::Finalizing);
}

#[test]
fn reloading_an_overdue_job_mounts_as_finalizing() {
    let (store, clock) = setup();
    let session = MemoryStorage::new();
    let store = store.with_session(Arc::new(session.clone()));
    start(&store, &clock);
    clock.advance(EXPECTED * 2);

    // Same session, new process: nothing has ticked since the start.
    let reloaded = store.with_session(Arc::new(session));
    let (tab, effects) =
        StatusBroadcastReceiver::mount(Surface::DashboardTab, &reloaded, settings(), clock.now());

    assert!(!effects.contains(&Effect::ShowNotice(Notice::Interrupted)));
    assert_eq!(tab.view().status, GenerationStatus::Finalizing);
    assert_eq!(tab.view().progress, ProgressDisplay::Indeterminate);
}

#[test]
fn receiver_completes_a_recorded_backend_result() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut tab, _) =
        StatusBroadcastReceiver::mount(Surface::DashboardTab, &store, settings(), clock.now());

    store.mark_backend_result(42);
    tab.poll(&store, clock.now());

    assert_eq!(tab.view().status, GenerationStatus::Completed);
    assert_eq!(tab.view().course_id, Some(42));
}

#[test]
fn other_session_never_advances_the_job() {
    let (store, clock) = setup();
    start(&store, &clock);
    let (mut toast, _) =
        StatusBroadcastReceiver::mount(Surface::GlobalToast, &store, settings(), clock.now());
    store.end_session();

    clock.advance(EXPECTED * 2);
    toast.poll(&store, clock.now());

    assert_eq!(store.read().status, GenerationStatus::Running);
    assert_eq!(toast.view().progress, ProgressDisplay::Indeterminate);
}
