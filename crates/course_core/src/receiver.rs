//! Per-surface view of the shared generation job.
//!
//! Every mounted surface owns one receiver. Receivers never talk to each
//! other; they converge because they read the same store and derive progress
//! from the same formula. Their one-shot effects (dismissal, interruption
//! notice) are idempotent, so several receivers firing them is harmless.
//!
//! A receiver in the job's own session also drives transitions nobody else is
//! left to drive: an overdue job is moved to finalizing and a recorded backend
//! result is completed, through the same idempotent estimator step.

use chrono::{DateTime, Utc};
use course_logging::{course_debug, course_info, course_warn};

use crate::{
    CourseId, Effect, GenerationJob, GenerationSettings, GenerationStatus, GenerationStore, Notice,
    ProgressEstimator, ReceiverView, Route,
};

/// Which surface a receiver is mounted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Floating toast present on every page; hides itself after completion.
    GlobalToast,
    DashboardTab,
    /// Detail page of one course.
    CourseDetail { course_id: CourseId },
}

impl Surface {
    pub fn auto_dismisses(self) -> bool {
        matches!(self, Surface::GlobalToast)
    }
}

#[derive(Debug)]
pub struct StatusBroadcastReceiver {
    surface: Surface,
    settings: GenerationSettings,
    view: ReceiverView,
    dismissed: bool,
    dismiss_at: Option<DateTime<Utc>>,
}

impl StatusBroadcastReceiver {
    /// Reads the store once. A job in flight without this session's liveness
    /// flag is reset and reported instead of resumed.
    pub fn mount(
        surface: Surface,
        store: &GenerationStore,
        settings: GenerationSettings,
        now: DateTime<Utc>,
    ) -> (Self, Vec<Effect>) {
        let settings = settings.normalized();
        let mut effects = Vec::new();

        let mut job = store.read();
        if job.is_interrupted() {
            course_warn!(
                "{:?} found generation {} without a live session; resetting",
                surface,
                job.status
            );
            store.reset();
            effects.push(Effect::ShowNotice(Notice::Interrupted));
            job = store.read();
        } else {
            job = catch_up(job, store, &settings, now);
        }

        let view = ReceiverView::from_job(&job, now, &settings);
        let mut receiver = Self {
            surface,
            settings,
            view: ReceiverView::default(),
            dismissed: false,
            dismiss_at: None,
        };
        receiver.apply(view, now);
        effects.push(Effect::Redraw(receiver.view.clone()));
        course_debug!("{:?} mounted with status {}", surface, receiver.view.status);
        (receiver, effects)
    }

    /// One polling step: picks up store changes and fires due timers.
    pub fn poll(&mut self, store: &GenerationStore, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = Vec::new();

        let job = catch_up(store.read(), store, &self.settings, now);
        let next = ReceiverView::from_job(&job, now, &self.settings);
        if next != self.view {
            self.apply(next, now);
            effects.push(Effect::Redraw(self.view.clone()));
        }

        if self.dismiss_at.is_some_and(|at| now >= at) {
            self.dismiss_at = None;
            self.dismissed = true;
            course_info!("{:?} dismissed after completion", self.surface);
            effects.push(Effect::Dismiss);
        }

        effects
    }

    /// What activating (clicking) the indicator does right now.
    pub fn activate(&self) -> Option<Effect> {
        match self.view.status {
            GenerationStatus::Idle => None,
            GenerationStatus::Running | GenerationStatus::Finalizing => {
                Some(Effect::Navigate(Route::Generate))
            }
            GenerationStatus::Completed => Some(match self.view.course_id {
                None => Effect::ShowNotice(Notice::MissingResult),
                Some(id) if self.surface == (Surface::CourseDetail { course_id: id }) => {
                    Effect::ScrollToTop
                }
                Some(id) => Effect::Navigate(Route::Course(id)),
            }),
        }
    }

    /// Drops the receiver together with any pending dismissal.
    pub fn unmount(self) {
        course_debug!("{:?} unmounted", self.surface);
    }

    pub fn view(&self) -> &ReceiverView {
        &self.view
    }

    pub fn is_visible(&self) -> bool {
        self.view.status != GenerationStatus::Idle && !self.dismissed
    }

    pub fn dismiss_deadline(&self) -> Option<DateTime<Utc>> {
        self.dismiss_at
    }

    fn apply(&mut self, next: ReceiverView, now: DateTime<Utc>) {
        let was = self.view.status;
        let is = next.status;

        if is.is_in_flight() && !was.is_in_flight() {
            self.dismissed = false;
        }
        if is != GenerationStatus::Completed {
            self.dismiss_at = None;
        } else if was != GenerationStatus::Completed && self.surface.auto_dismisses() {
            self.dismiss_at = chrono::Duration::from_std(self.settings.dismiss_delay)
                .ok()
                .and_then(|delay| now.checked_add_signed(delay));
        }

        self.view = next;
    }
}

/// Runs one estimator step for a live job that is overdue or has its backend
/// result, so the job advances even when no estimator is running.
fn catch_up(
    job: GenerationJob,
    store: &GenerationStore,
    settings: &GenerationSettings,
    now: DateTime<Utc>,
) -> GenerationJob {
    if !job.status.is_in_flight() || !job.session_alive {
        return job;
    }
    let overdue = job.status == GenerationStatus::Running
        && job
            .elapsed(now)
            .is_some_and(|elapsed| elapsed >= settings.expected_duration);
    if !overdue && job.backend_result.is_none() {
        return job;
    }
    let outcome = ProgressEstimator::new(*settings).tick(store, now);
    course_debug!("Receiver advanced the job: {:?}", outcome);
    store.read()
}
