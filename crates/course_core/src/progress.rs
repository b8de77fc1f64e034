//! Time-based progress estimate and the running → completed decision.
//!
//! Progress is a pure function of `(now - start_time)` against the expected
//! duration, so any number of independent callers agree on it without
//! coordination. Completion needs the backend-ready signal in addition.

use std::time::Duration;

use chrono::{DateTime, Utc};
use course_logging::{course_info, course_trace, course_warn};

use crate::{CourseId, GenerationJob, GenerationSettings, GenerationStatus, GenerationStore};

/// Highest percentage reachable without the backend result.
pub const RUNNING_CAP: u8 = 99;

/// `floor(elapsed / expected * 100)`, capped at [`RUNNING_CAP`].
pub fn progress_percent(elapsed: Duration, expected: Duration) -> u8 {
    if expected.is_zero() {
        return RUNNING_CAP;
    }
    let ratio = elapsed.as_nanos().saturating_mul(100) / expected.as_nanos();
    ratio.min(u128::from(RUNNING_CAP)) as u8
}

/// How a surface should draw the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressDisplay {
    #[default]
    Hidden,
    Percent(u8),
    /// Expected duration elapsed, backend not yet done: animated, no number.
    Indeterminate,
    Complete,
}

impl ProgressDisplay {
    /// Display for `job` at `now`, recomputed from the shared formula rather
    /// than trusting whoever last wrote the stored percentage.
    pub fn for_job(job: &GenerationJob, now: DateTime<Utc>, expected: Duration) -> Self {
        match job.status {
            GenerationStatus::Idle => ProgressDisplay::Hidden,
            GenerationStatus::Running => match job.elapsed(now) {
                // Overdue but not yet marked finalizing by any writer.
                Some(elapsed) if elapsed >= expected => ProgressDisplay::Indeterminate,
                elapsed => {
                    let computed = elapsed.map_or(0, |elapsed| progress_percent(elapsed, expected));
                    ProgressDisplay::Percent(computed.max(job.progress_percent.min(RUNNING_CAP)))
                }
            },
            GenerationStatus::Finalizing => ProgressDisplay::Indeterminate,
            GenerationStatus::Completed => ProgressDisplay::Complete,
        }
    }

    pub fn percent(self) -> Option<u8> {
        match self {
            ProgressDisplay::Percent(value) => Some(value),
            ProgressDisplay::Complete => Some(100),
            ProgressDisplay::Hidden | ProgressDisplay::Indeterminate => None,
        }
    }
}

/// Result of one estimator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { percent: u8 },
    Finalizing,
    Completed { course_id: CourseId },
    /// In-flight state was unusable and has been reset.
    Reset,
    /// Nothing in flight; the estimator should stop.
    Stopped { status: GenerationStatus },
}

impl TickOutcome {
    pub fn should_continue(self) -> bool {
        matches!(self, TickOutcome::Running { .. } | TickOutcome::Finalizing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressEstimator {
    settings: GenerationSettings,
}

impl ProgressEstimator {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings: settings.normalized(),
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Advances the stored job one step at `now`.
    pub fn tick(&self, store: &GenerationStore, now: DateTime<Utc>) -> TickOutcome {
        let job = store.read();
        if !job.status.is_in_flight() {
            if job.status == GenerationStatus::Completed {
                if let Some(course_id) = job.result_course_id {
                    return TickOutcome::Completed { course_id };
                }
            }
            return TickOutcome::Stopped { status: job.status };
        }

        let Some(elapsed) = job.elapsed(now) else {
            course_warn!("Generation is {} without a start time; resetting", job.status);
            store.reset();
            return TickOutcome::Reset;
        };

        if job.backend_result.is_some() {
            if let Some(course_id) = store.complete() {
                return TickOutcome::Completed { course_id };
            }
        }

        if job.status == GenerationStatus::Finalizing {
            return TickOutcome::Finalizing;
        }

        if elapsed >= self.settings.expected_duration {
            store.set_progress(RUNNING_CAP);
            store.set_status(GenerationStatus::Finalizing);
            course_info!(
                "Expected duration {:?} elapsed without a backend result; finalizing",
                self.settings.expected_duration
            );
            return TickOutcome::Finalizing;
        }

        // Never move backwards, even if the wall clock does.
        let percent = progress_percent(elapsed, self.settings.expected_duration)
            .max(job.progress_percent.min(RUNNING_CAP));
        if percent != job.progress_percent {
            store.set_progress(percent);
        }
        course_trace!("Generation progress {}% after {:?}", percent, elapsed);
        TickOutcome::Running { percent }
    }

    /// Terminal transition on its own, for callers racing the interval.
    /// Safe to repeat.
    pub fn complete(&self, store: &GenerationStore) -> Option<CourseId> {
        store.complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn percent_is_floor_of_ratio() {
        let expected = Duration::from_secs(180);
        assert_eq!(progress_percent(Duration::ZERO, expected), 0);
        assert_eq!(progress_percent(Duration::from_millis(1799), expected), 0);
        assert_eq!(progress_percent(Duration::from_millis(1800), expected), 1);
        assert_eq!(progress_percent(Duration::from_secs(90), expected), 50);
    }

    #[test]
    fn percent_never_reaches_hundred_on_its_own() {
        let expected = Duration::from_secs(10);
        assert_eq!(progress_percent(Duration::from_secs(10), expected), RUNNING_CAP);
        assert_eq!(progress_percent(Duration::from_secs(3600), expected), RUNNING_CAP);
        assert_eq!(progress_percent(Duration::from_secs(1), Duration::ZERO), RUNNING_CAP);
    }

    #[test]
    fn sub_millisecond_expected_duration_is_a_valid_divisor() {
        let expected = Duration::from_micros(500);
        assert_eq!(progress_percent(Duration::from_micros(250), expected), 50);
        assert_eq!(progress_percent(Duration::from_micros(499), expected), 99);
        assert_eq!(progress_percent(Duration::from_millis(1), expected), RUNNING_CAP);
    }

    #[test]
    fn overdue_running_job_displays_indeterminate() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let job = GenerationJob {
            status: GenerationStatus::Running,
            start_time: Some(start),
            progress_percent: 40,
            ..GenerationJob::default()
        };
        let expected = Duration::from_secs(10);

        assert_eq!(
            ProgressDisplay::for_job(&job, start + chrono::Duration::seconds(5), expected),
            ProgressDisplay::Percent(50)
        );
        assert_eq!(
            ProgressDisplay::for_job(&job, start + chrono::Duration::seconds(60), expected),
            ProgressDisplay::Indeterminate
        );
    }
}
