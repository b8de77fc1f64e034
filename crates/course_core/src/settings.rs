use std::time::Duration;

use course_logging::course_warn;

pub const DEFAULT_EXPECTED_DURATION: Duration = Duration::from_secs(180);
pub const DEFAULT_ESTIMATOR_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_secs(5);

/// Timing shared by the estimator and every mounted receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Wall-clock time the progress bar takes to reach its running cap.
    pub expected_duration: Duration,
    pub estimator_interval: Duration,
    pub poll_interval: Duration,
    /// Delay before an auto-dismissing surface hides after completion.
    pub dismiss_delay: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            expected_duration: DEFAULT_EXPECTED_DURATION,
            estimator_interval: DEFAULT_ESTIMATOR_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            dismiss_delay: DEFAULT_DISMISS_DELAY,
        }
    }
}

impl GenerationSettings {
    /// Replaces zero durations that would stall timers or divide by zero.
    pub fn normalized(mut self) -> Self {
        if self.expected_duration.is_zero() {
            course_warn!(
                "expected_duration must be greater than zero; using {:?}",
                DEFAULT_EXPECTED_DURATION
            );
            self.expected_duration = DEFAULT_EXPECTED_DURATION;
        }
        if self.estimator_interval.is_zero() {
            self.estimator_interval = DEFAULT_ESTIMATOR_INTERVAL;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        self
    }
}
