use std::sync::{mpsc, Arc};
use std::time::Duration;

use course_core::{Clock, Effect, GenerationStore, Msg, ProgressEstimator};
use course_engine::{spawn_estimator, ChannelEstimatorSink, EngineEvent, EngineHandle, TimerHandle};
use course_logging::{course_debug, course_info, course_warn};

/// Runs the engine-side effects produced by `update` and hands the rest back
/// to the caller for display.
pub struct EffectRunner {
    engine: EngineHandle,
    store: GenerationStore,
    estimator: ProgressEstimator,
    clock: Arc<dyn Clock>,
    msg_tx: mpsc::Sender<Msg>,
    estimator_timer: Option<TimerHandle>,
    pending: usize,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        store: GenerationStore,
        estimator: ProgressEstimator,
        clock: Arc<dyn Clock>,
        msg_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            engine,
            store,
            estimator,
            clock,
            msg_tx,
            estimator_timer: None,
            pending: 0,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Requests sent to the backend whose results have not come back yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn enqueue(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut display = Vec::new();
        for effect in effects {
            match effect {
                Effect::SubmitGeneration { form } => {
                    course_info!("Submitting generation topic={:?}", form.topic);
                    self.pending += 1;
                    self.engine.submit(form);
                }
                Effect::StartEstimator => {
                    let sink = Arc::new(ChannelEstimatorSink::new(
                        self.msg_tx.clone(),
                        Msg::EstimatorTicked,
                    ));
                    // Replacing a live timer drops and so cancels it.
                    self.estimator_timer = Some(spawn_estimator(
                        &self.engine.runtime(),
                        self.store.clone(),
                        self.estimator,
                        self.clock.clone(),
                        sink,
                    ));
                }
                Effect::StopEstimator => {
                    if self.estimator_timer.take().is_some() {
                        course_debug!("Estimator stopped");
                    }
                }
                Effect::LoadCourses => {
                    self.pending += 1;
                    self.engine.load_courses();
                }
                Effect::DeleteCourses { ids } => {
                    self.pending += ids.len();
                    self.engine.delete(ids);
                }
                other => display.push(other),
            }
        }
        display
    }

    /// Next engine result as a message, waiting at most `timeout`.
    pub fn next_event(&mut self, timeout: Duration) -> Option<Msg> {
        let event = if timeout.is_zero() {
            self.engine.try_recv()
        } else {
            self.engine.recv_timeout(timeout)
        }?;
        self.pending = self.pending.saturating_sub(1);
        Some(event_to_msg(event))
    }
}

pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::GenerationFinished { result } => match result {
            Ok(course_id) => Msg::SubmissionSucceeded { course_id },
            Err(err) => Msg::SubmissionFailed {
                reason: err.to_string(),
            },
        },
        EngineEvent::CoursesLoaded { result } => match result {
            Ok(courses) => Msg::CoursesLoaded(courses),
            Err(err) => Msg::CoursesLoadFailed {
                reason: err.to_string(),
            },
        },
        EngineEvent::CourseDeleted { course_id, result } => match result {
            Ok(()) => Msg::CourseDeleted { course_id },
            Err(err) => {
                course_warn!("Course {} was not deleted: {}", course_id, err);
                Msg::DeleteFailed {
                    course_id,
                    reason: err.to_string(),
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_engine::{ApiError, FailureKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn failed_submission_becomes_failure_message() {
        let msg = event_to_msg(EngineEvent::GenerationFinished {
            result: Err(api_error(FailureKind::Rejected, "quota exceeded")),
        });
        assert_eq!(
            msg,
            Msg::SubmissionFailed {
                reason: "rejected: quota exceeded".to_string()
            }
        );
    }

    #[test]
    fn delete_results_keep_their_course_id() {
        assert_eq!(
            event_to_msg(EngineEvent::CourseDeleted {
                course_id: 4,
                result: Ok(()),
            }),
            Msg::CourseDeleted { course_id: 4 }
        );
        assert!(matches!(
            event_to_msg(EngineEvent::CourseDeleted {
                course_id: 4,
                result: Err(api_error(FailureKind::NotFound, "gone")),
            }),
            Msg::DeleteFailed { course_id: 4, .. }
        ));
    }

    fn api_error(kind: FailureKind, message: &str) -> ApiError {
        ApiError {
            kind,
            message: message.to_string(),
        }
    }
}
