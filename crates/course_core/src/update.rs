use chrono::{DateTime, Utc};
use course_logging::{course_info, course_warn};

use crate::{AppState, Effect, GenerationStore, Msg, Notice, Route, TickOutcome};

/// Applies a message to the dashboard state and the shared store, returning
/// the effects the platform must run.
pub fn update(
    mut state: AppState,
    msg: Msg,
    store: &GenerationStore,
    now: DateTime<Utc>,
) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FormChanged { field, value } => {
            state.set_form_field(field, value);
            Vec::new()
        }
        Msg::GenerateClicked => {
            let form = state.form().trimmed();
            if !form.is_complete() {
                state.set_notice(Some(Notice::MissingFields));
                return (state, vec![Effect::ShowNotice(Notice::MissingFields)]);
            }
            let status = store.read().status;
            if status.is_in_flight() {
                course_info!("Generate ignored; a job is already {}", status);
                return (state, Vec::new());
            }
            if !store.start(&form, now) {
                return (state, Vec::new());
            }
            state.set_notice(None);
            state.set_new_course(None);
            state.set_estimator_running(true);
            vec![Effect::StartEstimator, Effect::SubmitGeneration { form }]
        }
        Msg::SubmissionSucceeded { course_id } => {
            store.mark_backend_result(course_id);
            Vec::new()
        }
        Msg::SubmissionFailed { reason } => {
            course_warn!("Generation submission failed: {}", reason);
            store.reset();
            state.set_estimator_running(false);
            state.set_notice(Some(Notice::SubmissionFailed));
            vec![
                Effect::StopEstimator,
                Effect::ShowNotice(Notice::SubmissionFailed),
            ]
        }
        Msg::EstimatorTicked(outcome) => match outcome {
            TickOutcome::Running { .. } | TickOutcome::Finalizing => Vec::new(),
            TickOutcome::Completed { course_id } => {
                state.set_estimator_running(false);
                state.set_new_course(Some(course_id));
                vec![Effect::StopEstimator, Effect::LoadCourses]
            }
            TickOutcome::Reset | TickOutcome::Stopped { .. } => {
                state.set_estimator_running(false);
                vec![Effect::StopEstimator]
            }
        },
        Msg::CreateAnotherClicked => {
            store.reset();
            state.clear_form();
            state.set_new_course(None);
            state.set_notice(None);
            if state.estimator_running() {
                state.set_estimator_running(false);
                vec![Effect::StopEstimator]
            } else {
                Vec::new()
            }
        }
        Msg::CoursesLoaded(courses) => {
            state.set_courses(courses);
            Vec::new()
        }
        Msg::CoursesLoadFailed { reason } => {
            course_warn!("Loading courses failed: {}", reason);
            state.set_notice(Some(Notice::LoadFailed));
            vec![Effect::ShowNotice(Notice::LoadFailed)]
        }
        Msg::DeleteRequested(ids) => {
            if ids.is_empty() {
                return (state, Vec::new());
            }
            state.remove_courses(&ids);
            vec![Effect::DeleteCourses { ids }]
        }
        Msg::CourseDeleted { course_id } => {
            let job = store.read();
            let mut effects = Vec::new();
            if job.result_course_id == Some(course_id) || job.backend_result == Some(course_id) {
                course_info!("Deleted course {} was the generation result", course_id);
                store.reset();
                if state.estimator_running() {
                    state.set_estimator_running(false);
                    effects.push(Effect::StopEstimator);
                }
            }
            if state.new_course() == Some(course_id) {
                state.set_new_course(None);
            }
            state.remove_courses(&[course_id]);
            effects
        }
        Msg::DeleteFailed { course_id, reason } => {
            course_warn!("Deleting course {} failed: {}", course_id, reason);
            state.set_notice(Some(Notice::DeleteFailed));
            vec![Effect::ShowNotice(Notice::DeleteFailed)]
        }
        Msg::OpenCourse(course_id) => vec![Effect::Navigate(Route::Course(course_id))],
        Msg::NoticeDismissed => {
            state.set_notice(None);
            Vec::new()
        }
    };

    (state, effects)
}
