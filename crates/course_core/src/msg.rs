use crate::{CourseId, CourseSummary, FormField, TickOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited one of the form inputs.
    FormChanged { field: FormField, value: String },
    /// User asked for a course to be generated from the current form.
    GenerateClicked,
    /// Submission call resolved with a course id.
    SubmissionSucceeded { course_id: CourseId },
    /// Submission call rejected or reported `success: false`.
    SubmissionFailed { reason: String },
    /// The estimator driver advanced the job.
    EstimatorTicked(TickOutcome),
    /// User chose "create another".
    CreateAnotherClicked,
    CoursesLoaded(Vec<CourseSummary>),
    CoursesLoadFailed { reason: String },
    /// User deleted one or more courses.
    DeleteRequested(Vec<CourseId>),
    /// Backend confirmed a deletion.
    CourseDeleted { course_id: CourseId },
    DeleteFailed { course_id: CourseId, reason: String },
    /// User picked a course from the list.
    OpenCourse(CourseId),
    NoticeDismissed,
}
