use chrono::{DateTime, Utc};

use crate::{
    CourseId, CourseSummary, FormSnapshot, GenerationJob, GenerationSettings, GenerationStatus,
    Notice, ProgressDisplay,
};

/// What a receiver surface shows for the generation job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiverView {
    pub status: GenerationStatus,
    pub progress: ProgressDisplay,
    pub course_id: Option<CourseId>,
    pub topic: Option<String>,
}

impl ReceiverView {
    pub fn from_job(job: &GenerationJob, now: DateTime<Utc>, settings: &GenerationSettings) -> Self {
        Self {
            status: job.status,
            progress: ProgressDisplay::for_job(job, now, settings.expected_duration),
            course_id: job.result_course_id,
            topic: job.topic().map(ToOwned::to_owned),
        }
    }
}

/// The dashboard (generation-input surface plus course list).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub form: FormSnapshot,
    pub courses: Vec<CourseRowView>,
    pub notice: Option<Notice>,
    pub estimator_running: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRowView {
    pub course: CourseSummary,
    /// Freshly generated course, badged "NEW".
    pub is_new: bool,
}
