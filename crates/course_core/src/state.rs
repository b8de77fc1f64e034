use crate::view_model::{AppViewModel, CourseRowView};
use crate::{CourseId, CourseSummary, FormField, FormSnapshot, Notice, ProgressEstimator};

/// Local state of the generation-input surface. The job itself lives in the
/// [`crate::GenerationStore`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    form: FormSnapshot,
    courses: Vec<CourseSummary>,
    new_course: Option<CourseId>,
    notice: Option<Notice>,
    estimator: ProgressEstimator,
    estimator_running: bool,
    dirty: bool,
}

impl AppState {
    pub fn new(estimator: ProgressEstimator) -> Self {
        Self {
            estimator,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            form: self.form.clone(),
            courses: self
                .courses
                .iter()
                .map(|course| CourseRowView {
                    course: course.clone(),
                    is_new: self.new_course == Some(course.id),
                })
                .collect(),
            notice: self.notice,
            estimator_running: self.estimator_running,
            dirty: self.dirty,
        }
    }

    pub fn estimator(&self) -> &ProgressEstimator {
        &self.estimator
    }

    pub fn form(&self) -> &FormSnapshot {
        &self.form
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notice
    }

    pub fn estimator_running(&self) -> bool {
        self.estimator_running
    }

    /// Returns whether anything changed since the last call, and clears it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn set_form_field(&mut self, field: FormField, value: String) {
        self.form.set(field, value);
        self.dirty = true;
    }

    pub(crate) fn clear_form(&mut self) {
        self.form = FormSnapshot::default();
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, notice: Option<Notice>) {
        if self.notice != notice {
            self.notice = notice;
            self.dirty = true;
        }
    }

    pub(crate) fn set_estimator_running(&mut self, running: bool) {
        if self.estimator_running != running {
            self.estimator_running = running;
            self.dirty = true;
        }
    }

    pub(crate) fn set_courses(&mut self, courses: Vec<CourseSummary>) {
        self.courses = courses;
        self.dirty = true;
    }

    pub(crate) fn remove_courses(&mut self, ids: &[CourseId]) {
        let before = self.courses.len();
        self.courses.retain(|course| !ids.contains(&course.id));
        if self.courses.len() != before {
            self.dirty = true;
        }
    }

    pub(crate) fn new_course(&self) -> Option<CourseId> {
        self.new_course
    }

    pub(crate) fn set_new_course(&mut self, course_id: Option<CourseId>) {
        if self.new_course != course_id {
            self.new_course = course_id;
            self.dirty = true;
        }
    }
}
