use crate::{CourseId, FormSnapshot, Notice, ReceiverView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitGeneration { form: FormSnapshot },
    StartEstimator,
    StopEstimator,
    LoadCourses,
    DeleteCourses { ids: Vec<CourseId> },
    Navigate(Route),
    ScrollToTop,
    ShowNotice(Notice),
    /// A receiver's view changed and should be drawn again.
    Redraw(ReceiverView),
    /// An auto-dismissing receiver hides itself.
    Dismiss,
}

/// Surfaces a user can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The generation-input surface.
    Generate,
    Course(CourseId),
}
