/// Short, dismissible user-facing notices. Never carries technical detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// The submission call was rejected or returned `success: false`.
    SubmissionFailed,
    /// A job was found in flight but its originating session is gone.
    Interrupted,
    /// A completed job has no usable course id.
    MissingResult,
    MissingFields,
    DeleteFailed,
    LoadFailed,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::SubmissionFailed => "Generation failed. Please try again.",
            Notice::Interrupted => {
                "Your last course generation was interrupted before it finished. Please start it again."
            }
            Notice::MissingResult => "The finished course could not be found.",
            Notice::MissingFields => "Fill all fields.",
            Notice::DeleteFailed => "The course could not be deleted.",
            Notice::LoadFailed => "Failed to load courses.",
        }
    }
}
