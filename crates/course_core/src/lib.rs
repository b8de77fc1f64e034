//! Course generator core: generation-status state machine, its storage
//! contract and the pure update function driving the dashboard.
mod clock;
mod effect;
mod job;
mod msg;
mod notice;
mod progress;
mod receiver;
mod settings;
mod state;
mod storage;
mod store;
mod update;
mod view_model;

pub use clock::{Clock, ManualClock, SystemClock};
pub use effect::{Effect, Route};
pub use job::{
    CourseId, CourseSummary, FormField, FormSnapshot, GenerationJob, GenerationStatus,
    ParseStatusError,
};
pub use msg::Msg;
pub use notice::Notice;
pub use progress::{progress_percent, ProgressDisplay, ProgressEstimator, TickOutcome, RUNNING_CAP};
pub use receiver::{StatusBroadcastReceiver, Surface};
pub use settings::GenerationSettings;
pub use state::AppState;
pub use storage::{KeyValueStore, MemoryStorage, StorageError};
pub use store::{
    GenerationStore, ALIVE_KEY, BACKEND_RESULT_KEY, FORM_KEY, PROGRESS_KEY, RESULT_KEY, START_KEY,
    STATUS_KEY,
};
pub use update::update;
pub use view_model::{AppViewModel, CourseRowView, ReceiverView};
