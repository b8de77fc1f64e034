//! Course engine: backend client, durable storage and effect execution.
mod api;
mod driver;
mod engine;
mod storage;
mod types;

pub use api::{ApiSettings, CourseApi, ReqwestCourseApi};
pub use driver::{
    mount_receiver, spawn_estimator, ChannelEstimatorSink, ChannelReceiverSink, EstimatorSink,
    ReceiverSink, TimerHandle,
};
pub use engine::{EngineEvent, EngineHandle};
pub use storage::{ensure_state_dir, FileStorage, PersistError};
pub use types::{ApiError, AuthSession, Course, Credentials, FailureKind};
