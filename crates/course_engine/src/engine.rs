use std::future::Future;
use std::io;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use course_core::{CourseId, CourseSummary, FormSnapshot};
use course_logging::{course_debug, course_warn};
use tokio::runtime::{Handle, Runtime};

use crate::{ApiError, CourseApi};

/// Results of work the engine ran on behalf of the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    GenerationFinished {
        result: Result<CourseId, ApiError>,
    },
    CoursesLoaded {
        result: Result<Vec<CourseSummary>, ApiError>,
    },
    CourseDeleted {
        course_id: CourseId,
        result: Result<(), ApiError>,
    },
}

/// Owns the async runtime and executes API effects off the caller's thread.
pub struct EngineHandle {
    runtime: Arc<Runtime>,
    api: Arc<dyn CourseApi>,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(api: Arc<dyn CourseApi>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("course-engine")
            .enable_all()
            .build()?;
        let (event_tx, event_rx) = mpsc::channel();

        Ok(Self {
            runtime: Arc::new(runtime),
            api,
            event_tx,
            event_rx,
        })
    }

    /// Handle for spawning timer drivers on the engine runtime.
    pub fn runtime(&self) -> Handle {
        self.runtime.handle().clone()
    }

    pub fn api(&self) -> Arc<dyn CourseApi> {
        self.api.clone()
    }

    /// Runs a one-off request to completion on the engine runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn submit(&self, form: FormSnapshot) {
        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            let result = api.submit_generation(&form).await;
            if let Err(err) = &result {
                course_warn!("Generation for {:?} failed: {}", form.topic, err);
            }
            send(&event_tx, EngineEvent::GenerationFinished { result });
        });
    }

    pub fn load_courses(&self) {
        let api = self.api.clone();
        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            let result = api.list_courses().await;
            send(&event_tx, EngineEvent::CoursesLoaded { result });
        });
    }

    pub fn delete(&self, ids: Vec<CourseId>) {
        for course_id in ids {
            let api = self.api.clone();
            let event_tx = self.event_tx.clone();
            self.runtime.spawn(async move {
                let result = api.delete_course(course_id).await;
                send(&event_tx, EngineEvent::CourseDeleted { course_id, result });
            });
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

fn send(event_tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    course_debug!("engine event {:?}", event);
    let _ = event_tx.send(event);
}
