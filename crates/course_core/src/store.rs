use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use course_logging::{course_debug, course_info, course_warn};

use crate::storage::{KeyValueStore, MemoryStorage, StorageError};
use crate::{CourseId, FormSnapshot, GenerationJob, GenerationStatus};

pub const STATUS_KEY: &str = "dash_genStatus";
pub const START_KEY: &str = "dash_genStart";
pub const PROGRESS_KEY: &str = "dash_progress";
pub const RESULT_KEY: &str = "dash_genId";
pub const BACKEND_RESULT_KEY: &str = "dash_backendId";
pub const FORM_KEY: &str = "dash_form";
/// Session-scoped; lost when the originating session ends.
pub const ALIVE_KEY: &str = "dash_genAlive";

/// The durable generation state plus the session liveness flag.
///
/// Cheap to clone; clones address the same backends. Storage failures never
/// escape: reads fall back to idle defaults and failed writes leave the prior
/// state in place, both logged.
#[derive(Clone)]
pub struct GenerationStore {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for GenerationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStore").finish_non_exhaustive()
    }
}

impl GenerationStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, session }
    }

    /// Fresh in-memory durable and session storage.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Same durable storage seen from another session (a new tab or process).
    pub fn with_session(&self, session: Arc<dyn KeyValueStore>) -> Self {
        Self::new(self.durable.clone(), session)
    }

    pub fn durable(&self) -> &Arc<dyn KeyValueStore> {
        &self.durable
    }

    /// Begins a new job. Returns `false` and writes nothing if the form is
    /// incomplete.
    pub fn start(&self, form: &FormSnapshot, now: DateTime<Utc>) -> bool {
        if !form.is_complete() {
            course_warn!("Refusing to start generation with incomplete form");
            return false;
        }

        let form_json = match serde_json::to_string(form) {
            Ok(json) => json,
            Err(err) => {
                course_warn!("Failed to encode form snapshot: {}", err);
                return false;
            }
        };

        // Stale results go first so a reader never pairs them with the new run.
        self.remove_durable(RESULT_KEY);
        self.remove_durable(BACKEND_RESULT_KEY);
        self.write_durable(START_KEY, &now.to_rfc3339_opts(SecondsFormat::Millis, true));
        self.write_durable(PROGRESS_KEY, "0");
        self.write_durable(FORM_KEY, &form_json);
        self.put(&*self.session, ALIVE_KEY, "1");
        self.write_durable(STATUS_KEY, GenerationStatus::Running.as_str());

        course_info!(
            "Generation started subject={:?} topic={:?} standard={:?}",
            form.subject,
            form.topic,
            form.standard
        );
        true
    }

    pub fn read(&self) -> GenerationJob {
        let status = match self.read_durable(STATUS_KEY) {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                course_warn!("Ignoring stored status: {}", err);
                GenerationStatus::Idle
            }),
            None => GenerationStatus::Idle,
        };

        let start_time = self.read_durable(START_KEY).and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| course_warn!("Ignoring stored start time {:?}: {}", raw, err))
                .ok()
        });

        let progress_percent = if status == GenerationStatus::Completed {
            100
        } else {
            self.read_durable(PROGRESS_KEY)
                .and_then(|raw| raw.trim().parse::<u8>().ok())
                .map_or(0, |value| value.min(100))
        };

        let result_course_id = if status == GenerationStatus::Completed {
            self.read_course_id(RESULT_KEY)
        } else {
            None
        };

        let form = self.read_durable(FORM_KEY).and_then(|raw| {
            serde_json::from_str::<FormSnapshot>(&raw)
                .map_err(|err| course_warn!("Ignoring stored form snapshot: {}", err))
                .ok()
        });

        let session_alive = self
            .load(&*self.session, ALIVE_KEY)
            .is_some_and(|value| !value.is_empty());

        GenerationJob {
            status,
            start_time,
            progress_percent,
            result_course_id,
            backend_result: self.read_course_id(BACKEND_RESULT_KEY),
            session_alive,
            form,
        }
    }

    /// Records that the backend finished and produced `course_id`. Status is
    /// left for the estimator to advance. Ignored when no job is in flight.
    pub fn mark_backend_result(&self, course_id: CourseId) {
        let status = self.read().status;
        if !status.is_in_flight() {
            course_warn!(
                "Dropping backend result {} because generation is {}",
                course_id,
                status
            );
            return;
        }
        self.write_durable(BACKEND_RESULT_KEY, &course_id.to_string());
        course_info!("Backend result recorded course_id={}", course_id);
    }

    /// Clears every field back to idle. Safe to call repeatedly.
    pub fn reset(&self) {
        self.write_durable(STATUS_KEY, GenerationStatus::Idle.as_str());
        for key in [START_KEY, PROGRESS_KEY, RESULT_KEY, BACKEND_RESULT_KEY, FORM_KEY] {
            self.remove_durable(key);
        }
        if let Err(err) = self.session.remove(ALIVE_KEY) {
            course_warn!("Failed to clear session liveness: {}", err);
        }
        course_info!("Generation state reset");
    }

    /// Forgets this session's liveness flag, as a closed tab would.
    pub fn end_session(&self) {
        if let Err(err) = self.session.remove(ALIVE_KEY) {
            course_warn!("Failed to clear session liveness: {}", err);
        }
    }

    pub(crate) fn set_status(&self, status: GenerationStatus) {
        self.write_durable(STATUS_KEY, status.as_str());
    }

    pub(crate) fn set_progress(&self, percent: u8) {
        self.write_durable(PROGRESS_KEY, &percent.min(100).to_string());
    }

    /// Terminal transition. Idempotent: repeated calls converge on the same
    /// completed state and return the same id.
    pub(crate) fn complete(&self) -> Option<CourseId> {
        let job = self.read();
        match job.status {
            GenerationStatus::Completed => job.result_course_id,
            GenerationStatus::Running | GenerationStatus::Finalizing => {
                let course_id = job.backend_result?;
                self.write_durable(RESULT_KEY, &course_id.to_string());
                self.write_durable(PROGRESS_KEY, "100");
                self.write_durable(STATUS_KEY, GenerationStatus::Completed.as_str());
                course_info!("Generation completed course_id={}", course_id);
                Some(course_id)
            }
            GenerationStatus::Idle => None,
        }
    }

    fn read_course_id(&self, key: &str) -> Option<CourseId> {
        self.read_durable(key).and_then(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| course_warn!("Ignoring malformed course id {:?} under {}", raw, key))
                .ok()
        })
    }

    fn read_durable(&self, key: &str) -> Option<String> {
        self.load(&*self.durable, key)
    }

    fn write_durable(&self, key: &str, value: &str) {
        self.put(&*self.durable, key, value);
    }

    fn remove_durable(&self, key: &str) {
        if let Err(err) = self.durable.remove(key) {
            log_storage_failure("remove", key, &err);
        }
    }

    fn load(&self, backend: &dyn KeyValueStore, key: &str) -> Option<String> {
        match backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                log_storage_failure("read", key, &err);
                None
            }
        }
    }

    fn put(&self, backend: &dyn KeyValueStore, key: &str, value: &str) {
        course_debug!("store {}={}", key, value);
        if let Err(err) = backend.set(key, value) {
            log_storage_failure("write", key, &err);
        }
    }
}

fn log_storage_failure(action: &str, key: &str, err: &StorageError) {
    course_warn!("Failed to {} {}: {}", action, key, err);
}
