use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Identifier of a course produced by the backend.
pub type CourseId = u64;

/// Lifecycle of the single generation job.
///
/// `Idle` and `Completed` are stable; `Running` and `Finalizing` always move
/// forward or fall back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Running,
    Finalizing,
    Completed,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Running => "running",
            GenerationStatus::Finalizing => "finalizing",
            GenerationStatus::Completed => "completed",
        }
    }

    /// True while a submitted job has not reached a terminal state.
    pub fn is_in_flight(self) -> bool {
        matches!(self, GenerationStatus::Running | GenerationStatus::Finalizing)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown generation status {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for GenerationStatus {
    type Err = ParseStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "idle" => Ok(GenerationStatus::Idle),
            "running" => Ok(GenerationStatus::Running),
            "finalizing" => Ok(GenerationStatus::Finalizing),
            "completed" => Ok(GenerationStatus::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Which form input a [`crate::Msg::FormChanged`] edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Subject,
    Topic,
    Standard,
}

/// What the user asked a course to be generated for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub subject: String,
    pub topic: String,
    /// Grade level. Kept as text; the backend accepts either form.
    #[serde(deserialize_with = "string_or_number")]
    pub standard: String,
}

impl FormSnapshot {
    pub fn new(
        subject: impl Into<String>,
        topic: impl Into<String>,
        standard: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
            standard: standard.into(),
        }
    }

    pub fn trimmed(&self) -> Self {
        Self::new(
            self.subject.trim(),
            self.topic.trim(),
            self.standard.trim(),
        )
    }

    /// All three fields carry non-blank text.
    pub fn is_complete(&self) -> bool {
        [&self.subject, &self.topic, &self.standard]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Subject => self.subject = value,
            FormField::Topic => self.topic = value,
            FormField::Standard => self.standard = value,
        }
    }
}

/// Course row as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub topic: String,
    pub subject: String,
    #[serde(deserialize_with = "string_or_number")]
    pub standard: String,
}

/// Snapshot of the durable generation state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationJob {
    pub status: GenerationStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub progress_percent: u8,
    /// Visible only once `status == Completed`.
    pub result_course_id: Option<CourseId>,
    /// Backend-ready signal recorded by `mark_backend_result`, independent of
    /// the elapsed-time check.
    pub backend_result: Option<CourseId>,
    pub session_alive: bool,
    pub form: Option<FormSnapshot>,
}

impl GenerationJob {
    /// Durable state claims a job in flight but this session never started it.
    pub fn is_interrupted(&self) -> bool {
        self.status.is_in_flight() && !self.session_alive
    }

    /// Wall-clock time since start, saturating at zero if the clock went back.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.start_time
            .map(|start| (now - start).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn topic(&self) -> Option<&str> {
        self.form.as_ref().map(|form| form.topic.as_str())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Int(value) => value.to_string(),
        Raw::Float(value) => value.to_string(),
    })
}
