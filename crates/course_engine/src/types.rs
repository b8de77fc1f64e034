use std::fmt;

use course_core::CourseSummary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Full course as served by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Course {
    #[serde(flatten)]
    pub summary: CourseSummary,
    #[serde(default)]
    pub intro: Option<String>,
    /// Resource links; either plain URLs or `{title, url}` objects.
    #[serde(default)]
    pub links: Vec<serde_json::Value>,
    /// Lesson title → lesson body.
    #[serde(default)]
    pub lessons: serde_json::Value,
    /// Quizzes keyed like the lessons.
    #[serde(default)]
    pub tests: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Token handed out by login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    Unauthorized,
    NotFound,
    /// The backend answered but reported `success: false`.
    Rejected,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Decode => write!(f, "unreadable response"),
        }
    }
}
