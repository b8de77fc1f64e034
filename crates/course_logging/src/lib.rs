#![deny(missing_docs)]
//! Shared logging utilities for the course generator workspace.
//!
//! Every `course_*` macro forwards to the `log` facade re-exported here, so
//! callers need no direct `log` dependency and the binary alone decides where
//! records end up.

use log::LevelFilter;

#[doc(hidden)]
pub use log as __log;

/// Environment variable overriding the default log level.
pub const LEVEL_ENV: &str = "COURSEGEN_LOG";

/// Logs a trace-level message.
#[macro_export]
macro_rules! course_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! course_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs an info-level message.
#[macro_export]
macro_rules! course_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a warn-level message.
#[macro_export]
macro_rules! course_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message.
#[macro_export]
macro_rules! course_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Level named by [`LEVEL_ENV`], or `fallback` when unset or unrecognised.
pub fn level_from_env(fallback: LevelFilter) -> LevelFilter {
    std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(fallback)
}

/// Installs a terminal logger for tests; a no-op once any logger is set.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let fallback = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = TermLogger::init(
        level_from_env(fallback),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}
