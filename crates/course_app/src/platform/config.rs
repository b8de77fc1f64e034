use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use course_core::GenerationSettings;
use course_engine::ApiSettings;
use course_logging::{course_info, course_warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILENAME: &str = "coursegen.ron";

/// Optional `coursegen.ron` in the state directory. Missing fields keep
/// their defaults; durations are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub expected_duration_ms: u64,
    pub estimator_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub dismiss_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        let generation = GenerationSettings::default();
        Self {
            api_base_url: api.base_url,
            connect_timeout_ms: millis(api.connect_timeout),
            request_timeout_ms: millis(api.request_timeout),
            expected_duration_ms: millis(generation.expected_duration),
            estimator_interval_ms: millis(generation.estimator_interval),
            poll_interval_ms: millis(generation.poll_interval),
            dismiss_delay_ms: millis(generation.dismiss_delay),
        }
    }
}

impl AppConfig {
    /// Reads the config from `state_dir`, falling back to defaults when the
    /// file is absent or unreadable.
    pub fn load(state_dir: &Path) -> Self {
        let path = state_dir.join(CONFIG_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                course_warn!("Failed to read config from {:?}: {}", path, err);
                return Self::default();
            }
        };

        match ron::from_str(&content) {
            Ok(config) => {
                course_info!("Loaded config from {:?}", path);
                config
            }
            Err(err) => {
                course_warn!("Failed to parse config from {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            expected_duration: Duration::from_millis(self.expected_duration_ms),
            estimator_interval: Duration::from_millis(self.estimator_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            dismiss_delay: Duration::from_millis(self.dismiss_delay_ms),
        }
        .normalized()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_means_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(AppConfig::load(temp.path()), AppConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILENAME),
            "(api_base_url: \"http://courses.internal:8080\", expected_duration_ms: 60000)",
        )
        .unwrap();

        let config = AppConfig::load(temp.path());

        assert_eq!(config.api_base_url, "http://courses.internal:8080");
        assert_eq!(
            config.generation_settings().expected_duration,
            Duration::from_secs(60)
        );
        assert_eq!(
            config.generation_settings().poll_interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn malformed_file_means_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "(api_base_url: 3").unwrap();

        assert_eq!(AppConfig::load(temp.path()), AppConfig::default());
    }

    #[test]
    fn zero_expected_duration_is_replaced() {
        let config = AppConfig {
            expected_duration_ms: 0,
            ..AppConfig::default()
        };
        assert!(config.generation_settings().expected_duration > Duration::ZERO);
    }
}
