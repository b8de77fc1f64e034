//! Where durable state, session state and credentials live on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use course_core::{GenerationStore, KeyValueStore, MemoryStorage};
use course_engine::{ensure_state_dir, FileStorage};
use course_logging::{course_debug, course_warn};

const DURABLE_FILENAME: &str = "durable.ron";
const SESSIONS_DIR: &str = "sessions";
const DEFAULT_STATE_DIR: &str = ".coursegen";

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";

pub fn resolve_state_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

/// Opens the durable store and the session store for this invocation.
///
/// A named session lives in its own file so cooperating processes can share
/// liveness; without a name the session ends with the process.
pub fn open_store(state_dir: &Path, session: Option<&str>) -> anyhow::Result<GenerationStore> {
    ensure_state_dir(state_dir)
        .with_context(|| format!("cannot use state directory {}", state_dir.display()))?;
    let durable: Arc<dyn KeyValueStore> = Arc::new(FileStorage::new(state_dir.join(DURABLE_FILENAME)));

    let session: Arc<dyn KeyValueStore> = match session {
        Some(name) => {
            let dir = state_dir.join(SESSIONS_DIR);
            ensure_state_dir(&dir)
                .with_context(|| format!("cannot use session directory {}", dir.display()))?;
            let filename = format!("{}.ron", sanitize(name));
            course_debug!("Joining session {:?}", name);
            Arc::new(FileStorage::new(dir.join(filename)))
        }
        None => Arc::new(MemoryStorage::new()),
    };

    Ok(GenerationStore::new(durable, session))
}

/// Persisted login, shared with every other session of this state directory.
pub struct CredentialStore {
    durable: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: &GenerationStore) -> Self {
        Self {
            durable: store.durable().clone(),
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.durable.get(TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                course_warn!("Failed to read stored token: {}", err);
                None
            }
        }
    }

    pub fn username(&self) -> Option<String> {
        self.durable.get(USERNAME_KEY).ok().flatten()
    }

    pub fn save(&self, token: &str, username: &str) -> anyhow::Result<()> {
        self.durable.set(TOKEN_KEY, token)?;
        self.durable.set(USERNAME_KEY, username)?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.durable.remove(TOKEN_KEY)?;
        self.durable.remove(USERNAME_KEY)?;
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use course_core::{FormSnapshot, GenerationStatus};
    use tempfile::TempDir;

    #[test]
    fn named_session_is_shared_between_invocations() {
        let temp = TempDir::new().unwrap();
        let first = open_store(temp.path(), Some("term-1")).unwrap();
        first.start(&FormSnapshot::new("Physics", "Optics", "9"), Utc::now());

        let second = open_store(temp.path(), Some("term-1")).unwrap();
        let job = second.read();
        assert_eq!(job.status, GenerationStatus::Running);
        assert!(!job.is_interrupted());

        let stranger = open_store(temp.path(), None).unwrap();
        assert!(stranger.read().is_interrupted());
    }

    #[test]
    fn session_names_cannot_escape_the_directory() {
        assert_eq!(sanitize("../../etc/passwd"), "______etc_passwd");
    }

    #[test]
    fn credentials_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = open_store(temp.path(), None).unwrap();
        let credentials = CredentialStore::new(&store);

        assert_eq!(credentials.token(), None);
        credentials.save("jwt", "ada").unwrap();
        assert_eq!(credentials.token().as_deref(), Some("jwt"));
        assert_eq!(credentials.username().as_deref(), Some("ada"));
        credentials.clear().unwrap();
        assert_eq!(credentials.token(), None);
    }
}
