//! Durable session-token storage.
//!
//! Persists a flat string map in `session.json` under the configured state
//! path; the token lives under one fixed key.  The file is re-read on every
//! access so another process replacing it is picked up (last writer wins).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use nd_domain::error::{Error, Result};

const STORE_FILE: &str = "session.json";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backends
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
enum Backend {
    File {
        path: PathBuf,
        write_lock: Mutex<()>,
    },
    Memory(RwLock<BTreeMap<String, String>>),
}

/// Key-value store holding the current session token.
#[derive(Debug)]
pub struct TokenStore {
    backend: Backend,
    key: String,
}

impl TokenStore {
    /// Open (or prepare) the store at `state_path/session.json`.
    pub fn open(state_path: &Path, key: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(state_path).map_err(Error::Io)?;
        let path = state_path.join(STORE_FILE);

        tracing::debug!(path = %path.display(), "session token store opened");

        Ok(Self {
            backend: Backend::File {
                path,
                write_lock: Mutex::new(()),
            },
            key: key.into(),
        })
    }

    /// A store that lives only as long as the process.
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(BTreeMap::new())),
            key: key.into(),
        }
    }

    /// The key the token is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored token, if any.  Empty values count as absent.
    pub fn load(&self) -> Result<Option<String>> {
        let value = match &self.backend {
            Backend::File { path, .. } => read_map(path)?.remove(&self.key),
            Backend::Memory(map) => map.read().get(&self.key).cloned(),
        };
        Ok(value.filter(|v| !v.trim().is_empty()))
    }

    /// Persist `token` under the store key.
    pub fn save(&self, token: &str) -> Result<()> {
        match &self.backend {
            Backend::File { path, write_lock } => {
                let _guard = write_lock.lock();
                let mut map = read_map(path)?;
                map.insert(self.key.clone(), token.to_owned());
                write_map(path, &map)
            }
            Backend::Memory(map) => {
                map.write().insert(self.key.clone(), token.to_owned());
                Ok(())
            }
        }
    }

    /// Remove the stored token.  Removing an absent token is not an error.
    pub fn clear(&self) -> Result<()> {
        match &self.backend {
            Backend::File { path, write_lock } => {
                let _guard = write_lock.lock();
                let mut map = read_map(path)?;
                if map.remove(&self.key).is_none() {
                    return Ok(());
                }
                write_map(path, &map)
            }
            Backend::Memory(map) => {
                map.write().remove(&self.key);
                Ok(())
            }
        }
    }
}

// ── file helpers ────────────────────────────────────────────────────

/// Read the map; a missing file is empty and a corrupt one is discarded.
fn read_map(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    match serde_json::from_str(&raw) {
        Ok(map) => Ok(map),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "session store is corrupt, treating as empty"
            );
            Ok(BTreeMap::new())
        }
    }
}

/// Write through a temp file and rename so readers never see half a file.
fn write_map(path: &Path, map: &BTreeMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(map)
        .map_err(|e| Error::Other(format!("serializing session store: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(Error::Io)?;
    std::fs::rename(&tmp, path).map_err(Error::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::open(dir.path(), "chat_session_id").unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.save("sess-1").unwrap();

        let reopened = TokenStore::open(dir.path(), "chat_session_id").unwrap();
        assert_eq!(reopened.load().unwrap().as_deref(), Some("sess-1"));
    }

    #[test]
    fn clear_removes_only_the_token_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::open(dir.path(), "chat_session_id").unwrap();
        let other = TokenStore::open(dir.path(), "theme").unwrap();
        store.save("sess-1").unwrap();
        other.save("dark").unwrap();

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(other.load().unwrap().as_deref(), Some("dark"));

        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORE_FILE), "{not json").unwrap();
        let store = TokenStore::open(dir.path(), "chat_session_id").unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.save("fresh").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let store = TokenStore::in_memory("chat_session_id");
        store.save("   ").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn open_creates_state_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = TokenStore::open(&nested, "k").unwrap();
        store.save("v").unwrap();
        assert!(nested.join(STORE_FILE).exists());
    }
}
