//! Save/Load through an opaque key-value gateway.
//!
//! The engine never decides how blobs are stored. It serializes aggregates to
//! JSON strings and hands them to a [`PersistenceGateway`] under fixed keys.
//! There is no schema versioning: a format change is a breaking change.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::GameState;

/// Signed-in identity.
pub const AUTH_USER_KEY: &str = "@garden_auth_user";
/// The active profile.
pub const PROFILE_KEY: &str = "@garden_user_profile";
/// Every profile created on this device.
pub const ALL_PROFILES_KEY: &str = "@garden_all_profiles";
pub const GAME_STATE_KEY: &str = "@garden_game_state";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to deserialize {key}: {source}")]
    Deserialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Async key-value storage for serialized blobs.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn set(&self, key: &str, blob: String) -> Result<(), PersistenceError>;
    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-process gateway. Failures can be switched on to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Synchronous read for inspection in tests and tools.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Backend("memory gateway is failing".into()))
        } else {
            Ok(())
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistenceError> {
        self.entries
            .lock()
            .map_err(|_| PersistenceError::Backend("memory gateway lock poisoned".into()))
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.check()?;
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), PersistenceError> {
        self.check()?;
        self.entries()?.insert(key.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.check()?;
        self.entries()?.remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileGateway {
    dir: PathBuf,
}

impl FileGateway {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name.trim_start_matches('_')))
    }
}

fn backend(e: std::io::Error) -> PersistenceError {
    PersistenceError::Backend(e.to_string())
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend(e)),
        }
    }

    async fn set(&self, key: &str, blob: String) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(backend)?;
        tokio::fs::write(self.path_for(key), blob).await.map_err(backend)
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }
}

pub(crate) fn to_blob<T: Serialize>(key: &'static str, value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|source| PersistenceError::Serialize { key, source })
}

pub(crate) fn from_blob<T: for<'de> Deserialize<'de>>(
    key: &'static str,
    blob: &str,
) -> Result<T, PersistenceError> {
    serde_json::from_str(blob).map_err(|source| PersistenceError::Deserialize { key, source })
}

/// Load the saved garden, if there is one.
pub async fn load_game_state(
    gateway: &dyn PersistenceGateway,
) -> Result<Option<GameState>, PersistenceError> {
    match gateway.get(GAME_STATE_KEY).await? {
        Some(blob) => Ok(Some(from_blob(GAME_STATE_KEY, &blob)?)),
        None => Ok(None),
    }
}

pub async fn save_game_state(
    gateway: &dyn PersistenceGateway,
    state: &GameState,
) -> Result<(), PersistenceError> {
    gateway.set(GAME_STATE_KEY, to_blob(GAME_STATE_KEY, state)?).await
}

/// A set of pending writes: `Some` stores the blob, `None` removes the key.
pub type SaveBatch = Vec<(&'static str, Option<String>)>;

/// Apply a batch in order, stopping at the first failure.
pub async fn write_batch(
    gateway: &dyn PersistenceGateway,
    batch: SaveBatch,
) -> Result<(), PersistenceError> {
    for (key, blob) in batch {
        match blob {
            Some(blob) => gateway.set(key, blob).await?,
            None => gateway.remove(key).await?,
        }
        debug!(key, "persisted");
    }
    Ok(())
}

/// Background writer: applies batches one at a time, in arrival order, and
/// logs failures without stopping. Ends when every sender is dropped.
pub async fn run_saver(
    gateway: Arc<dyn PersistenceGateway>,
    mut batches: tokio::sync::mpsc::UnboundedReceiver<SaveBatch>,
) {
    while let Some(batch) = batches.recv().await {
        if let Err(e) = write_batch(gateway.as_ref(), batch).await {
            warn!(error = %e, "save failed; in-memory state kept");
        }
    }
}

/// Who is signed in on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredIdentity {
    pub id: String,
    /// `google`, `apple`, or `username`.
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub async fn load_identity(
    gateway: &dyn PersistenceGateway,
) -> Result<Option<StoredIdentity>, PersistenceError> {
    match gateway.get(AUTH_USER_KEY).await? {
        Some(blob) => Ok(Some(from_blob(AUTH_USER_KEY, &blob)?)),
        None => Ok(None),
    }
}

pub async fn save_identity(
    gateway: &dyn PersistenceGateway,
    identity: &StoredIdentity,
) -> Result<(), PersistenceError> {
    gateway.set(AUTH_USER_KEY, to_blob(AUTH_USER_KEY, identity)?).await
}

/// Forget the signed-in identity and the active profile. The all-profiles
/// collection and the garden are kept.
pub async fn sign_out(gateway: &dyn PersistenceGateway) -> Result<(), PersistenceError> {
    gateway.remove(AUTH_USER_KEY).await?;
    gateway.remove(PROFILE_KEY).await
}
