#![deny(warnings)]

//! Persistence layer: the profile blob in a key/value store.
//!
//! The whole profile is stored as one JSON document under [`STORAGE_KEY`].
//! Loading merges the stored fields over [`Profile::default`] and repairs
//! legacy or malformed shapes instead of failing.

use quest_core::Profile;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

mod merge;
mod store;

pub use merge::decode_profile;
pub use store::{FileStore, MemoryStore};

/// Fixed key of the profile blob.
pub const STORAGE_KEY: &str = "studyQuestProfile";

/// Returns the default directory used for local saves.
pub fn default_data_dir() -> &'static str {
    "./saves"
}

/// Storage failures. Malformed data is not an error; it is repaired on load.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize profile: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A synchronous string key/value store, in the manner of browser local
/// storage.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Load the profile, or defaults when nothing has been saved yet.
pub fn load_profile<S: KvStore + ?Sized>(store: &S) -> Result<Profile, StoreError> {
    match store.get(STORAGE_KEY)? {
        Some(raw) => {
            let profile = decode_profile(&raw);
            info!(
                level = profile.level,
                tasks = profile.active_tasks.len(),
                "profile loaded"
            );
            Ok(profile)
        }
        None => {
            info!("no saved profile, starting from defaults");
            Ok(Profile::default())
        }
    }
}

/// Serialize the full profile under the fixed key.
pub fn save_profile<S: KvStore + ?Sized>(store: &mut S, profile: &Profile) -> Result<(), StoreError> {
    let blob = serde_json::to_string(profile)?;
    store.set(STORAGE_KEY, &blob)
}

/// Discard the saved profile; the next load yields defaults.
pub fn clear_profile<S: KvStore + ?Sized>(store: &mut S) -> Result<(), StoreError> {
    warn!("discarding saved profile");
    store.remove(STORAGE_KEY)
}
