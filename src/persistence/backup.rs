//! Cloud backup contract
//!
//! The real backup service is an external collaborator. The envelope is what
//! gets shipped; [`StoreBackup`] keeps it in a key-value store as a local
//! stand-in for the remote copy.

use serde::{Deserialize, Serialize};

use crate::platform::storage::{KeyValueStore, StoreError};
use crate::profile::Profile;

pub const KEY_CLOUD_BACKUP: &str = "skyflap-cloud-backup";

/// Versioned, timestamped profile copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEnvelope {
    pub version: u32,
    pub timestamp_ms: u64,
    pub username: String,
    pub data: Profile,
}

impl BackupEnvelope {
    pub const VERSION: u32 = 1;

    pub fn new(username: &str, profile: &Profile, timestamp_ms: u64) -> Self {
        Self {
            version: Self::VERSION,
            timestamp_ms,
            username: username.to_string(),
            data: profile.clone(),
        }
    }
}

/// Destination for profile backups
pub trait BackupSink {
    fn backup(&mut self, envelope: &BackupEnvelope) -> Result<(), StoreError>;
}

/// Backup sink writing the envelope into a key-value store
#[derive(Debug, Default)]
pub struct StoreBackup<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> StoreBackup<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Last backup written, if readable
    pub fn latest(&self) -> Option<BackupEnvelope> {
        let raw = self.store.get(KEY_CLOUD_BACKUP).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }
}

impl<S: KeyValueStore> BackupSink for StoreBackup<S> {
    fn backup(&mut self, envelope: &BackupEnvelope) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(envelope).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.store.set(KEY_CLOUD_BACKUP, &json)?;
        log::info!("Backed up profile for {}", envelope.username);
        Ok(())
    }
}
