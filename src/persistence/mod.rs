//! Profile persistence
//!
//! Features:
//! - One storage key per profile field, each read independently at startup
//! - Debounced saves after mutation
//! - Timestamped backup envelope for an external backup sink
//!
//! Failures are logged and never roll back in-memory state.

pub mod backup;
pub mod debounce;
pub mod layout;

pub use backup::{BackupEnvelope, BackupSink, StoreBackup};
pub use debounce::SaveDebouncer;
pub use layout::{load_profile, save_profile};
