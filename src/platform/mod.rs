//! Platform abstraction layer
//!
//! Handles host differences for:
//! - Time (wall clock vs. manually advanced clock for tests)
//! - Storage (key-value persistence)

pub mod storage;
pub mod time;

pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use time::{Clock, ManualClock, SystemClock};
