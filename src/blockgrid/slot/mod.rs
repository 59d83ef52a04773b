//! # Durable Slot Storage
//!
//! The store keeps the whole collection in a single named slot: one string value
//! under one key. [`SlotBackend`] is the raw I/O seam beneath it.
//!
//! ## Implementations
//!
//! - [`fs::FsSlot`]: one file per key, `<dir>/<key>.json`, written atomically
//!   (temporary file then rename) so a crash never leaves a half-written payload.
//! - [`memory::MemSlot`]: a `RefCell`-backed map for tests. It can be told to
//!   fail reads or writes to exercise the store's error paths.
//!
//! The backend knows nothing about blocks. Encoding the payload and tolerating a
//! corrupt or missing slot is the job of [`crate::persist`].

use crate::error::Result;

pub mod fs;
pub mod memory;

/// Raw key/value access to durable storage.
pub trait SlotBackend {
    /// Returns `Ok(None)` when nothing has been stored under `key` yet.
    /// Errors are reserved for storage that exists but cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value under `key`. Must be atomic.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes the value under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Human-readable location of `key`, for diagnostics.
    fn describe(&self, key: &str) -> String;
}
