//! Cache store contract.
//!
//! Cached attributes never own their storage; they drive a [`CacheStore`]
//! through three operations:
//!
//! - `get`: return the live entry for a key, or run the supplied
//!   recompute future once, store its result with the given TTL, and
//!   return it.
//! - `delete`: remove an entry; deleting a missing key is not an error.
//! - `set`: unconditionally write an entry with the given TTL.
//!
//! Expiry and eviction policy belong to the store. A store is not required
//! to coalesce concurrent misses for the same key; callers tolerate several
//! recomputations racing to write the same deterministic value.
//!
//! Values travel in their serialized JSON form, so one store serves
//! attributes of any value type.
//!
//! # Default store
//!
//! [`install_default`] registers a process-wide store once, typically at
//! startup. Attributes built without an explicit store (and without
//! opting out) pick it up when they are built.

pub mod memory;

pub use memory::{EntryInfo, MemoryStore, StoreConfig};

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::{CachetError, Result};

/// Future that recomputes a missing entry.
pub type Recompute<'a> = BoxFuture<'a, Result<Value>>;

/// Outcome of [`CacheStore::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub value: Value,
    /// `true` when the value came from a live entry, `false` when the
    /// recompute future produced it.
    pub hit: bool,
}

impl CacheLookup {
    pub fn hit(value: Value) -> Self {
        Self { value, hit: true }
    }

    pub fn miss(value: Value) -> Self {
        Self { value, hit: false }
    }
}

/// External key-value store with per-entry TTL.
///
/// Implementations report their own failures as [`CachetError::Store`]
/// and must return errors from `recompute` unchanged, without writing
/// anything under the key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name for logging/metrics.
    fn name(&self) -> &str;

    /// Get-or-compute.
    async fn get(&self, key: &str, ttl: Duration, recompute: Recompute<'_>) -> Result<CacheLookup>;

    /// Remove any entry for `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Write `value` under `key`, replacing any existing entry.
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
}

static DEFAULT_STORE: OnceLock<Arc<dyn CacheStore>> = OnceLock::new();

/// Register the process-wide default store.
///
/// Can be called once; later calls fail with
/// [`CachetError::Configuration`] and leave the first store in place.
pub fn install_default(store: Arc<dyn CacheStore>) -> Result<()> {
    let name = store.name().to_owned();
    DEFAULT_STORE.set(store).map_err(|_| {
        CachetError::Configuration(format!(
            "default cache store already installed, refusing '{name}'"
        ))
    })?;
    tracing::info!(store = %name, "default cache store installed");
    Ok(())
}

/// The process-wide default store, if one was installed.
pub fn default_store() -> Option<Arc<dyn CacheStore>> {
    DEFAULT_STORE.get().cloned()
}
