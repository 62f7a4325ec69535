//! Cachet - cached attributes for expensive, deterministic computations
//!
//! A [`CachedAttribute`] wraps a computation on an object instance (or on
//! a type) and serves its result from, in order:
//!
//! 1. the instance's own [`MemoSlot`] (zero-argument calls only),
//! 2. an external [`CacheStore`] with per-entry TTL, keyed by a
//!    [`CacheKey`] derived from the type, the attribute, and the instance
//!    identity or the call arguments,
//! 3. the computation itself, whose result is written back to both.
//!
//! Each attribute also offers `invalidate` (delete the store entry) and
//! `refresh` (recompute and overwrite the store entry).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cachet::{CachedAttribute, Identity, MemoSlot, MemoryStore};
//! use futures_util::FutureExt;
//!
//! struct Account {
//!     id: u64,
//!     balance: MemoSlot<i64>,
//! }
//!
//! impl Identity for Account {
//!     fn identity(&self) -> String {
//!         self.id.to_string()
//!     }
//! }
//!
//! async fn load_balance(id: u64) -> Result<i64, cachet::BoxError> {
//!     // ... an expensive query ...
//!     Ok(100)
//! }
//!
//! #[tokio::main]
//! async fn main() -> cachet::Result<()> {
//!     cachet::store::install_default(Arc::new(MemoryStore::new()))?;
//!
//!     let balance: CachedAttribute<Account, (), i64> =
//!         CachedAttribute::builder("balance", |account: &Account, _: &()| {
//!             load_balance(account.id).boxed()
//!         })
//!         .memo_slot(|account| &account.balance)
//!         .build()?;
//!
//!     let account = Account { id: 7, balance: MemoSlot::new() };
//!     println!("{}", balance.get(&account, &()).await?);
//!
//!     balance.refresh(&account, &()).await?;
//!     Ok(())
//! }
//! ```

pub mod attribute;
pub mod config;
pub mod error;
pub mod identity;
pub mod key;
pub mod memo;
pub mod store;
pub mod telemetry;

// Re-export main types at crate root
pub use attribute::{AttributeBuilder, AttributeSpec, CachedAttribute, DEFAULT_TTL, Fetched, Source};
pub use config::{AttributeDefaults, Config};
pub use error::{BoxError, CachetError, Result};
pub use identity::{Identifier, Identity};
pub use key::{Arguments, CacheKey, Scope};
pub use memo::MemoSlot;
pub use store::{CacheLookup, CacheStore, EntryInfo, MemoryStore, Recompute, StoreConfig};

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
