//! Cached attributes.
//!
//! A [`CachedAttribute`] wraps one expensive, deterministic computation
//! `(instance, arguments) -> value` and layers two caches over it:
//!
//! 1. the instance's [`MemoSlot`], consulted first for zero-argument calls;
//! 2. the configured [`CacheStore`], keyed by [`CacheKey`].
//!
//! ```text
//! get(instance, args)
//!   ├─ memo slot populated and args empty → value        (Source::Memo)
//!   ├─ no store configured                → compute      (Source::Live)
//!   └─ store.get(key, ttl, compute)       → hit | miss   (Source::Store)
//!        └─ result written to the memo slot (when memoizing)
//! ```
//!
//! # Memo slot coupling
//!
//! Parameterized calls bypass the memo slot on the way in but still write
//! their result into it on the way out, so the next zero-argument call on
//! that instance returns the parameterized result. The slot is keyed by
//! attribute only. Hosts that mix argument shapes on a memoized attribute
//! should build it with `.memoize(false)` or clear the slot themselves.
//!
//! # Invalidate and refresh
//!
//! [`invalidate`](CachedAttribute::invalidate) deletes the store entry and
//! [`refresh`](CachedAttribute::refresh) recomputes and overwrites it. Neither
//! touches the memo slot; a memoized instance keeps serving its value until
//! it is dropped or the host clears the slot.

mod builder;

pub use builder::AttributeBuilder;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::BoxError;
use crate::identity::{Identifier, Identity};
use crate::key::{Arguments, CacheKey, Scope};
use crate::memo::MemoSlot;
use crate::store::{CacheStore, Recompute};
use crate::telemetry;
use crate::{CachetError, Result};

/// Default time-to-live of store entries: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

pub(crate) type ComputeFn<I, A, T> = dyn for<'a> Fn(&'a I, &'a A) -> BoxFuture<'a, std::result::Result<T, BoxError>>
    + Send
    + Sync;

/// Reaches an instance's memo slot for one attribute.
pub type MemoAccessor<I, T> = fn(&I) -> &MemoSlot<T>;

/// Immutable configuration of one cached attribute, fixed at build time.
pub struct AttributeSpec<I> {
    name: String,
    subject: String,
    scope: Scope,
    ttl: Duration,
    store: Option<Arc<dyn CacheStore>>,
    identifier: Identifier<I>,
    memoize: bool,
}

impl<I> AttributeSpec<I> {
    /// Attribute name, the second key segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type path, the leading key segments.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// `None` when caching is disabled and every call computes live.
    pub fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    pub fn identifier(&self) -> &Identifier<I> {
        &self.identifier
    }

    pub fn memoize(&self) -> bool {
        self.memoize
    }

    /// `<subject>::<name>`, used as the `attribute` metric label.
    pub fn label(&self) -> String {
        format!("{}::{}", self.subject, self.name)
    }
}

impl<I> std::fmt::Debug for AttributeSpec<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("name", &self.name)
            .field("subject", &self.subject)
            .field("scope", &self.scope)
            .field("ttl", &self.ttl)
            .field("store", &self.store.as_ref().map(|s| s.name().to_owned()))
            .field("memoize", &self.memoize)
            .finish()
    }
}

impl<I, A, T> std::fmt::Debug for CachedAttribute<I, A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAttribute")
            .field("spec", &self.spec)
            .field("memo", &self.memo.is_some())
            .field("label", &self.label)
            .finish()
    }
}

/// Where a [`Fetched`] value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The instance's memo slot; neither the store nor the computation ran.
    Memo,
    /// The cache store. `hit: false` means the computation ran and its
    /// result was stored.
    Store { hit: bool },
    /// No store configured; the computation ran.
    Live,
}

/// A value together with the layer that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: Source,
}

/// A computation exposed through the store and memo layers.
///
/// Built with [`CachedAttribute::builder`]:
///
/// ```rust
/// use std::sync::Arc;
/// use cachet::{CachedAttribute, Identity, MemoSlot, MemoryStore};
/// use futures_util::FutureExt;
///
/// struct Invoice {
///     id: u64,
///     lines: Vec<u64>,
///     total: MemoSlot<u64>,
/// }
///
/// impl Identity for Invoice {
///     fn identity(&self) -> String {
///         self.id.to_string()
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> cachet::Result<()> {
/// let total: CachedAttribute<Invoice, (), u64> =
///     CachedAttribute::builder("total", |invoice: &Invoice, _: &()| {
///         async move { Ok(invoice.lines.iter().sum::<u64>()) }.boxed()
///     })
///     .cache(Arc::new(MemoryStore::new()))
///     .memo_slot(|invoice| &invoice.total)
///     .build()?;
///
/// let invoice = Invoice { id: 1, lines: vec![3, 4], total: MemoSlot::new() };
/// assert_eq!(total.get(&invoice, &()).await?, 7);
/// # Ok(())
/// # }
/// ```
pub struct CachedAttribute<I, A, T> {
    spec: AttributeSpec<I>,
    memo: Option<MemoAccessor<I, T>>,
    compute_fn: Arc<ComputeFn<I, A, T>>,
    label: String,
}

impl<I: Identity + 'static, A, T> CachedAttribute<I, A, T> {
    /// Start configuring an attribute keyed by the instance's own
    /// [`Identity`].
    pub fn builder<F>(name: impl Into<String>, compute: F) -> AttributeBuilder<I, A, T>
    where
        F: for<'a> Fn(&'a I, &'a A) -> BoxFuture<'a, std::result::Result<T, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        AttributeBuilder::new(name.into(), Identifier::own(), Arc::new(compute))
    }
}

impl<I, A, T> CachedAttribute<I, A, T> {
    /// Start configuring an attribute for a type without an [`Identity`]
    /// impl.
    pub fn builder_with_identifier<F>(
        name: impl Into<String>,
        identifier: Identifier<I>,
        compute: F,
    ) -> AttributeBuilder<I, A, T>
    where
        F: for<'a> Fn(&'a I, &'a A) -> BoxFuture<'a, std::result::Result<T, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        AttributeBuilder::new(name.into(), identifier, Arc::new(compute))
    }

    pub fn spec(&self) -> &AttributeSpec<I> {
        &self.spec
    }
}

impl<I, A, T> CachedAttribute<I, A, T>
where
    I: Sync,
    A: Serialize + Sync,
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// The attribute's value for `instance` and `args`.
    pub async fn get(&self, instance: &I, args: &A) -> Result<T> {
        self.fetch(instance, args).await.map(|fetched| fetched.value)
    }

    /// Like [`get`](Self::get), also reporting which layer answered.
    #[instrument(name = "cachet.fetch", skip_all, fields(attribute = %self.label))]
    pub async fn fetch(&self, instance: &I, args: &A) -> Result<Fetched<T>> {
        let arguments = Arguments::encode(args)?;
        let Some(slot) = self.memo.map(|memo| memo(instance)) else {
            return self.fetch_cached(instance, args, &arguments).await;
        };

        if arguments.is_empty()
            && let Some(value) = slot.get()
        {
            debug!("memo hit");
            metrics::counter!(telemetry::MEMO_HITS_TOTAL, "attribute" => self.label.clone())
                .increment(1);
            return Ok(Fetched {
                value,
                source: Source::Memo,
            });
        }

        let fetched = self.fetch_cached(instance, args, &arguments).await?;
        slot.put(fetched.value.clone());
        Ok(fetched)
    }

    /// Delete the store entry for `instance` and `args`.
    ///
    /// A no-op without a store. The memo slot is left as is.
    #[instrument(name = "cachet.invalidate", skip_all, fields(attribute = %self.label))]
    pub async fn invalidate(&self, instance: &I, args: &A) -> Result<()> {
        let Some(store) = self.spec.store.as_deref() else {
            return Ok(());
        };
        let key = self.key(instance, &Arguments::encode(args)?)?;
        store
            .delete(key.as_str())
            .await
            .inspect_err(|e| self.record_store_error(store, e))?;
        debug!(%key, "invalidated");
        metrics::counter!(telemetry::INVALIDATIONS_TOTAL, "attribute" => self.label.clone())
            .increment(1);
        Ok(())
    }

    /// Recompute the value and overwrite the store entry, whether or not
    /// one exists.
    ///
    /// A no-op without a store (the computation does not run). The memo
    /// slot is left as is.
    #[instrument(name = "cachet.refresh", skip_all, fields(attribute = %self.label))]
    pub async fn refresh(&self, instance: &I, args: &A) -> Result<()> {
        let Some(store) = self.spec.store.as_deref() else {
            return Ok(());
        };
        let key = self.key(instance, &Arguments::encode(args)?)?;
        let value = self.compute(instance, args).await?;
        store
            .set(key.as_str(), serde_json::to_value(&value)?, self.spec.ttl)
            .await
            .inspect_err(|e| self.record_store_error(store, e))?;
        debug!(%key, ttl = ?self.spec.ttl, "refreshed");
        metrics::counter!(telemetry::REFRESHES_TOTAL, "attribute" => self.label.clone())
            .increment(1);
        Ok(())
    }

    /// The store key a call with `args` on `instance` uses.
    pub fn key_for(&self, instance: &I, args: &A) -> Result<CacheKey> {
        self.key(instance, &Arguments::encode(args)?)
    }

    /// Store layer: get-or-compute through the store, or compute live
    /// when no store is configured.
    async fn fetch_cached(&self, instance: &I, args: &A, arguments: &Arguments) -> Result<Fetched<T>> {
        let Some(store) = self.spec.store.as_deref() else {
            let value = self.compute(instance, args).await?;
            return Ok(Fetched {
                value,
                source: Source::Live,
            });
        };

        let key = self.key(instance, arguments)?;
        let recompute: Recompute<'_> = async move {
            let value = self.compute(instance, args).await?;
            Ok::<_, CachetError>(serde_json::to_value(&value)?)
        }
        .boxed();

        let lookup = store
            .get(key.as_str(), self.spec.ttl, recompute)
            .await
            .inspect_err(|e| self.record_store_error(store, e))?;

        if lookup.hit {
            debug!(%key, "cache hit");
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "attribute" => self.label.clone())
                .increment(1);
        } else {
            debug!(%key, "cache miss");
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "attribute" => self.label.clone())
                .increment(1);
        }

        let value = serde_json::from_value(lookup.value).map_err(|source| {
            warn!(%key, error = %source, "cached value does not decode");
            CachetError::Decode {
                key: key.into_string(),
                source,
            }
        })?;
        Ok(Fetched {
            value,
            source: Source::Store { hit: lookup.hit },
        })
    }

    fn key(&self, instance: &I, arguments: &Arguments) -> Result<CacheKey> {
        let identity = self.spec.identifier.resolve(instance)?;
        Ok(CacheKey::build(
            &self.spec.subject,
            &self.spec.name,
            self.spec.scope,
            &identity,
            arguments,
        ))
    }

    /// Run the wrapped computation once, recording its outcome.
    async fn compute(&self, instance: &I, args: &A) -> Result<T> {
        let start = Instant::now();
        let result = (self.compute_fn)(instance, args).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::COMPUTATIONS_TOTAL,
            "attribute" => self.label.clone(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::COMPUTE_DURATION_SECONDS,
            "attribute" => self.label.clone(),
        )
        .record(start.elapsed().as_secs_f64());
        result.map_err(CachetError::Compute)
    }

    fn record_store_error(&self, store: &dyn CacheStore, error: &CachetError) {
        if !error.is_cache_unavailable() {
            return;
        }
        warn!(store = store.name(), error = %error, "cache store failed");
        metrics::counter!(telemetry::STORE_ERRORS_TOTAL,
            "attribute" => self.label.clone(),
            "store" => store.name().to_owned(),
        )
        .increment(1);
    }
}
