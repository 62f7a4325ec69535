//! Builder for cached attributes

use std::sync::Arc;
use std::time::Duration;

use super::{AttributeSpec, CachedAttribute, ComputeFn, DEFAULT_TTL, MemoAccessor};
use crate::config::AttributeDefaults;
use crate::error::BoxError;
use crate::identity::Identifier;
use crate::key::{self, Scope, type_path};
use crate::store::{self, CacheStore};
use crate::{CachetError, Result};

enum StoreChoice {
    /// Whatever [`store::default_store()`] returns at build time.
    Default,
    Explicit(Arc<dyn CacheStore>),
    Disabled,
}

/// Configures a [`CachedAttribute`].
///
/// Defaults: TTL 300 s, the process-wide default store, the instance's own
/// identity, memoization on. Memoization needs a memo slot; either supply
/// one with [`memo_slot`](Self::memo_slot) or turn it off with
/// [`memoize(false)`](Self::memoize).
pub struct AttributeBuilder<I, A, T> {
    name: String,
    subject: Option<String>,
    scope: Scope,
    ttl: Duration,
    store: StoreChoice,
    identifier: Identifier<I>,
    memoize: bool,
    memo: Option<MemoAccessor<I, T>>,
    compute: Arc<ComputeFn<I, A, T>>,
}

impl<I, A, T> AttributeBuilder<I, A, T> {
    pub(super) fn new(name: String, identifier: Identifier<I>, compute: Arc<ComputeFn<I, A, T>>) -> Self {
        Self {
            name,
            subject: None,
            scope: Scope::Instance,
            ttl: DEFAULT_TTL,
            store: StoreChoice::Default,
            identifier,
            memoize: true,
            memo: None,
            compute,
        }
    }

    /// Set the time-to-live of store entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use this store instead of the process-wide default.
    pub fn cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = StoreChoice::Explicit(store);
        self
    }

    /// Disable caching: every call not served by the memo slot computes.
    pub fn no_cache(mut self) -> Self {
        self.store = StoreChoice::Disabled;
        self
    }

    /// Replace the identifier used for zero-argument keys.
    pub fn identifier<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        self.identifier = Identifier::custom(f);
        self
    }

    /// Enable or disable memoization (default: enabled).
    pub fn memoize(mut self, enabled: bool) -> Self {
        self.memoize = enabled;
        self
    }

    /// Where the instance keeps this attribute's memo slot.
    pub fn memo_slot(mut self, accessor: MemoAccessor<I, T>) -> Self {
        self.memo = Some(accessor);
        self
    }

    /// Override the key subject (default: the full type path of `I`).
    ///
    /// Segments are separated by `::`; empty segments and `self` segments
    /// are rejected at build time.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Mark this as a type-level attribute (`<Type>::self::<attr>` keys).
    pub fn type_level(mut self) -> Self {
        self.scope = Scope::Type;
        self
    }

    /// Apply TTL and memoization defaults from configuration.
    pub fn defaults(mut self, defaults: &AttributeDefaults) -> Self {
        self.ttl = defaults.ttl();
        self.memoize = defaults.memoize;
        self
    }

    pub fn build(self) -> Result<CachedAttribute<I, A, T>> {
        if self.name.is_empty() {
            return Err(CachetError::Configuration(
                "attribute name must not be empty".to_string(),
            ));
        }
        if self.name.contains("::") {
            return Err(CachetError::Configuration(format!(
                "attribute name '{}' must not contain '::'",
                self.name
            )));
        }

        let memo = match (self.memoize, self.memo) {
            (true, Some(accessor)) => Some(accessor),
            (true, None) => {
                return Err(CachetError::Configuration(format!(
                    "attribute '{}' memoizes but has no memo slot; \
                     call .memo_slot(..) or .memoize(false)",
                    self.name
                )));
            }
            (false, _) => None,
        };

        let store = match self.store {
            StoreChoice::Default => store::default_store(),
            StoreChoice::Explicit(store) => Some(store),
            StoreChoice::Disabled => None,
        };

        let subject = self
            .subject
            .unwrap_or_else(|| type_path::<I>().to_string());
        key::check_subject(&subject)?;

        let spec = AttributeSpec {
            name: self.name,
            subject,
            scope: self.scope,
            ttl: self.ttl,
            store,
            identifier: self.identifier,
            memoize: memo.is_some(),
        };
        if spec.store.is_none() {
            tracing::debug!(attribute = %spec.label(), "no cache store, computing live");
        }

        Ok(CachedAttribute {
            label: spec.label(),
            spec,
            memo,
            compute_fn: self.compute,
        })
    }
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;

    use super::*;
    use crate::memo::MemoSlot;
    use crate::{Identity, MemoryStore};

    struct Widget {
        sku: MemoSlot<String>,
    }

    impl Identity for Widget {
        fn identity(&self) -> String {
            "w-1".to_string()
        }
    }

    fn sku() -> AttributeBuilder<Widget, (), String> {
        CachedAttribute::builder("sku", |_: &Widget, _: &()| {
            async { Ok("SKU-1".to_string()) }.boxed()
        })
    }

    #[test]
    fn defaults() {
        let attr = sku()
            .cache(Arc::new(MemoryStore::new()))
            .memo_slot(|w| &w.sku)
            .build()
            .unwrap();
        let spec = attr.spec();
        assert_eq!(spec.name(), "sku");
        assert_eq!(spec.subject(), std::any::type_name::<Widget>());
        assert!(spec.subject().ends_with("::tests::Widget"));
        assert_eq!(spec.scope(), Scope::Instance);
        assert_eq!(spec.ttl(), Duration::from_secs(300));
        assert!(spec.memoize());
        assert_eq!(spec.store().map(|s| s.name()), Some("memory"));
    }

    #[test]
    fn memoize_without_slot_is_rejected() {
        let err = sku().no_cache().build().unwrap_err();
        assert!(matches!(err, CachetError::Configuration(_)));
        assert!(err.to_string().contains("memo slot"));
    }

    #[test]
    fn memoize_false_ignores_slot() {
        let attr = sku()
            .no_cache()
            .memo_slot(|w| &w.sku)
            .memoize(false)
            .build()
            .unwrap();
        assert!(!attr.spec().memoize());
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = CachedAttribute::builder("", |_: &Widget, _: &()| {
            async { Ok(String::new()) }.boxed()
        })
        .memoize(false)
        .build()
        .unwrap_err();
        assert!(matches!(err, CachetError::Configuration(_)));
    }

    #[test]
    fn separator_in_name_is_rejected() {
        let err = CachedAttribute::builder("a::b", |_: &Widget, _: &()| {
            async { Ok(String::new()) }.boxed()
        })
        .memoize(false)
        .build()
        .unwrap_err();
        assert!(err.to_string().contains("'::'"));
    }

    #[test]
    fn subject_with_type_level_marker_is_rejected() {
        let err = sku()
            .no_cache()
            .memoize(false)
            .subject("Widget::self")
            .build()
            .unwrap_err();
        assert!(matches!(err, CachetError::Configuration(_)));
        assert!(err.to_string().contains("Widget::self"));
    }

    #[test]
    fn empty_subject_is_rejected() {
        for subject in ["", "Widget::", "a::::b"] {
            let err = sku()
                .no_cache()
                .memoize(false)
                .subject(subject)
                .build()
                .unwrap_err();
            assert!(matches!(err, CachetError::Configuration(_)), "{subject}");
        }
    }

    #[test]
    fn overrides() {
        let attr = sku()
            .no_cache()
            .memoize(false)
            .ttl(Duration::from_secs(5))
            .subject("Catalog")
            .type_level()
            .build()
            .unwrap();
        let spec = attr.spec();
        assert_eq!(spec.subject(), "Catalog");
        assert_eq!(spec.scope(), Scope::Type);
        assert_eq!(spec.ttl(), Duration::from_secs(5));
        assert!(spec.store().is_none());
        assert_eq!(spec.label(), "Catalog::sku");
    }

    #[test]
    fn custom_identifier_replaces_own_identity() {
        let attr = sku()
            .no_cache()
            .memoize(false)
            .identifier(|_| Ok("custom".to_string()))
            .build()
            .unwrap();
        let widget = Widget { sku: MemoSlot::new() };
        assert_eq!(attr.spec().identifier().resolve(&widget).unwrap(), "custom");
    }

    #[test]
    fn config_defaults_apply() {
        let defaults = AttributeDefaults {
            ttl_secs: 1,
            memoize: false,
        };
        let attr = sku().no_cache().defaults(&defaults).build().unwrap();
        assert_eq!(attr.spec().ttl(), Duration::from_secs(1));
        assert!(!attr.spec().memoize());
    }
}
