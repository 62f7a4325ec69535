//! The process-wide default store. Kept in its own test binary because the
//! registry can only be installed once per process.

use std::sync::Arc;

use futures_util::FutureExt;

use cachet::store::{self, CacheStore};
use cachet::{CachedAttribute, CachetError, Identity, MemoryStore, Source};

struct Tenant {
    id: u32,
}

impl Identity for Tenant {
    fn identity(&self) -> String {
        self.id.to_string()
    }
}

fn plan() -> cachet::AttributeBuilder<Tenant, (), String> {
    CachedAttribute::builder("plan", |t: &Tenant, _: &()| {
        async move { Ok(format!("plan-{}", t.id)) }.boxed()
    })
    .memoize(false)
}

#[tokio::test]
async fn default_store_lifecycle() {
    // Before installation: attributes compute live.
    assert!(store::default_store().is_none());
    let early = plan().build().unwrap();
    assert!(early.spec().store().is_none());
    let live = early.fetch(&Tenant { id: 1 }, &()).await.unwrap();
    assert_eq!(live.source, Source::Live);

    let memory = Arc::new(MemoryStore::new());
    store::install_default(memory.clone()).unwrap();

    let second = store::install_default(Arc::new(MemoryStore::new())).unwrap_err();
    assert!(matches!(second, CachetError::Configuration(_)));
    assert_eq!(store::default_store().map(|s| s.name().to_owned()).as_deref(), Some("memory"));

    // Built after installation: the default store is picked up.
    let attr = plan().build().unwrap();
    let tenant = Tenant { id: 9 };
    let first = attr.fetch(&tenant, &()).await.unwrap();
    let again = attr.fetch(&tenant, &()).await.unwrap();
    assert_eq!(first.source, Source::Store { hit: false });
    assert_eq!(again.source, Source::Store { hit: true });
    assert_eq!(again.value, "plan-9");

    let key = attr.key_for(&tenant, &()).unwrap();
    assert!(memory.peek(key.as_str()).await.is_some());

    // Built before installation: stays uncached.
    let still_live = early.fetch(&tenant, &()).await.unwrap();
    assert_eq!(still_live.source, Source::Live);

    // Opting out ignores the default.
    let opted_out = plan().no_cache().build().unwrap();
    assert!(opted_out.spec().store().is_none());
}
