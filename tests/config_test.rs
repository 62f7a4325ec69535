use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;

use cachet::{CachedAttribute, CachetError, Config, Identity, MemoSlot, MemoryStore, Source};

struct Report {
    id: u64,
    summary: MemoSlot<String>,
}

impl Identity for Report {
    fn identity(&self) -> String {
        self.id.to_string()
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_from_file() {
    let file = write_config(
        r#"
        [attributes]
        ttl_secs = 1
        memoize = false

        [memory_store]
        max_entries = 16
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.attributes.ttl(), Duration::from_secs(1));
    assert!(!config.attributes.memoize);
    assert_eq!(config.memory_store.max_entries, 16);
}

#[test]
fn malformed_file_is_a_configuration_error() {
    let file = write_config("[attributes\nttl_secs = 1");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, CachetError::Configuration(_)));
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[tokio::test]
async fn configured_attribute_uses_file_settings() {
    let file = write_config(
        r#"
        [attributes]
        ttl_secs = 42
        memoize = false
        "#,
    );
    let config = Config::load(file.path()).unwrap();
    let store = Arc::new(MemoryStore::with_config(&config.memory_store));

    let summary: CachedAttribute<Report, (), String> =
        CachedAttribute::builder("summary", |r: &Report, _: &()| {
            async move { Ok(format!("report {}", r.id)) }.boxed()
        })
        .cache(store.clone())
        .memo_slot(|r| &r.summary)
        .defaults(&config.attributes)
        .build()
        .unwrap();

    let report = Report {
        id: 4,
        summary: MemoSlot::new(),
    };
    summary.get(&report, &()).await.unwrap();
    let second = summary.fetch(&report, &()).await.unwrap();

    // memoize = false: the slot stays empty and the store answers.
    assert_eq!(second.source, Source::Store { hit: true });
    assert!(!report.summary.is_populated());

    let key = summary.key_for(&report, &()).unwrap();
    let info = store.entry_info(key.as_str()).await.unwrap();
    assert_eq!(info.ttl, Duration::from_secs(42));
}
