use std::sync::Arc;

use hatch_storage::{FilesystemPackageStore, PackageStore};
use hatch_types::{InstalledPackageRecord, PackageManifest};
use tempfile::TempDir;

fn record(id: &str, version: &str, code: &str) -> InstalledPackageRecord {
    InstalledPackageRecord::new(PackageManifest::new(id, version), code.to_string())
}

#[tokio::test]
async fn test_records_survive_reopen_through_trait_object() {
    let dir = TempDir::new().unwrap();

    {
        let store: Arc<dyn PackageStore> = Arc::new(FilesystemPackageStore::new(dir.path()));
        store.put(&record("b.pkg", "1.0.0", "b")).await.unwrap();
        store.put(&record("a.pkg", "1.0.0", "a")).await.unwrap();
        store.set_enabled("b.pkg", false).await.unwrap();
    }

    let store: Arc<dyn PackageStore> = Arc::new(FilesystemPackageStore::new(dir.path()));
    let ids: Vec<String> = store
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["a.pkg", "b.pkg"]);
    assert!(!store.get("b.pkg").await.unwrap().unwrap().enabled);
}

#[tokio::test]
async fn test_reinstall_replaces_without_history() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemPackageStore::new(dir.path());

    store.put(&record("a.pkg", "1.0.0", "old")).await.unwrap();
    store.put(&record("a.pkg", "2.0.0", "new")).await.unwrap();

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].version, "2.0.0");
    assert_eq!(all[0].code, "new");
}

#[tokio::test]
async fn test_concurrent_puts_of_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FilesystemPackageStore::new(dir.path()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .put(&record(&format!("pkg.{i}"), "1.0.0", "code"))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.get_all().await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_delete_missing_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemPackageStore::new(dir.path());

    assert!(!store.delete("never.installed").await.unwrap());
    assert!(store.get("never.installed").await.unwrap().is_none());
}
