//! Cache blob persistence

use std::path::PathBuf;

use cloud_console::cache::SortBy;
use cloud_console::filesys::file::File;
use cloud_console::storage::{BlobStore, FileBlobStore, MemoryBlobStore};

use crate::fixtures::*;

fn temp_file(name: &str) -> File {
    let path: PathBuf = std::env::temp_dir()
        .join(format!("cloud-console-blob-{}", std::process::id()))
        .join(name);
    File::new(path)
}

#[tokio::test]
async fn test_missing_file_loads_nothing() {
    let store = FileBlobStore::new(temp_file("missing.json"));
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_file_store_roundtrips_session_blob() {
    let (cloud, _remote) = logged_in().await;
    let file = temp_file("cache.json");
    let store = FileBlobStore::new(file.clone());

    store.save(&cloud.save_cache_blob().unwrap()).await.unwrap();
    let blob = store.load().await.unwrap().unwrap();

    let (restored, _) = new_cloud();
    restored.load_cache_blob(&blob).unwrap();
    assert_eq!(restored.vapps(SortBy::Name), cloud.vapps(SortBy::Name));
    assert_eq!(restored.vms().len(), 2);
    assert!(restored.catalog().is_complete());

    file.delete().await.unwrap();
}

#[test]
fn test_memory_store_keeps_latest_blob() {
    let store = MemoryBlobStore::new();
    tokio_test::block_on(async {
        assert_eq!(store.load().await.unwrap(), None);
        store.save("one").await.unwrap();
        store.save("two").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("two"));
    });
}

#[test]
fn test_corrupt_blob_is_rejected() {
    let (cloud, _) = new_cloud();
    assert!(cloud.load_cache_blob("{not json").is_err());
    assert!(cloud.vapps(SortBy::Name).is_empty());
}
