//! Unit tests for the catalog service: publish, read, resolve, discover.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use sha2::{Digest, Sha256};
use tooldist_cli::application::services::body::from_bytes;
use tooldist_cli::application::services::catalog::Catalog;
use tooldist_cli::domain::{ErrorKind, merge};
use tooldist_common::store_keys::{DEFAULT_NAMESPACE, INDEX_PATH, listing_path, tools_key};
use tooldist_common::{Artifact, ArtifactDescriptor, product_id};

use crate::mocks::{MemoryStore, SilentReporter, binary, fixed_time, seed};

fn catalog(store: &MemoryStore) -> Catalog<MemoryStore> {
    Catalog::new(store.clone(), DEFAULT_NAMESPACE)
}

fn descriptor(b: &str, size: u64, sha256: &str) -> ArtifactDescriptor {
    let binary = binary(b);
    ArtifactDescriptor {
        release: binary.series.clone(),
        version: binary.number.clone(),
        arch: binary.arch.clone(),
        size,
        path: format!("releases/tooldist-{b}.tgz"),
        resolved_url: None,
        file_type: "tar.gz".into(),
        sha256: sha256.into(),
    }
}

fn listing_key(series: &str, arch: &str) -> String {
    tools_key(&listing_path(
        &product_id(DEFAULT_NAMESPACE, series, arch).unwrap(),
    ))
}

// ── Merge ─────────────────────────────────────────────────────────────────────

#[test]
fn test_merge_prefers_resolved_new_and_keeps_old_only_entries() {
    let new = vec![descriptor("1.0.0-jammy-amd64", 50, "aa")];
    let old = vec![
        descriptor("1.0.0-jammy-amd64", 0, ""),
        descriptor("2.0.0-jammy-amd64", 100, "bb"),
    ];

    let merged = merge(new, old);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].binary(), binary("1.0.0-jammy-amd64"));
    assert_eq!(merged[0].size, 50);
    assert_eq!(merged[0].sha256, "aa");
    assert_eq!(merged[1].binary(), binary("2.0.0-jammy-amd64"));
    assert_eq!(merged[1].size, 100);
}

#[test]
fn test_merge_resolved_old_replaces_unresolved_new() {
    let merged = merge(
        vec![descriptor("1.0.0-jammy-amd64", 0, "")],
        vec![descriptor("1.0.0-jammy-amd64", 70, "cc")],
    );
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].size, 70);
    assert_eq!(merged[0].sha256, "cc");
}

#[test]
fn test_merge_drops_carried_urls() {
    let mut old = descriptor("1.0.0-jammy-amd64", 10, "dd");
    old.resolved_url = Some("file:///elsewhere".into());
    let merged = merge(Vec::new(), vec![old]);
    assert_eq!(merged[0].resolved_url, None);
}

// ── Read ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_without_index_is_empty() {
    let store = MemoryStore::new();
    assert!(catalog(&store).read().await.expect("read").is_empty());
}

#[tokio::test]
async fn test_published_catalog_reads_back_with_locations() {
    let store = MemoryStore::new();
    let published = seed(
        &store,
        &["1.0.0-jammy-amd64", "1.0.0-jammy-arm64", "1.1.0-noble-amd64"],
    )
    .await;

    let read = catalog(&store).read().await.expect("read");

    assert_eq!(read.len(), 3);
    for desc in &read {
        let original = published
            .iter()
            .find(|p| p.binary() == desc.binary())
            .expect("published");
        assert_eq!(desc.size, original.size);
        assert_eq!(desc.sha256, original.sha256);
        assert_eq!(
            desc.resolved_url.as_deref(),
            Some(store.url_of(&desc.path).as_str())
        );
    }
    assert!(store.object(&tools_key(INDEX_PATH)).is_some());
    assert!(store.object(&listing_key("jammy", "arm64")).is_some());
}

#[tokio::test]
async fn test_index_naming_missing_listing_is_malformed() {
    let store = MemoryStore::new();
    seed(&store, &["1.0.0-jammy-amd64"]).await;
    store.remove(&listing_key("jammy", "amd64"));

    let err = catalog(&store).read().await.expect_err("missing listing");
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_listing_for_wrong_product_is_malformed() {
    let store = MemoryStore::new();
    seed(&store, &["1.0.0-jammy-amd64", "1.0.0-jammy-arm64"]).await;
    let amd64 = store.object(&listing_key("jammy", "amd64")).unwrap();
    store.insert(&listing_key("jammy", "arm64"), amd64);

    let err = catalog(&store).read().await.expect_err("wrong product");
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_corrupt_index_is_malformed() {
    let store = MemoryStore::new();
    store.insert(&tools_key(INDEX_PATH), b"{not json".to_vec());
    let err = catalog(&store).read().await.expect_err("corrupt");
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_unreadable_index_is_transient() {
    let store = MemoryStore::new();
    store.fail_on(&tools_key(INDEX_PATH));
    let err = catalog(&store).read().await.expect_err("failing store");
    assert_eq!(err.kind(), ErrorKind::Transient);
}

// ── Publish ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_publish_merges_with_existing_catalog() {
    let store = MemoryStore::new();
    seed(&store, &["1.0.0-jammy-amd64"]).await;
    seed(&store, &["1.1.0-jammy-amd64"]).await;

    let read = catalog(&store).read().await.expect("read");
    let binaries: Vec<String> = read.iter().map(|d| d.binary().to_string()).collect();
    assert_eq!(binaries, ["1.0.0-jammy-amd64", "1.1.0-jammy-amd64"]);
}

#[tokio::test]
async fn test_publish_is_idempotent() {
    let store = MemoryStore::new();
    let first = seed(&store, &["1.0.0-jammy-amd64"]).await;
    let index = store.object(&tools_key(INDEX_PATH));
    let second = seed(&store, &["1.0.0-jammy-amd64"]).await;

    assert_eq!(first, second);
    assert_eq!(index, store.object(&tools_key(INDEX_PATH)));
}

#[tokio::test]
async fn test_publish_writes_nothing_when_read_fails() {
    let store = MemoryStore::new();
    store.fail_on(&tools_key(INDEX_PATH));
    let artifact = Artifact::unresolved(binary("1.0.0-jammy-amd64"));

    let err = catalog(&store)
        .publish(&[artifact], false, fixed_time(), &SilentReporter)
        .await
        .expect_err("read failure");

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_publish_unknown_series_is_precondition() {
    let store = MemoryStore::new();
    let artifact = Artifact {
        size: 1,
        sha256: "ee".into(),
        ..Artifact::unresolved(binary("1.0.0-nosuch-amd64"))
    };
    let err = catalog(&store)
        .publish(&[artifact], false, fixed_time(), &SilentReporter)
        .await
        .expect_err("unknown series");
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(store.object(&tools_key(INDEX_PATH)).is_none());
}

// ── Upload, discover, resolve ─────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_records_size_and_digest() {
    let store = MemoryStore::new();
    let data = b"tarball bytes".to_vec();
    let expected = format!("{:x}", Sha256::digest(&data));

    let artifact = catalog(&store)
        .upload(
            &binary("1.0.0-jammy-amd64"),
            from_bytes(data.clone()),
            data.len() as u64,
        )
        .await
        .expect("upload");

    assert_eq!(artifact.size, data.len() as u64);
    assert_eq!(artifact.sha256, expected);
    assert_eq!(
        store.object("tools/releases/tooldist-1.0.0-jammy-amd64.tgz"),
        Some(data)
    );
}

#[tokio::test]
async fn test_upload_short_body_is_size_mismatch() {
    let store = MemoryStore::new();
    let err = catalog(&store)
        .upload(&binary("1.0.0-jammy-amd64"), from_bytes(b"abc".to_vec()), 10)
        .await
        .expect_err("short body");
    assert!(matches!(err, tooldist_cli::domain::ToolsError::SizeMismatch { .. }));
}

#[tokio::test]
async fn test_upload_digests_every_chunk() {
    let store = MemoryStore::new();
    let chunks: Vec<std::io::Result<Vec<u8>>> =
        vec![Ok(b"tar".to_vec()), Ok(b"ball ".to_vec()), Ok(b"bytes".to_vec())];
    let body: tooldist_cli::application::ports::ByteStream =
        Box::pin(futures_util::stream::iter(chunks));

    let artifact = catalog(&store)
        .upload(&binary("1.0.0-jammy-amd64"), body, 13)
        .await
        .expect("upload");

    assert_eq!(artifact.size, 13);
    assert_eq!(artifact.sha256, format!("{:x}", Sha256::digest(b"tarball bytes")));
}

#[tokio::test]
async fn test_upload_broken_body_is_transient() {
    let store = MemoryStore::new();
    let chunks: Vec<std::io::Result<Vec<u8>>> =
        vec![Ok(b"tar".to_vec()), Err(std::io::Error::other("reset"))];
    let body: tooldist_cli::application::ports::ByteStream =
        Box::pin(futures_util::stream::iter(chunks));

    let err = catalog(&store)
        .upload(&binary("1.0.0-jammy-amd64"), body, 13)
        .await
        .expect_err("broken body");

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(store.object("tools/releases/tooldist-1.0.0-jammy-amd64.tgz"), None);
}

#[tokio::test]
async fn test_discover_then_resolve_fills_in_digests() {
    let store = MemoryStore::new();
    let data = b"existing tarball".to_vec();
    store.insert("tools/releases/tooldist-1.2.0-focal-amd64.tgz", data.clone());
    store.insert("tools/releases/README", b"not a tarball".to_vec());
    let catalog = catalog(&store);

    let found = catalog.discover(&SilentReporter).await.expect("discover");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].version, binary("1.2.0-focal-amd64"));
    assert_eq!(found[0].size, 0);

    let published = catalog
        .publish(&found, true, fixed_time(), &SilentReporter)
        .await
        .expect("publish");
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].size, data.len() as u64);
    assert_eq!(published[0].sha256, format!("{:x}", Sha256::digest(&data)));
}

#[tokio::test]
async fn test_resolve_missing_tarball_is_not_found() {
    let store = MemoryStore::new();
    let err = catalog(&store)
        .resolve_missing(&[descriptor("1.0.0-jammy-amd64", 0, "")])
        .await
        .expect_err("no tarball");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
