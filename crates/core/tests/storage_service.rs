//! Namespace-level behaviour of `StorageService` over the in-memory backend.

use async_trait::async_trait;
use koderstore_core::contents::{
    ContentsApi, DeleteOutcome, DeleteRequest, MemoryContents, PutOutcome, PutRequest,
    RemoteContents,
};
use koderstore_core::{
    AdminSet, AuthorizationGate, FileKind, NamespaceAccess, Principal, PrincipalId,
    StorageError, StorageResult, StorageService, UsageSeverity,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts remote calls so tests can assert validation happens before any of them.
#[derive(Default)]
struct CountingContents {
    inner: MemoryContents,
    calls: AtomicUsize,
}

impl CountingContents {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentsApi for CountingContents {
    async fn get(&self, path: &str) -> StorageResult<Option<RemoteContents>> {
        self.tick();
        self.inner.get(path).await
    }

    async fn get_raw(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        self.tick();
        self.inner.get_raw(path).await
    }

    async fn put(&self, path: &str, request: &PutRequest) -> StorageResult<PutOutcome> {
        self.tick();
        self.inner.put(path, request).await
    }

    async fn delete(&self, path: &str, request: &DeleteRequest) -> StorageResult<DeleteOutcome> {
        self.tick();
        self.inner.delete(path, request).await
    }

    async fn create_container(&self) -> StorageResult<()> {
        self.tick();
        self.inner.create_container().await
    }
}

/// Slows every `get` down and records how many were in flight at once.
#[derive(Default)]
struct InFlightContents {
    inner: MemoryContents,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightContents {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn reset_peak(&self) {
        self.peak.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentsApi for InFlightContents {
    async fn get(&self, path: &str) -> StorageResult<Option<RemoteContents>> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = self.inner.get(path).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get_raw(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get_raw(path).await
    }

    async fn put(&self, path: &str, request: &PutRequest) -> StorageResult<PutOutcome> {
        self.inner.put(path, request).await
    }

    async fn delete(&self, path: &str, request: &DeleteRequest) -> StorageResult<DeleteOutcome> {
        self.inner.delete(path, request).await
    }

    async fn create_container(&self) -> StorageResult<()> {
        self.inner.create_container().await
    }
}

const ADMIN: &str = "100";

fn principal(id: &str) -> Principal {
    Principal::new(PrincipalId::new(id).unwrap(), format!("user{id}"))
}

fn id(id: &str) -> PrincipalId {
    PrincipalId::new(id).unwrap()
}

fn service() -> (Arc<CountingContents>, StorageService) {
    let backend = Arc::new(CountingContents::default());
    let gate = AuthorizationGate::new(AdminSet::new([id(ADMIN)]));
    (backend.clone(), StorageService::new(backend, gate, 2))
}

#[tokio::test]
async fn never_written_namespace_is_empty() {
    let (_, svc) = service();
    let alice = principal("1");
    let items = svc
        .list_namespace(Some(&alice), &NamespaceAccess::own(), None)
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn write_then_read_returns_identical_bytes() {
    let (_, svc) = service();
    let alice = principal("1");
    let bytes: Vec<u8> = vec![0x00, 0xFF, 0xC3, 0x28, 0xA0, 0xA1, 0xE2, 0x28, 0xA1, 0x0A];

    let receipt = svc.write_file(Some(&alice), "raw.bin", &bytes, None).await.unwrap();
    assert!(receipt.created);
    assert_eq!(receipt.path, "users/1/raw.bin");

    let download = svc
        .read_file(Some(&alice), &NamespaceAccess::own(), "raw.bin")
        .await
        .unwrap();
    assert_eq!(download.bytes, bytes);
    assert_eq!(download.content_hash, receipt.content_hash);
    assert_eq!(download.content_type, "application/octet-stream");
}

#[tokio::test]
async fn saving_without_token_updates_in_place() {
    let (_, svc) = service();
    let alice = principal("1");

    svc.write_file(Some(&alice), "notes.md", b"# v1", None).await.unwrap();
    let second = svc.write_file(Some(&alice), "notes.md", b"# v2", None).await.unwrap();
    assert!(!second.created);

    let download = svc
        .read_file(Some(&alice), &NamespaceAccess::own(), "notes.md")
        .await
        .unwrap();
    assert_eq!(download.bytes, b"# v2");
    assert_eq!(download.content_type, "text/markdown");
}

#[tokio::test]
async fn stale_token_never_overwrites() {
    let (_, svc) = service();
    let alice = principal("1");

    let first = svc.write_file(Some(&alice), "a.txt", b"one", None).await.unwrap();
    // Another writer updates the file.
    svc.write_file(Some(&alice), "a.txt", b"two", Some(&first.content_hash))
        .await
        .unwrap();

    let stale = svc
        .write_file(Some(&alice), "a.txt", b"three", Some(&first.content_hash))
        .await;
    assert!(matches!(stale, Err(StorageError::Conflict(_))));

    let download = svc
        .read_file(Some(&alice), &NamespaceAccess::own(), "a.txt")
        .await
        .unwrap();
    assert_eq!(download.bytes, b"two");
}

#[tokio::test]
async fn cross_namespace_reads_need_admin() {
    let (_, svc) = service();
    let alice = principal("1");
    let bob = principal("2");
    let admin = principal(ADMIN);
    svc.write_file(Some(&alice), "secret.txt", b"s", None).await.unwrap();

    let not_admin_flag = NamespaceAccess {
        requested: Some(id("1")),
        admin_request: false,
    };
    assert!(matches!(
        svc.read_file(Some(&bob), &not_admin_flag, "secret.txt").await,
        Err(StorageError::Forbidden(_))
    ));
    assert!(matches!(
        svc.read_file(Some(&bob), &NamespaceAccess::admin(id("1")), "secret.txt").await,
        Err(StorageError::Forbidden(_))
    ));

    let download = svc
        .read_file(Some(&admin), &NamespaceAccess::admin(id("1")), "secret.txt")
        .await
        .unwrap();
    assert_eq!(download.bytes, b"s");

    let listing = svc
        .list_namespace(Some(&admin), &NamespaceAccess::admin(id("1")), None)
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
}

#[tokio::test]
async fn validation_failures_make_no_remote_calls() {
    let (backend, svc) = service();
    let alice = principal("1");

    assert!(matches!(
        svc.write_file(None, "a.txt", b"x", None).await,
        Err(StorageError::Unauthenticated)
    ));
    assert!(matches!(
        svc.write_file(Some(&alice), "../2/a.txt", b"x", None).await,
        Err(StorageError::InvalidPath(_))
    ));
    assert!(matches!(
        svc.read_file(Some(&alice), &NamespaceAccess::own(), "/etc/passwd").await,
        Err(StorageError::InvalidPath(_))
    ));
    assert!(matches!(
        svc.list_namespace(Some(&alice), &NamespaceAccess::admin(id("2")), None).await,
        Err(StorageError::Forbidden(_))
    ));
    assert!(matches!(
        svc.list_all_namespaces(Some(&alice)).await,
        Err(StorageError::Forbidden(_))
    ));

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn usage_counts_top_level_files() {
    let (_, svc) = service();
    let alice = principal("1");
    svc.write_file(Some(&alice), "one.bin", &vec![0u8; 1_048_576], None)
        .await
        .unwrap();
    svc.write_file(Some(&alice), "two.bin", &vec![1u8; 2_097_152], None)
        .await
        .unwrap();
    svc.write_file(Some(&alice), "nested/three.bin", &[7u8; 512], None)
        .await
        .unwrap();

    let usage = svc.get_usage(Some(&alice), &NamespaceAccess::own()).await.unwrap();
    assert_eq!(usage.used_bytes, 3_145_728);
    assert_eq!(usage.quota_bytes, 1024 * 1024 * 1024);
    assert_eq!(usage.percentage(), 0);
    assert_eq!(usage.severity(), UsageSeverity::Normal);
}

#[tokio::test]
async fn sub_directories_list_one_level_at_a_time() {
    let (_, svc) = service();
    let alice = principal("1");
    svc.write_file(Some(&alice), "photos/2024/cat.png", b"png", None)
        .await
        .unwrap();

    let root = svc
        .list_namespace(Some(&alice), &NamespaceAccess::own(), None)
        .await
        .unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].kind, FileKind::Directory);

    let year = svc
        .list_namespace(Some(&alice), &NamespaceAccess::own(), Some("photos/2024"))
        .await
        .unwrap();
    assert_eq!(year.len(), 1);
    assert_eq!(year[0].name, "cat.png");
    assert!(!year[0].name.contains('/'));
}

#[tokio::test]
async fn delete_removes_file_and_requires_existing() {
    let (_, svc) = service();
    let alice = principal("1");
    svc.write_file(Some(&alice), "a.txt", b"x", None).await.unwrap();

    svc.delete_file(Some(&alice), "a.txt", None).await.unwrap();
    assert!(matches!(
        svc.delete_file(Some(&alice), "a.txt", None).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(svc
        .list_namespace(Some(&alice), &NamespaceAccess::own(), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn admin_overview_summarises_every_namespace() {
    let (_, svc) = service();
    for (user, files) in [("3", 1usize), ("1", 2), ("2", 3)] {
        let p = principal(user);
        for n in 0..files {
            svc.write_file(Some(&p), &format!("f{n}.txt"), b"1234", None)
                .await
                .unwrap();
        }
    }

    let admin = principal(ADMIN);
    let summaries = svc.list_all_namespaces(Some(&admin)).await.unwrap();
    let ids: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3"]);
    assert_eq!(summaries[1].file_count, 3);
    assert_eq!(summaries[1].total_size, 12);
    assert_eq!(summaries[1].username, "User 2");
}

#[tokio::test]
async fn admin_overview_of_empty_store_is_empty() {
    let (_, svc) = service();
    let admin = principal(ADMIN);
    assert!(svc.list_all_namespaces(Some(&admin)).await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_overview_lists_namespaces_concurrently_within_limit() {
    const LIMIT: usize = 3;
    let backend = Arc::new(InFlightContents::default());
    let gate = AuthorizationGate::new(AdminSet::new([id(ADMIN)]));
    let svc = StorageService::new(backend.clone(), gate, LIMIT);

    for user in 1..=10 {
        let p = principal(&user.to_string());
        svc.write_file(Some(&p), "a.txt", b"abc", None).await.unwrap();
    }
    backend.reset_peak();

    let admin = principal(ADMIN);
    let summaries = svc.list_all_namespaces(Some(&admin)).await.unwrap();
    assert_eq!(summaries.len(), 10);
    assert!(backend.peak() > 1, "listings ran one at a time");
    assert!(backend.peak() <= LIMIT, "peak {} exceeds limit", backend.peak());
}
