//! Wire-level tests for the GitHub backend against an in-process stand-in of the contents API.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::ACCEPT, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use koderstore_core::contents::{
    ContentsAdapter, ContentsApi, DeleteOutcome, DeleteRequest, GitHubContents, MemoryContents,
    PutOutcome, PutRequest,
};
use koderstore_core::{GitHubSettings, StorageError};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct FakeGitHub {
    store: MemoryContents,
    fail_status: AtomicU16,
    delay_ms: AtomicU64,
    garbage: AtomicBool,
}

impl FakeGitHub {
    fn with_store(store: MemoryContents) -> Self {
        Self {
            store,
            ..Default::default()
        }
    }

    async fn interfere(&self) -> Option<Response> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let status = self.fail_status.load(Ordering::SeqCst);
        if status != 0 {
            let status = StatusCode::from_u16(status).unwrap();
            return Some((status, "upstream failure").into_response());
        }
        if self.garbage.load(Ordering::SeqCst) {
            return Some((StatusCode::OK, "<html>definitely not json</html>").into_response());
        }
        None
    }
}

type Shared = Arc<FakeGitHub>;

async fn get_contents(
    State(fake): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = fake.interfere().await {
        return response;
    }
    let raw = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("raw"));
    if raw {
        return match fake.store.get_raw(&path).await.unwrap() {
            Some(bytes) => (StatusCode::OK, Bytes::from(bytes)).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        };
    }
    match fake.store.get(&path).await.unwrap() {
        Some(contents) => Json(contents).into_response(),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({"message": "Not Found"})))
            .into_response(),
    }
}

async fn put_contents(
    State(fake): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(request): Json<PutRequest>,
) -> Response {
    if let Some(response) = fake.interfere().await {
        return response;
    }
    match fake.store.put(&path, &request).await.unwrap() {
        PutOutcome::Written { sha } => (
            StatusCode::CREATED,
            Json(serde_json::json!({"content": {"path": path, "sha": sha}, "commit": {}})),
        )
            .into_response(),
        PutOutcome::Conflict => StatusCode::CONFLICT.into_response(),
        PutOutcome::ContainerMissing => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_contents(
    State(fake): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(request): Json<DeleteRequest>,
) -> Response {
    match fake.store.delete(&path, &request).await.unwrap() {
        DeleteOutcome::Deleted => StatusCode::OK.into_response(),
        DeleteOutcome::NotFound => StatusCode::NOT_FOUND.into_response(),
        DeleteOutcome::Conflict => StatusCode::CONFLICT.into_response(),
    }
}

async fn create_repo(State(fake): State<Shared>) -> StatusCode {
    let already = fake.store.container_creations() > 0;
    fake.store.create_container().await.unwrap();
    if already {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::CREATED
    }
}

async fn serve(fake: Shared) -> String {
    let app = Router::new()
        .route(
            "/repos/:owner/:repo/contents/*path",
            get(get_contents).put(put_contents).delete(delete_contents),
        )
        .route("/user/repos", post(create_repo))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client(fake: Shared, timeout: Duration) -> (GitHubContents, ContentsAdapter) {
    let url = serve(fake).await;
    let settings = GitHubSettings::new(url, "acme", "storage", "test-token").unwrap();
    let contents = GitHubContents::new(&settings, timeout).unwrap();
    let adapter = ContentsAdapter::new(Arc::new(contents.clone()));
    (contents, adapter)
}

#[tokio::test]
async fn missing_namespace_lists_empty() {
    let (_, adapter) = client(Arc::default(), Duration::from_secs(5)).await;
    assert!(adapter.list("users/never-written").await.unwrap().is_empty());
}

#[tokio::test]
async fn binary_round_trip_over_http() {
    let (_, adapter) = client(Arc::default(), Duration::from_secs(5)).await;
    let bytes: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 256) as u8).collect();

    let sha = adapter
        .write_file("users/1/data bin/blob.bin", &bytes, "Upload blob.bin", None)
        .await
        .unwrap();
    let read = adapter.read_file("users/1/data bin/blob.bin").await.unwrap();

    assert_eq!(read.bytes, bytes);
    assert_eq!(read.content_hash, sha);

    let listing = adapter.list("users/1").await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "data bin");
}

#[tokio::test]
async fn large_file_falls_back_to_raw_download() {
    let fake = Arc::new(FakeGitHub::with_store(MemoryContents::new().with_inline_limit(8)));
    let (_, adapter) = client(fake, Duration::from_secs(5)).await;
    let bytes = vec![0xABu8; 64];

    adapter.write_file("users/1/big.bin", &bytes, "Upload", None).await.unwrap();
    assert_eq!(adapter.read_file("users/1/big.bin").await.unwrap().bytes, bytes);
}

#[tokio::test]
async fn stale_token_surfaces_as_conflict() {
    let (_, adapter) = client(Arc::default(), Duration::from_secs(5)).await;
    let first = adapter.write_file("users/1/a.txt", b"one", "Upload", None).await.unwrap();
    adapter
        .write_file("users/1/a.txt", b"two", "Update", Some(&first))
        .await
        .unwrap();

    let stale = adapter
        .write_file("users/1/a.txt", b"three", "Update", Some(&first))
        .await;
    assert!(matches!(stale, Err(StorageError::Conflict(_))));
}

#[tokio::test]
async fn missing_repository_is_provisioned_idempotently() {
    let fake = Arc::new(FakeGitHub::with_store(MemoryContents::without_container()));
    let (contents, adapter) = client(fake.clone(), Duration::from_secs(5)).await;

    adapter.write_file("users/1/a.txt", b"hi", "Upload", None).await.unwrap();
    assert_eq!(fake.store.container_creations(), 1);

    // A second create answers 422 "already exists", which must count as success.
    contents.create_container().await.unwrap();
    assert_eq!(adapter.read_file("users/1/a.txt").await.unwrap().bytes, b"hi");
}

#[tokio::test]
async fn delete_over_http() {
    let (_, adapter) = client(Arc::default(), Duration::from_secs(5)).await;
    let sha = adapter.write_file("users/1/a.txt", b"hi", "Upload", None).await.unwrap();

    assert!(matches!(
        adapter.delete_file("users/1/a.txt", "Delete", "stale").await,
        Err(StorageError::Conflict(_))
    ));
    adapter.delete_file("users/1/a.txt", "Delete", &sha).await.unwrap();
    assert!(matches!(
        adapter.read_file("users/1/a.txt").await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn upstream_errors_are_remote_unavailable() {
    let fake = Arc::new(FakeGitHub::default());
    fake.fail_status.store(502, Ordering::SeqCst);
    let (_, adapter) = client(fake, Duration::from_secs(5)).await;

    assert!(matches!(
        adapter.list("users/1").await,
        Err(StorageError::RemoteUnavailable(_))
    ));
    assert!(matches!(
        adapter.write_file("users/1/a.txt", b"x", "Upload", None).await,
        Err(StorageError::RemoteUnavailable(_))
    ));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let fake = Arc::new(FakeGitHub::default());
    fake.delay_ms.store(2_000, Ordering::SeqCst);
    let (_, adapter) = client(fake, Duration::from_millis(200)).await;

    assert!(matches!(
        adapter.read_file("users/1/a.txt").await,
        Err(StorageError::RemoteUnavailable(_))
    ));
}

#[tokio::test]
async fn unreadable_body_is_malformed_response() {
    let fake = Arc::new(FakeGitHub::default());
    fake.garbage.store(true, Ordering::SeqCst);
    let (_, adapter) = client(fake, Duration::from_secs(5)).await;

    let result = adapter.list("users/1").await;
    assert!(matches!(result, Err(StorageError::MalformedResponse(_))));
    assert!(!result.unwrap_err().is_client_error());
}

#[tokio::test]
async fn unreadable_write_response_is_malformed_response() {
    let fake = Arc::new(FakeGitHub::default());
    fake.garbage.store(true, Ordering::SeqCst);
    let (_, adapter) = client(fake, Duration::from_secs(5)).await;

    let result = adapter
        .write_file("users/1/a.txt", b"x", "Upload a.txt", None)
        .await;
    assert!(matches!(result, Err(StorageError::MalformedResponse(_))));
    assert!(!result.unwrap_err().is_client_error());
}
