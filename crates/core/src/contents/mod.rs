//! Repository-contents API seam.
//!
//! Koderstore keeps no local state: every file lives in a remote repository and is reached through
//! a contents API with four calls (get, put, delete and container creation). [`ContentsApi`] is
//! that seam, expressed in terms of outcomes rather than HTTP statuses so that the semantic rules
//! live in one place, [`ContentsAdapter`], regardless of which backend is plugged in.
//!
//! ## Wire shapes
//!
//! The JSON envelopes mirror the GitHub contents API:
//!
//! ```text
//! GET  contents/<dir>   -> [ { "type": "file"|"dir", "name", "path", "sha", "size" }, ... ]
//! GET  contents/<file>  -> { "type": "file", "name", "path", "sha", "size", "content", "encoding" }
//! PUT  contents/<file>  <- { "message", "content": <base64>, "sha"?: <current token> }
//! DELETE contents/<file> <- { "message", "sha" }
//! ```
//!
//! Bodies are base64 on the wire. Encoding and decoding happen in the adapter only.
//!
//! ## Backends
//!
//! - [`GitHubContents`]: the real remote, over HTTPS with a bounded per-call timeout.
//! - [`MemoryContents`]: an in-process store with the same semantics, for development and tests.

mod adapter;
mod github;
mod memory;

pub use adapter::{decode_content, encode_content, ContentsAdapter, FileContents};
pub use github::GitHubContents;
pub use memory::MemoryContents;

use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// One entry of a principal's namespace, as shown to users.
///
/// `name` is a single path segment; listings go one directory level at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub name: String,
    pub kind: FileKind,
    /// Present for files only.
    pub size_bytes: Option<u64>,
    /// Opaque version token from the remote store; required to update or delete the file.
    pub content_hash: String,
    /// Best effort; the GitHub listing does not expose modification times.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Directory entry as returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub size: u64,
    pub sha: String,
    /// Only populated by backends that track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// File envelope as returned when the path is a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    /// Base64 body, possibly wrapped with newlines. Empty when `encoding` is `"none"`.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Result of a successful `get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteContents {
    Directory(Vec<RemoteEntry>),
    File(RemoteFile),
}

/// Body of a create-or-update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRequest {
    pub message: String,
    /// Base64-encoded file body.
    pub content: String,
    /// Current version token; required when the file already exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Outcome of a create-or-update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The file was written; carries the new version token.
    Written { sha: String },
    /// The supplied token was missing or stale.
    Conflict,
    /// The backing container (repository) does not exist yet.
    ContainerMissing,
}

/// Body of a delete call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub message: String,
    pub sha: String,
}

/// Outcome of a delete call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Conflict,
}

/// The remote repository-contents API.
///
/// Implementations translate transport failures (non-2xx statuses other than the ones modelled
/// by the outcome types, timeouts, network errors) into `StorageError::RemoteUnavailable`, and
/// unreadable bodies into `StorageError::MalformedResponse`.
#[async_trait]
pub trait ContentsApi: Send + Sync {
    /// Lists a directory or fetches a file envelope; `None` when the path does not exist.
    async fn get(&self, path: &str) -> StorageResult<Option<RemoteContents>>;

    /// Fetches the raw bytes of a file; `None` when the path does not exist.
    async fn get_raw(&self, path: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Creates or updates a file.
    async fn put(&self, path: &str, request: &PutRequest) -> StorageResult<PutOutcome>;

    /// Deletes a file.
    async fn delete(&self, path: &str, request: &DeleteRequest) -> StorageResult<DeleteOutcome>;

    /// Creates the backing container if it does not exist. Must succeed if it already exists.
    async fn create_container(&self) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_listing_deserialises_as_directory() {
        let json = r#"[
            {"type":"file","name":"a.txt","path":"users/1/a.txt","sha":"abc","size":3},
            {"type":"dir","name":"photos","path":"users/1/photos","sha":"def","size":0}
        ]"#;
        match serde_json::from_str::<RemoteContents>(json).unwrap() {
            RemoteContents::Directory(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[1].entry_type, "dir");
            }
            other => panic!("expected directory, got {other:?}"),
        }
    }

    #[test]
    fn file_envelope_deserialises_as_file() {
        let json = r#"{"type":"file","name":"a.txt","path":"users/1/a.txt","sha":"abc",
            "size":3,"content":"aGk=\n","encoding":"base64","_links":{}}"#;
        match serde_json::from_str::<RemoteContents>(json).unwrap() {
            RemoteContents::File(file) => {
                assert_eq!(file.sha, "abc");
                assert_eq!(file.encoding.as_deref(), Some("base64"));
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn put_request_omits_missing_sha() {
        let request = PutRequest {
            message: "Upload a.txt".into(),
            content: "aGk=".into(),
            sha: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("sha"));
    }

    #[test]
    fn file_item_serialises_camel_case() {
        let item = FileItem {
            name: "a.txt".into(),
            kind: FileKind::File,
            size_bytes: Some(3),
            content_hash: "abc".into(),
            last_modified: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"sizeBytes\":3"));
        assert!(json.contains("\"kind\":\"file\""));
    }
}
