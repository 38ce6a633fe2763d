//! Semantic layer over a [`ContentsApi`] backend.
//!
//! The adapter owns the rules that do not depend on the backend:
//!
//! - a missing directory lists as empty (a brand-new principal has no folder yet),
//! - a missing file is `NotFound`,
//! - a stale or missing version token on write or delete is `Conflict`,
//! - the backing container is provisioned lazily: a write that reports the container missing
//!   triggers an idempotent create and a single retry of the write,
//! - bodies are base64 on the wire and raw bytes everywhere else.
//!
//! ## Concurrency caveat
//!
//! Version tokens give optimistic concurrency, but reading a token and writing with it are two
//! separate remote calls. A writer that slips in between makes the second call fail with
//! `Conflict`, which is surfaced as-is. Callers must re-read before retrying a write.

use super::{
    ContentsApi, DeleteOutcome, DeleteRequest, FileItem, FileKind, PutOutcome, PutRequest,
    RemoteContents, RemoteEntry, RemoteFile,
};
use crate::constants::QUOTA_BYTES;
use crate::usage::UsageSnapshot;
use crate::{StorageError, StorageResult};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

/// Raw bytes of a file together with its current version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    pub bytes: Vec<u8>,
    pub content_hash: String,
}

/// Maps namespace operations onto a contents API backend.
#[derive(Clone)]
pub struct ContentsAdapter {
    api: Arc<dyn ContentsApi>,
}

impl std::fmt::Debug for ContentsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentsAdapter").finish_non_exhaustive()
    }
}

impl ContentsAdapter {
    pub fn new(api: Arc<dyn ContentsApi>) -> Self {
        Self { api }
    }

    /// Lists one directory level.
    ///
    /// A path that does not exist yields an empty list. Entries that are neither files nor
    /// directories (symlinks, submodules) are skipped.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidPath` if `path` is a file.
    /// - `StorageError::RemoteUnavailable` / `StorageError::MalformedResponse` from the backend.
    pub async fn list(&self, path: &str) -> StorageResult<Vec<FileItem>> {
        match self.api.get(path).await? {
            None => {
                tracing::debug!(path, "directory does not exist; listing as empty");
                Ok(Vec::new())
            }
            Some(RemoteContents::Directory(entries)) => {
                Ok(entries.into_iter().filter_map(file_item_from_entry).collect())
            }
            Some(RemoteContents::File(_)) => Err(StorageError::InvalidPath(format!(
                "{path} is a file, not a directory"
            ))),
        }
    }

    /// Returns the listing entry for a file, or `None` if it does not exist.
    ///
    /// Used to pick up the current version token before an update or delete.
    ///
    /// # Errors
    ///
    /// `StorageError::InvalidPath` if `path` is a directory; backend errors otherwise.
    pub async fn stat(&self, path: &str) -> StorageResult<Option<FileItem>> {
        match self.api.get(path).await? {
            None => Ok(None),
            Some(RemoteContents::File(file)) => Ok(Some(file_item_from_file(&file))),
            Some(RemoteContents::Directory(_)) => Err(StorageError::InvalidPath(format!(
                "{path} is a directory"
            ))),
        }
    }

    /// Reads a file and decodes its body.
    ///
    /// Files whose envelope carries no inline body (above the API's inline size limit) are
    /// fetched again in raw form.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if the file does not exist.
    /// - `StorageError::InvalidPath` if `path` is a directory.
    /// - `StorageError::MalformedResponse` if the body cannot be decoded.
    pub async fn read_file(&self, path: &str) -> StorageResult<FileContents> {
        let file = match self.api.get(path).await? {
            None => return Err(StorageError::NotFound(path.to_owned())),
            Some(RemoteContents::Directory(_)) => {
                return Err(StorageError::InvalidPath(format!("{path} is a directory")))
            }
            Some(RemoteContents::File(file)) => file,
        };

        let bytes = match file.encoding.as_deref() {
            Some("base64" | "none") | None if file.content.is_empty() && file.size > 0 => {
                tracing::debug!(path, size = file.size, "no inline body; fetching raw");
                self.api
                    .get_raw(path)
                    .await?
                    .ok_or_else(|| StorageError::NotFound(path.to_owned()))?
            }
            Some("base64") => decode_content(&file.content)?,
            None if !file.content.is_empty() => decode_content(&file.content)?,
            Some("none") | None if file.content.is_empty() => Vec::new(),
            other => {
                return Err(StorageError::MalformedResponse(format!(
                    "unsupported content encoding {other:?} for {path}"
                )))
            }
        };

        if bytes.len() as u64 != file.size {
            tracing::warn!(
                path,
                expected = file.size,
                actual = bytes.len(),
                "decoded size differs from reported size"
            );
        }

        Ok(FileContents {
            bytes,
            content_hash: file.sha,
        })
    }

    /// Creates or updates a file and returns its new version token.
    ///
    /// `existing_content_hash` is passed through unchanged as the optimistic-concurrency token.
    /// If the backend reports that the container does not exist it is created (idempotently) and
    /// the write is retried once.
    ///
    /// # Errors
    ///
    /// - `StorageError::Conflict` if the token is stale, or missing for an existing file.
    /// - `StorageError::RemoteUnavailable` if provisioning did not make the container appear.
    pub async fn write_file(
        &self,
        path: &str,
        bytes: &[u8],
        commit_message: &str,
        existing_content_hash: Option<&str>,
    ) -> StorageResult<String> {
        let request = PutRequest {
            message: commit_message.to_owned(),
            content: encode_content(bytes),
            sha: existing_content_hash.map(str::to_owned),
        };

        match self.api.put(path, &request).await? {
            PutOutcome::Written { sha } => Ok(sha),
            PutOutcome::Conflict => Err(StorageError::Conflict(path.to_owned())),
            PutOutcome::ContainerMissing => {
                tracing::info!(path, "storage container missing; provisioning before write");
                self.api.create_container().await?;
                match self.api.put(path, &request).await? {
                    PutOutcome::Written { sha } => Ok(sha),
                    PutOutcome::Conflict => Err(StorageError::Conflict(path.to_owned())),
                    PutOutcome::ContainerMissing => Err(StorageError::RemoteUnavailable(
                        "storage container still missing after provisioning".into(),
                    )),
                }
            }
        }
    }

    /// Deletes a file guarded by its current version token.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` if the file does not exist, `StorageError::Conflict` if the token
    /// is stale.
    pub async fn delete_file(
        &self,
        path: &str,
        commit_message: &str,
        content_hash: &str,
    ) -> StorageResult<()> {
        let request = DeleteRequest {
            message: commit_message.to_owned(),
            sha: content_hash.to_owned(),
        };
        match self.api.delete(path, &request).await? {
            DeleteOutcome::Deleted => Ok(()),
            DeleteOutcome::NotFound => Err(StorageError::NotFound(path.to_owned())),
            DeleteOutcome::Conflict => Err(StorageError::Conflict(path.to_owned())),
        }
    }

    /// Sums the sizes of the files directly inside `path` against the fixed quota.
    ///
    /// Single level only: files inside sub-directories are not counted.
    pub async fn aggregate_usage(&self, path: &str) -> StorageResult<UsageSnapshot> {
        let items = self.list(path).await?;
        Ok(UsageSnapshot::from_items(&items, QUOTA_BYTES))
    }
}

/// Encodes a body for the wire.
pub fn encode_content(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decodes a wire body, ignoring the line breaks the API inserts every 60 characters.
///
/// # Errors
///
/// `StorageError::MalformedResponse` if the body is not valid base64.
pub fn decode_content(content: &str) -> StorageResult<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StorageError::MalformedResponse(format!("invalid base64 body: {e}")))
}

fn file_item_from_entry(entry: RemoteEntry) -> Option<FileItem> {
    let (kind, size_bytes) = match entry.entry_type.as_str() {
        "file" => (FileKind::File, Some(entry.size)),
        "dir" => (FileKind::Directory, None),
        other => {
            tracing::debug!(path = %entry.path, entry_type = other, "skipping entry");
            return None;
        }
    };
    Some(FileItem {
        name: entry.name,
        kind,
        size_bytes,
        content_hash: entry.sha,
        last_modified: entry.last_modified,
    })
}

fn file_item_from_file(file: &RemoteFile) -> FileItem {
    FileItem {
        name: file.name.clone(),
        kind: FileKind::File,
        size_bytes: Some(file.size),
        content_hash: file.sha.clone(),
        last_modified: None,
    }
}
