//! In-process contents backend.
//!
//! Behaves like the remote API as far as [`super::ContentsAdapter`] can observe: directories are
//! implied by the files beneath them, version tokens are content hashes, and writes to an existing
//! file require its current token. Used for local development (`KODERSTORE_BACKEND=memory`) and in
//! tests.

use super::{
    ContentsApi, DeleteOutcome, DeleteRequest, PutOutcome, PutRequest, RemoteContents,
    RemoteEntry, RemoteFile,
};
use crate::contents::adapter::{decode_content, encode_content};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredFile {
    bytes: Vec<u8>,
    sha: String,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    container_exists: bool,
    files: BTreeMap<String, StoredFile>,
}

/// Contents backend held entirely in memory.
#[derive(Debug)]
pub struct MemoryContents {
    state: Mutex<MemoryState>,
    inline_limit: Option<usize>,
    container_creations: AtomicUsize,
}

impl Default for MemoryContents {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContents {
    /// Creates an empty store whose container already exists.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                container_exists: true,
                files: BTreeMap::new(),
            }),
            inline_limit: None,
            container_creations: AtomicUsize::new(0),
        }
    }

    /// Creates a store whose container has not been provisioned yet.
    pub fn without_container() -> Self {
        let store = Self::new();
        store.lock().container_exists = false;
        store
    }

    /// Files larger than `limit` bytes are returned without an inline body, like the remote API
    /// does above its size limit.
    pub fn with_inline_limit(mut self, limit: usize) -> Self {
        self.inline_limit = Some(limit);
        self
    }

    /// Number of times `create_container` has been called.
    pub fn container_creations(&self) -> usize {
        self.container_creations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-call; the map is still
        // structurally valid.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn content_sha(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn normalise(path: &str) -> &str {
    path.trim_matches('/')
}

impl MemoryState {
    fn file_envelope(&self, path: &str, inline_limit: Option<usize>) -> Option<RemoteFile> {
        let stored = self.files.get(path)?;
        let inline = inline_limit.map_or(true, |limit| stored.bytes.len() <= limit);
        Some(RemoteFile {
            name: last_segment(path).to_owned(),
            path: path.to_owned(),
            sha: stored.sha.clone(),
            size: stored.bytes.len() as u64,
            content: if inline {
                encode_content(&stored.bytes)
            } else {
                String::new()
            },
            encoding: Some(if inline { "base64" } else { "none" }.to_owned()),
        })
    }

    fn directory_listing(&self, path: &str) -> Option<Vec<RemoteEntry>> {
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut files = Vec::new();
        let mut dirs: BTreeMap<String, Sha256> = BTreeMap::new();
        for (file_path, stored) in self.files.range(prefix.clone()..) {
            let Some(rest) = file_path.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                None => files.push(RemoteEntry {
                    name: rest.to_owned(),
                    path: file_path.clone(),
                    entry_type: "file".into(),
                    size: stored.bytes.len() as u64,
                    sha: stored.sha.clone(),
                    last_modified: Some(stored.modified),
                }),
                Some((dir, _)) => dirs
                    .entry(dir.to_owned())
                    .or_default()
                    .update(stored.sha.as_bytes()),
            }
        }

        if files.is_empty() && dirs.is_empty() {
            return None;
        }

        let mut entries: Vec<RemoteEntry> = dirs
            .into_iter()
            .map(|(name, hasher)| RemoteEntry {
                path: format!("{prefix}{name}"),
                name,
                entry_type: "dir".into(),
                size: 0,
                sha: hex::encode(hasher.finalize()),
                last_modified: None,
            })
            .chain(files)
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Some(entries)
    }

    /// `true` if writing a file at `path` would collide with an existing directory or file prefix.
    fn collides(&self, path: &str) -> bool {
        let as_dir = format!("{path}/");
        let under_dir = self
            .files
            .range(as_dir.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(&as_dir));
        let mut ancestor = path;
        let mut under_file = false;
        while let Some((parent, _)) = ancestor.rsplit_once('/') {
            if self.files.contains_key(parent) {
                under_file = true;
                break;
            }
            ancestor = parent;
        }
        under_dir || under_file
    }
}

#[async_trait]
impl ContentsApi for MemoryContents {
    async fn get(&self, path: &str) -> StorageResult<Option<RemoteContents>> {
        let path = normalise(path);
        let state = self.lock();
        if !state.container_exists {
            return Ok(None);
        }
        if let Some(file) = state.file_envelope(path, self.inline_limit) {
            return Ok(Some(RemoteContents::File(file)));
        }
        Ok(state.directory_listing(path).map(RemoteContents::Directory))
    }

    async fn get_raw(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        let state = self.lock();
        if !state.container_exists {
            return Ok(None);
        }
        Ok(state.files.get(normalise(path)).map(|f| f.bytes.clone()))
    }

    async fn put(&self, path: &str, request: &PutRequest) -> StorageResult<PutOutcome> {
        let path = normalise(path);
        let bytes = decode_content(&request.content).map_err(|e| {
            StorageError::RemoteUnavailable(format!("backend rejected request body: {e}"))
        })?;

        let mut state = self.lock();
        if !state.container_exists {
            return Ok(PutOutcome::ContainerMissing);
        }

        let current_sha = state.files.get(path).map(|f| f.sha.clone());
        match (current_sha, request.sha.as_deref()) {
            (Some(current), Some(token)) if current == token => {}
            (Some(_), _) => return Ok(PutOutcome::Conflict),
            // A token for a file that no longer exists is stale as well.
            (None, Some(_)) => return Ok(PutOutcome::Conflict),
            (None, None) if state.collides(path) => return Ok(PutOutcome::Conflict),
            (None, None) => {}
        }

        let sha = content_sha(&bytes);
        state.files.insert(
            path.to_owned(),
            StoredFile {
                bytes,
                sha: sha.clone(),
                modified: Utc::now(),
            },
        );
        Ok(PutOutcome::Written { sha })
    }

    async fn delete(&self, path: &str, request: &DeleteRequest) -> StorageResult<DeleteOutcome> {
        let path = normalise(path);
        let mut state = self.lock();
        let current_sha = state.files.get(path).map(|f| f.sha.clone());
        match current_sha {
            None => Ok(DeleteOutcome::NotFound),
            Some(sha) if sha != request.sha => Ok(DeleteOutcome::Conflict),
            Some(_) => {
                state.files.remove(path);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }

    async fn create_container(&self) -> StorageResult<()> {
        self.container_creations.fetch_add(1, Ordering::SeqCst);
        self.lock().container_exists = true;
        Ok(())
    }
}
