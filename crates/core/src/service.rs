//! Namespace-level storage operations.
//!
//! [`StorageService`] is the surface the outer layers (REST API, CLI) call. Each operation runs
//! the [`AuthorizationGate`] first, builds remote paths through [`crate::paths`], and only then
//! touches the [`ContentsAdapter`]. Validation failures therefore never reach the remote API.
//!
//! Writes and deletes always target the caller's own namespace. Reads may target another
//! namespace when an administrator asks for it explicitly.

use crate::config::{BackendConfig, CoreConfig};
use crate::constants::QUOTA_BYTES;
use crate::content_type::content_type_for_name;
use crate::contents::{
    ContentsAdapter, ContentsApi, FileItem, FileKind, GitHubContents, MemoryContents,
};
use crate::paths::{build_dir_path, build_path, file_name, namespace_root, namespaces_root};
use crate::usage::UsageSnapshot;
use crate::{AuthorizationGate, Principal, PrincipalId, StorageError, StorageResult};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

/// Which namespace a read targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceAccess {
    pub requested: Option<PrincipalId>,
    pub admin_request: bool,
}

impl NamespaceAccess {
    /// The caller's own namespace.
    pub fn own() -> Self {
        Self::default()
    }

    /// Another principal's namespace, read as an administrator.
    pub fn admin(target: PrincipalId) -> Self {
        Self {
            requested: Some(target),
            admin_request: true,
        }
    }
}

/// A file read back from storage, ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDownload {
    /// Final segment of the requested name.
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub content_hash: String,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub path: String,
    pub content_hash: String,
    /// `false` when an existing file was replaced.
    pub created: bool,
}

/// Per-principal totals for the administrator overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub id: PrincipalId,
    pub username: String,
    /// Entries directly inside the namespace, directories included.
    pub file_count: usize,
    /// Sum of the file sizes directly inside the namespace.
    pub total_size: u64,
}

/// Storage operations scoped to principal namespaces.
#[derive(Debug, Clone)]
pub struct StorageService {
    adapter: ContentsAdapter,
    gate: AuthorizationGate,
    admin_concurrency: usize,
}

impl StorageService {
    pub fn new(
        api: Arc<dyn ContentsApi>,
        gate: AuthorizationGate,
        admin_concurrency: usize,
    ) -> Self {
        Self {
            adapter: ContentsAdapter::new(api),
            gate,
            admin_concurrency: admin_concurrency.max(1),
        }
    }

    /// Builds the service and its backend from startup configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationError` if the backend client cannot be constructed.
    pub fn from_config(cfg: &CoreConfig) -> StorageResult<Self> {
        let api: Arc<dyn ContentsApi> = match cfg.backend() {
            BackendConfig::GitHub(settings) => {
                tracing::info!(
                    owner = settings.owner(),
                    repo = settings.repo(),
                    "using GitHub contents backend"
                );
                Arc::new(GitHubContents::new(settings, cfg.http_timeout())?)
            }
            BackendConfig::Memory => {
                tracing::warn!("using in-memory contents backend; files are lost on restart");
                Arc::new(MemoryContents::new())
            }
        };
        Ok(Self::new(
            api,
            AuthorizationGate::new(cfg.admins().clone()),
            cfg.admin_concurrency(),
        ))
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// Lists one directory level of a namespace (`dir = None` for its root).
    ///
    /// A namespace that has never been written lists as empty.
    pub async fn list_namespace(
        &self,
        session: Option<&Principal>,
        access: &NamespaceAccess,
        dir: Option<&str>,
    ) -> StorageResult<Vec<FileItem>> {
        let target = self.resolve(session, access)?;
        let path = build_dir_path(&target, dir)?;
        self.adapter.list(&path).await
    }

    /// Reads a file and resolves its preview content type.
    pub async fn read_file(
        &self,
        session: Option<&Principal>,
        access: &NamespaceAccess,
        name: &str,
    ) -> StorageResult<FileDownload> {
        let target = self.resolve(session, access)?;
        let path = build_path(&target, name)?;
        let contents = self.adapter.read_file(&path).await?;
        Ok(FileDownload {
            file_name: file_name(name).to_owned(),
            content_type: content_type_for_name(name),
            bytes: contents.bytes,
            content_hash: contents.content_hash,
        })
    }

    /// Creates or replaces a file in the caller's namespace.
    ///
    /// With `expected_token` the write is guarded by that token and a stale one fails with
    /// `Conflict`. Without it the current token is looked up first and reused; that lookup and
    /// the write are separate remote calls, so a concurrent writer in between still produces
    /// `Conflict` rather than a silent overwrite.
    pub async fn write_file(
        &self,
        session: Option<&Principal>,
        name: &str,
        bytes: &[u8],
        expected_token: Option<&str>,
    ) -> StorageResult<WriteReceipt> {
        let target = self.gate.resolve_target_namespace(session, None, false)?;
        let username = session.map_or("", |p| p.username.as_str());
        let path = build_path(&target, name)?;

        let token = match expected_token {
            Some(token) => Some(token.to_owned()),
            None => self
                .adapter
                .stat(&path)
                .await?
                .map(|item| item.content_hash),
        };

        let message = match token {
            Some(_) => format!("Update {name}"),
            None => format!("Upload {name} for user {username}"),
        };
        let content_hash = self
            .adapter
            .write_file(&path, bytes, &message, token.as_deref())
            .await?;

        tracing::info!(principal = %target, path, size = bytes.len(), "file written");
        Ok(WriteReceipt {
            path,
            content_hash,
            created: token.is_none(),
        })
    }

    /// Deletes a file from the caller's namespace.
    ///
    /// Without `expected_token` the current token is looked up first, with the same
    /// read-then-act caveat as [`StorageService::write_file`].
    pub async fn delete_file(
        &self,
        session: Option<&Principal>,
        name: &str,
        expected_token: Option<&str>,
    ) -> StorageResult<()> {
        let target = self.gate.resolve_target_namespace(session, None, false)?;
        let path = build_path(&target, name)?;

        let token = match expected_token {
            Some(token) => token.to_owned(),
            None => self
                .adapter
                .stat(&path)
                .await?
                .map(|item| item.content_hash)
                .ok_or_else(|| StorageError::NotFound(path.clone()))?,
        };

        self.adapter
            .delete_file(&path, &format!("Delete {name}"), &token)
            .await?;
        tracing::info!(principal = %target, path, "file deleted");
        Ok(())
    }

    /// Usage of a namespace against the fixed quota (top level only).
    pub async fn get_usage(
        &self,
        session: Option<&Principal>,
        access: &NamespaceAccess,
    ) -> StorageResult<UsageSnapshot> {
        let target = self.resolve(session, access)?;
        self.adapter.aggregate_usage(&namespace_root(&target)).await
    }

    /// Totals for every namespace; administrators only.
    ///
    /// Namespaces are listed concurrently, at most `admin_concurrency` at a time. A namespace
    /// whose listing fails is logged and left out of the result.
    pub async fn list_all_namespaces(
        &self,
        session: Option<&Principal>,
    ) -> StorageResult<Vec<NamespaceSummary>> {
        let admin = self.gate.require_admin(session)?;
        tracing::info!(admin = %admin.id, "listing all namespaces");

        let principals: Vec<PrincipalId> = self
            .adapter
            .list(namespaces_root())
            .await?
            .into_iter()
            .filter(|item| item.kind == FileKind::Directory)
            .filter_map(|item| match PrincipalId::new(&item.name) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(name = %item.name, error = %e, "skipping unusable namespace");
                    None
                }
            })
            .collect();

        let mut summaries: Vec<NamespaceSummary> = stream::iter(principals)
            .map(|id| async move {
                let result = self.adapter.list(&namespace_root(&id)).await;
                (id, result)
            })
            .buffer_unordered(self.admin_concurrency)
            .filter_map(|(id, result)| async move {
                match result {
                    Ok(items) => {
                        let usage = UsageSnapshot::from_items(&items, QUOTA_BYTES);
                        Some(NamespaceSummary {
                            username: format!("User {id}"),
                            id,
                            file_count: items.len(),
                            total_size: usage.used_bytes,
                        })
                    }
                    Err(e) => {
                        tracing::error!(principal = %id, error = %e, "failed to list namespace");
                        None
                    }
                }
            })
            .collect()
            .await;

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    fn resolve(
        &self,
        session: Option<&Principal>,
        access: &NamespaceAccess,
    ) -> StorageResult<PrincipalId> {
        self.gate
            .resolve_target_namespace(session, access.requested.as_ref(), access.admin_request)
    }
}
