//! Request and response bodies for the HTTP API.
//!
//! Field names are camelCase on the wire. Conversions from core types live next to each response
//! so handlers stay one-liners.

use koderstore_core::{
    FileItem, FileKind, NamespaceSummary, Principal, UsageSnapshot, WriteReceipt,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrincipalRes {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&Principal> for PrincipalRes {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id.to_string(),
            username: p.username.clone(),
            avatar: p.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileItemRes {
    pub name: String,
    /// `"file"` or `"directory"`.
    pub kind: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    /// Version token required to update or delete the file.
    pub content_hash: String,
    /// RFC 3339 timestamp when known.
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl From<FileItem> for FileItemRes {
    fn from(item: FileItem) -> Self {
        Self {
            name: item.name,
            kind: match item.kind {
                FileKind::File => "file",
                FileKind::Directory => "directory",
            }
            .into(),
            size_bytes: item.size_bytes,
            content_hash: item.content_hash,
            last_modified: item.last_modified.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListFilesRes {
    pub files: Vec<FileItemRes>,
}

impl From<Vec<FileItem>> for ListFilesRes {
    fn from(items: Vec<FileItem>) -> Self {
        Self {
            files: items.into_iter().map(FileItemRes::from).collect(),
        }
    }
}

/// Save edited text content over an existing (or new) file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileReq {
    pub file_name: String,
    pub content: String,
    /// Version token read with the file; omit to overwrite whatever is current.
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileRes {
    pub path: String,
    pub content_hash: String,
    pub created: bool,
}

impl From<WriteReceipt> for WriteFileRes {
    fn from(receipt: WriteReceipt) -> Self {
        Self {
            path: receipt.path,
            content_hash: receipt.content_hash,
            created: receipt.created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileRes {
    pub success: bool,
}

/// Storage usage; `used`/`total` are megabytes rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageRes {
    pub used: f64,
    pub total: f64,
    pub percentage: u8,
    pub used_bytes: u64,
    pub quota_bytes: u64,
    /// `"normal"`, `"warning"` or `"critical"`.
    pub severity: String,
}

impl From<UsageSnapshot> for UsageRes {
    fn from(usage: UsageSnapshot) -> Self {
        Self {
            used: usage.used_megabytes(),
            total: usage.quota_megabytes(),
            percentage: usage.percentage(),
            used_bytes: usage.used_bytes,
            quota_bytes: usage.quota_bytes,
            severity: usage.severity().as_str().into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummaryRes {
    pub id: String,
    pub username: String,
    pub file_count: usize,
    pub total_size: u64,
}

impl From<NamespaceSummary> for NamespaceSummaryRes {
    fn from(summary: NamespaceSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            username: summary.username,
            file_count: summary.file_count,
            total_size: summary.total_size,
        }
    }
}
