//! # Koderstore Core
//!
//! Per-user file storage on top of a remote repository-contents API.
//!
//! Each principal owns the namespace `users/<principal-id>/` in a single storage repository. This
//! crate maps that virtual filesystem onto the remote API:
//! - path construction and traversal checks ([`paths`])
//! - namespace access control ([`AuthorizationGate`])
//! - list/read/write/delete with base64 bodies and version tokens ([`contents`])
//! - preview content types ([`content_type`]) and quota usage ([`usage`])
//! - the namespace-level operations used by the outer layers ([`StorageService`])
//!
//! **No API concerns**: sessions, HTTP routing and CLI parsing belong in `api-shared`,
//! `api-rest` and `koderstore-cli`.

pub mod authorization;
pub mod config;
pub mod constants;
pub mod content_type;
pub mod contents;
pub mod error;
pub mod paths;
pub mod principal;
pub mod service;
pub mod usage;

pub use authorization::AuthorizationGate;
pub use config::{BackendConfig, CoreConfig, GitHubSettings};
pub use contents::{FileItem, FileKind};
pub use error::{StorageError, StorageResult};
pub use principal::{AdminSet, Principal, PrincipalId};
pub use service::{FileDownload, NamespaceAccess, NamespaceSummary, StorageService, WriteReceipt};
pub use usage::{UsageSeverity, UsageSnapshot};
