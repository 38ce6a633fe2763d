//! Constants used throughout the Koderstore core crate.
//!
//! Path prefixes, quotas and defaults live here so the remote layout stays consistent across the
//! adapter, the service and the tests.

/// Top-level directory in the storage repository holding every principal's namespace.
pub const USERS_DIR_NAME: &str = "users";

/// Storage quota applied to every namespace (1 GiB).
pub const QUOTA_BYTES: u64 = 1024 * BYTES_PER_MEGABYTE;

/// Bytes in one megabyte as reported to users.
pub const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Usage percentage at which a namespace is shown as nearly full.
pub const WARNING_THRESHOLD_PERCENT: u8 = 70;

/// Usage percentage above which a namespace is shown as critical.
pub const CRITICAL_THRESHOLD_PERCENT: u8 = 90;

/// Default base URL of the repository-contents API.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default timeout for a single call to the contents API.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Default number of concurrent namespace listings during the admin overview.
pub const DEFAULT_ADMIN_CONCURRENCY: usize = 4;

/// Description used when the storage repository has to be provisioned.
pub const STORAGE_REPO_DESCRIPTION: &str = "Koderstore file storage";

/// MIME type returned when an extension is unknown.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
