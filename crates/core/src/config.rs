//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into services. Request
//! handling never reads process-wide environment variables, which keeps behaviour consistent in
//! multi-threaded runtimes and test harnesses.
//!
//! [`CoreConfig::from_lookup`] takes a lookup function rather than reading the environment
//! directly, so binaries pass `|key| std::env::var(key).ok()` and tests pass a map.

use crate::constants::{DEFAULT_ADMIN_CONCURRENCY, DEFAULT_GITHUB_API_URL, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::{AdminSet, StorageError, StorageResult};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_STORAGE_OWNER: &str = "GITHUB_STORAGE_OWNER";
pub const ENV_GITHUB_STORAGE_REPO: &str = "GITHUB_STORAGE_REPO";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_ADMIN_IDS: &str = "ADMIN_DISCORD_IDS";
pub const ENV_BACKEND: &str = "KODERSTORE_BACKEND";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "KODERSTORE_HTTP_TIMEOUT_SECS";
pub const ENV_ADMIN_CONCURRENCY: &str = "KODERSTORE_ADMIN_CONCURRENCY";

/// Connection details for the GitHub storage repository.
#[derive(Clone)]
pub struct GitHubSettings {
    api_url: String,
    owner: String,
    repo: String,
    token: String,
}

impl std::fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GitHubSettings {
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationError` if any value is blank.
    pub fn new(
        api_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> StorageResult<Self> {
        let settings = Self {
            api_url: api_url.into().trim().to_owned(),
            owner: owner.into().trim().to_owned(),
            repo: repo.into().trim().to_owned(),
            token: token.into().trim().to_owned(),
        };
        for (name, value) in [
            (ENV_GITHUB_API_URL, &settings.api_url),
            (ENV_GITHUB_STORAGE_OWNER, &settings.owner),
            (ENV_GITHUB_STORAGE_REPO, &settings.repo),
            (ENV_GITHUB_TOKEN, &settings.token),
        ] {
            if value.is_empty() {
                return Err(StorageError::ConfigurationError(format!("{name} is not set")));
            }
        }
        Ok(settings)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Which contents backend to use.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    GitHub(GitHubSettings),
    /// In-process store; contents are lost on restart.
    Memory,
}

/// Backend names accepted by `KODERSTORE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    GitHub,
    Memory,
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(BackendKind::GitHub),
            "memory" => Ok(BackendKind::Memory),
            other => Err(StorageError::ConfigurationError(format!(
                "unknown backend {other:?} (expected \"github\" or \"memory\")"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    backend: BackendConfig,
    admins: AdminSet,
    http_timeout: Duration,
    admin_concurrency: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationError` if the timeout or the admin concurrency limit
    /// is zero.
    pub fn new(
        backend: BackendConfig,
        admins: AdminSet,
        http_timeout: Duration,
        admin_concurrency: usize,
    ) -> StorageResult<Self> {
        if http_timeout.is_zero() {
            return Err(StorageError::ConfigurationError(
                "HTTP timeout must be greater than zero".into(),
            ));
        }
        if admin_concurrency == 0 {
            return Err(StorageError::ConfigurationError(
                "admin concurrency must be at least 1".into(),
            ));
        }
        Ok(Self {
            backend,
            admins,
            http_timeout,
            admin_concurrency,
        })
    }

    /// Resolve configuration from named values (normally the process environment).
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationError` if a required value is missing or any value
    /// cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| StorageError::ConfigurationError(format!("{key} is not set")))
        };

        let kind = get(ENV_BACKEND)
            .map(|v| v.parse::<BackendKind>())
            .transpose()?
            .unwrap_or(BackendKind::GitHub);

        let backend = match kind {
            BackendKind::Memory => BackendConfig::Memory,
            BackendKind::GitHub => BackendConfig::GitHub(GitHubSettings::new(
                get(ENV_GITHUB_API_URL).unwrap_or_else(|| DEFAULT_GITHUB_API_URL.into()),
                require(ENV_GITHUB_STORAGE_OWNER)?,
                require(ENV_GITHUB_STORAGE_REPO)?,
                require(ENV_GITHUB_TOKEN)?,
            )?),
        };

        let admins = AdminSet::parse(&get(ENV_ADMIN_IDS).unwrap_or_default())?;

        let timeout_secs = parse_number(ENV_HTTP_TIMEOUT_SECS, get(ENV_HTTP_TIMEOUT_SECS))?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let admin_concurrency = parse_number(ENV_ADMIN_CONCURRENCY, get(ENV_ADMIN_CONCURRENCY))?
            .unwrap_or(DEFAULT_ADMIN_CONCURRENCY);

        Self::new(
            backend,
            admins,
            Duration::from_secs(timeout_secs),
            admin_concurrency,
        )
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    pub fn admins(&self) -> &AdminSet {
        &self.admins
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn admin_concurrency(&self) -> usize {
        self.admin_concurrency
    }
}

fn parse_number<T: FromStr>(key: &str, value: Option<String>) -> StorageResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                StorageError::ConfigurationError(format!("{key} must be a number: {e}"))
            })
        })
        .transpose()
}
