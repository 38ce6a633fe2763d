/// Errors surfaced by the storage core.
///
/// Local validation failures (`Unauthenticated`, `Forbidden`, `InvalidPath`) are raised before any
/// remote call is made. Everything coming back from the contents API is mapped onto the remaining
/// variants so callers never have to inspect raw HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("not authorised to access namespace of principal {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("concurrency token for {0} is stale; re-read the file before writing again")]
    Conflict(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("remote contents API unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("remote contents API returned an unreadable response: {0}")]
    MalformedResponse(String),
    #[error("storage backend misconfigured: {0}")]
    ConfigurationError(String),
}

impl StorageError {
    /// `true` when the request was rejected without touching remote state.
    ///
    /// A `false` answer means the remote may have applied part of the operation (for example a
    /// write was accepted but its response could not be parsed); callers should re-read before
    /// retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StorageError::Unauthenticated
                | StorageError::Forbidden(_)
                | StorageError::NotFound(_)
                | StorageError::Conflict(_)
                | StorageError::InvalidPath(_)
        )
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::RemoteUnavailable(format!("request timed out: {err}"))
        } else if err.is_decode() {
            StorageError::MalformedResponse(err.to_string())
        } else {
            StorageError::RemoteUnavailable(err.to_string())
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
