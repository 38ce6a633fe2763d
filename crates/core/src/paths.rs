//! Remote path construction for principal namespaces.
//!
//! Every principal owns the directory `users/<principal-id>/` in the storage repository. All
//! remote paths handed to the contents API are built here so that a user-supplied name can never
//! resolve outside its owner's namespace.
//!
//! A relative name may contain sub-directories (`photos/2024/cat.png`) but must not start with a
//! separator, contain `.`/`..` or empty segments, backslashes, or control characters.

use crate::constants::USERS_DIR_NAME;
use crate::{PrincipalId, StorageError, StorageResult};

/// Returns the root directory of a principal's namespace, e.g. `users/42`.
pub fn namespace_root(principal: &PrincipalId) -> String {
    format!("{USERS_DIR_NAME}/{principal}")
}

/// Returns the directory holding every namespace.
pub fn namespaces_root() -> &'static str {
    USERS_DIR_NAME
}

/// Builds the canonical storage path `users/<principal>/<relative_name>`.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` if `relative_name` is empty, begins with a separator, or
/// contains a `..`, `.` or empty segment, a backslash or a control character.
pub fn build_path(principal: &PrincipalId, relative_name: &str) -> StorageResult<String> {
    validate_relative_name(relative_name)?;
    Ok(format!("{}/{relative_name}", namespace_root(principal)))
}

/// Builds the path of a directory inside a namespace; `None` or an empty value is the root.
///
/// A single trailing `/` is tolerated so that directory names copied from a listing work.
///
/// # Errors
///
/// Same rules as [`build_path`].
pub fn build_dir_path(principal: &PrincipalId, relative_dir: Option<&str>) -> StorageResult<String> {
    match relative_dir {
        None | Some("") => Ok(namespace_root(principal)),
        Some(dir) => {
            let dir = match dir.strip_suffix('/') {
                Some(trimmed) if !trimmed.is_empty() => trimmed,
                _ => dir,
            };
            build_path(principal, dir)
        }
    }
}

/// Returns the final segment of a relative name (the name shown in listings).
pub fn file_name(relative_name: &str) -> &str {
    relative_name.rsplit('/').next().unwrap_or(relative_name)
}

fn validate_relative_name(relative_name: &str) -> StorageResult<()> {
    if relative_name.is_empty() {
        return Err(StorageError::InvalidPath("file name cannot be empty".into()));
    }
    if relative_name.starts_with('/') {
        return Err(StorageError::InvalidPath(format!(
            "{relative_name:?} must be relative to the namespace"
        )));
    }
    if relative_name.chars().any(|c| c == '\\' || c.is_control()) {
        return Err(StorageError::InvalidPath(format!(
            "{relative_name:?} contains a backslash or control character"
        )));
    }
    for segment in relative_name.split('/') {
        match segment {
            "" => {
                return Err(StorageError::InvalidPath(format!(
                    "{relative_name:?} contains an empty segment"
                )))
            }
            "." | ".." => {
                return Err(StorageError::InvalidPath(format!(
                    "{relative_name:?} contains a {segment:?} segment"
                )))
            }
            _ => {}
        }
    }
    Ok(())
}
