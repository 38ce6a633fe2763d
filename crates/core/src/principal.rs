//! Principals and the administrator allow-list.
//!
//! A principal is whoever the OAuth callback vouched for. The core never interprets the identifier
//! beyond checking it is usable as a single path segment, because it becomes part of the
//! namespace path `users/<id>/`.

use crate::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A stable external identifier for a principal.
///
/// The identifier is trimmed on construction and must be a single, non-empty path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Creates a `PrincipalId`, rejecting values that could escape the namespace partition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the trimmed value is empty, is `.` or `..`, or
    /// contains a path separator or control character.
    pub fn new(input: impl AsRef<str>) -> StorageResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(StorageError::InvalidPath(
                "principal id cannot be empty".into(),
            ));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(StorageError::InvalidPath(format!(
                "principal id cannot be {trimmed:?}"
            )));
        }
        if trimmed
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(StorageError::InvalidPath(format!(
                "principal id contains a separator or control character: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PrincipalId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PrincipalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PrincipalId::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An authenticated end user as supplied by the OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Principal {
    pub fn new(id: PrincipalId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            avatar: None,
        }
    }
}

/// The set of principals allowed to read other principals' namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminSet(BTreeSet<PrincipalId>);

impl AdminSet {
    pub fn new(ids: impl IntoIterator<Item = PrincipalId>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Parses a comma-separated list such as `"123,456"`.
    ///
    /// Blank entries are ignored so that an empty or trailing-comma value is accepted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConfigurationError` if any non-blank entry is not a valid id.
    pub fn parse(value: &str) -> StorageResult<Self> {
        let ids = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                PrincipalId::new(s).map_err(|e| {
                    StorageError::ConfigurationError(format!("invalid administrator id: {e}"))
                })
            })
            .collect::<StorageResult<BTreeSet<_>>>()?;
        Ok(Self(ids))
    }

    pub fn contains(&self, id: &PrincipalId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_id_is_trimmed() {
        let id = PrincipalId::new("  123456789 ").unwrap();
        assert_eq!(id.as_str(), "123456789");
    }

    #[test]
    fn principal_id_rejects_separators_and_dots() {
        for bad in ["", "   ", ".", "..", "a/b", "a\\b", "a\nb"] {
            assert!(
                matches!(PrincipalId::new(bad), Err(StorageError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn admin_set_parses_comma_separated_ids() {
        let admins = AdminSet::parse(" 1, 2 ,,3,").unwrap();
        assert_eq!(admins.len(), 3);
        assert!(admins.contains(&PrincipalId::new("2").unwrap()));
        assert!(!admins.contains(&PrincipalId::new("4").unwrap()));
    }

    #[test]
    fn admin_set_empty_value_is_empty() {
        assert!(AdminSet::parse("").unwrap().is_empty());
    }

    #[test]
    fn admin_set_rejects_invalid_ids() {
        assert!(matches!(
            AdminSet::parse("1,../2"),
            Err(StorageError::ConfigurationError(_))
        ));
    }

    #[test]
    fn principal_deserialises_without_avatar() {
        let p: Principal = serde_json::from_str(r#"{"id":"42","username":"ada"}"#).unwrap();
        assert_eq!(p.id.as_str(), "42");
        assert_eq!(p.avatar, None);
    }
}
