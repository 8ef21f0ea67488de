//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the identifiers the
//! reconciler keys on. Each newtype ensures validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// VaultPath
// ============================================================================

/// A vault-relative file path using `/` separators
///
/// The same value names the local file, the remote object and the
/// sync-state key, e.g. `"notes/daily/2026-01-01.md"`.
///
/// Invariants: non-empty, no leading or trailing `/`, no empty, `.` or
/// `..` components, no backslashes or NUL bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VaultPath(String);

impl VaultPath {
    /// Create a new VaultPath
    ///
    /// # Errors
    /// Returns error if the path violates any of the invariants above
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Err(DomainError::InvalidPath("path cannot be empty".to_string()));
        }
        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "path must be relative to the vault: {path}"
            )));
        }
        if path.contains('\\') || path.contains('\0') {
            return Err(DomainError::InvalidPath(format!(
                "path contains invalid characters: {path}"
            )));
        }
        for component in path.split('/') {
            if component.is_empty() || component == "." || component == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "path contains invalid component '{component}': {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// Build a VaultPath from a filesystem path relative to the vault root
    ///
    /// # Errors
    /// Returns error for absolute paths, traversal or non-UTF-8 names
    pub fn from_relative(relative: &Path) -> Result<Self, DomainError> {
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        DomainError::InvalidPath(format!(
                            "path is not valid UTF-8: {}",
                            relative.display()
                        ))
                    })?;
                    parts.push(part);
                }
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "path is not vault-relative: {}",
                        relative.display()
                    )))
                }
            }
        }
        Self::new(parts.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the path against a vault root directory
    #[must_use]
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
    }

    /// The last component, e.g. `"a.md"` for `"notes/a.md"`
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The directory part, or `None` for top-level files
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.0.rfind('/').map(|idx| &self.0[..idx])
    }

    /// The extension of the file name, without the dot
    ///
    /// Dotfiles such as `.gitignore` have no extension.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Replace the last component
    ///
    /// # Errors
    /// Returns error if `name` is not a single valid component
    pub fn with_file_name(&self, name: &str) -> Result<Self, DomainError> {
        if name.contains('/') {
            return Err(DomainError::InvalidPath(format!(
                "file name must be a single component: {name}"
            )));
        }
        match self.parent() {
            Some(parent) => Self::new(format!("{parent}/{name}")),
            None => Self::new(name.to_string()),
        }
    }

    /// True if `self` is `prefix` or lies underneath it
    #[must_use]
    pub fn is_within(&self, prefix: &VaultPath) -> bool {
        self.0 == prefix.0
            || (self.0.starts_with(prefix.as_str())
                && self.0.as_bytes().get(prefix.0.len()) == Some(&b'/'))
    }
}

impl Display for VaultPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VaultPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for VaultPath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<VaultPath> for String {
    fn from(path: VaultPath) -> Self {
        path.0
    }
}

// ============================================================================
// RemoteId
// ============================================================================

/// Opaque object identifier assigned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace/control characters
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id:?}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}
