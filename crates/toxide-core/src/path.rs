//! Path canonicalization and project-root location.
//!
//! Everything downstream of the CLI works in terms of [`CanonicalPath`]:
//! absolute, symlink-resolved, `~`-expanded. The root locator is the single
//! source of truth for "where is the project" — the invocation builder and
//! the process delegate never guess a directory on their own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToxideError};

/// An absolute, symlink-resolved, user-expanded filesystem path.
///
/// Invariant: canonicalizing a `CanonicalPath` again yields the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(PathBuf);

impl CanonicalPath {
    /// Resolve `path` to its canonical form.
    ///
    /// Expands a leading `~`, resolves `.`/`..` segments and follows symlinks
    /// to their real target via the platform realpath. Fails with
    /// [`ToxideError::PathResolution`] when the path does not exist or a
    /// symlink cycle is detected.
    pub fn canonicalize(path: impl AsRef<Path>) -> Result<Self> {
        let expanded = expand_home(path.as_ref());
        let resolved = std::fs::canonicalize(&expanded).map_err(|e| {
            ToxideError::PathResolution {
                path: expanded.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self(resolved))
    }

    /// The canonical parent directory, if any.
    pub fn parent(&self) -> Option<CanonicalPath> {
        // Parent of a canonical path is itself canonical.
        self.0.parent().map(|p| CanonicalPath(p.to_path_buf()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn is_dir(&self) -> bool {
        self.0.is_dir()
    }
}

impl AsRef<Path> for CanonicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Locate the project root for an invoking entry point.
///
/// Given a file (the invoking script or a runner config), returns its
/// canonical parent directory. Given a directory, returns that directory
/// canonicalized. Fails when the entry does not exist.
pub fn locate_root(entry: impl AsRef<Path>) -> Result<CanonicalPath> {
    let canonical = CanonicalPath::canonicalize(entry.as_ref())?;
    if canonical.is_dir() {
        return Ok(canonical);
    }
    canonical
        .parent()
        .ok_or_else(|| ToxideError::PathResolution {
            path: canonical.to_string(),
            reason: "entry point has no parent directory".to_string(),
        })
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Paths without a leading `~` are returned unchanged; so is `~` when no
/// home directory can be determined.
fn expand_home(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    if s == "~" {
        return dirs::home_dir().unwrap_or_else(|| path.to_path_buf());
    }
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
