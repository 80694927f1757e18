//! Path normalization
//!
//! Callers hand `DualStore` loosely formatted relative paths such as
//! `"/text//edgar/"`. Every operation first turns them into a
//! [`RelativePath`]: doubled separators collapsed, one trailing separator
//! removed. The same string is then rooted under the local prefix and
//! under the remote prefix.

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

/// Collapses every `"//"` into `"/"` and strips one trailing `"/"`.
///
/// Total and idempotent: `normalize(&normalize(p)) == normalize(p)`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut out = path.to_string();
    while out.contains("//") {
        out = out.replace("//", "/");
    }
    if out.ends_with('/') {
        out.pop();
    }
    out
}

/// A normalized path relative to a backend root
///
/// Holds no doubled separators and no trailing separator. A leading `/`
/// is kept when the caller supplied one; the root itself is the empty
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    /// Normalize `path` into a `RelativePath`
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(normalize(path.as_ref()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the backend root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the parent path, or `None` when the parent is the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.0.rfind('/') {
            Some(idx) if idx > 0 => Some(Self(self.0[..idx].to_string())),
            _ => None,
        }
    }

    /// Get the last path component
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Returns true if the path ends with `suffix`
    #[must_use]
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }

    /// Returns a copy of this path with `suffix` appended to the last component
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self::new(format!("{}{suffix}", self.0))
    }

    /// Roots this path under a local directory prefix
    ///
    /// An empty prefix leaves the path relative to the working directory.
    #[must_use]
    pub fn local_path(&self, prefix: &Path) -> PathBuf {
        let rel = self.0.trim_start_matches('/');
        if rel.is_empty() {
            prefix.to_path_buf()
        } else {
            prefix.join(rel)
        }
    }

    /// Roots this path under a remote prefix
    ///
    /// The result always starts with `/` except for the remote root, which
    /// is the empty string (the form cloud stores expect for their root).
    #[must_use]
    pub fn remote_path(&self, prefix: &str) -> Self {
        Self::new(format!("{prefix}/{}", self.0.trim_start_matches('/')))
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RelativePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RelativePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize("/text//edgar///by-index/"), "/text/edgar/by-index");
        assert_eq!(normalize("a////b"), "a/b");
    }

    #[test]
    fn test_normalize_strips_single_trailing_separator() {
        assert_eq!(normalize("/text/edgar/"), "/text/edgar");
        assert_eq!(normalize("/"), "");
        assert_eq!(normalize("//"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "", "/", "//", "///", "a", "/a", "a/", "a//", "//a//b//", "/x/y.txt",
            "dir///", "./rel//path/", "a/b/c", "////deep////",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_parent_and_file_name() {
        let path = RelativePath::new("/text/edgar/index.csv");
        assert_eq!(path.parent(), Some(RelativePath::new("/text/edgar")));
        assert_eq!(path.file_name(), Some("index.csv"));

        let top = RelativePath::new("/top.txt");
        assert_eq!(top.parent(), None);
        assert_eq!(top.file_name(), Some("top.txt"));

        assert!(RelativePath::new("/").is_root());
        assert_eq!(RelativePath::new("/").file_name(), None);
    }

    #[test]
    fn test_local_path_joins_under_prefix() {
        let path = RelativePath::new("/x/y.txt");
        assert_eq!(
            path.local_path(Path::new("/data")),
            PathBuf::from("/data/x/y.txt")
        );
        assert_eq!(path.local_path(Path::new("")), PathBuf::from("x/y.txt"));
        assert_eq!(
            RelativePath::new("/").local_path(Path::new("/data")),
            PathBuf::from("/data")
        );
    }

    #[test]
    fn test_remote_path_is_normalized_after_prefixing() {
        let path = RelativePath::new("/x/y.txt");
        assert_eq!(path.remote_path("").as_str(), "/x/y.txt");
        assert_eq!(path.remote_path("/").as_str(), "/x/y.txt");
        assert_eq!(path.remote_path("/cloud/").as_str(), "/cloud/x/y.txt");
        assert_eq!(RelativePath::new("x").remote_path("/cloud").as_str(), "/cloud/x");
        assert_eq!(RelativePath::new("").remote_path("").as_str(), "");
        assert_eq!(RelativePath::new("/").remote_path("/cloud").as_str(), "/cloud");
    }

    #[test]
    fn test_with_suffix() {
        let path = RelativePath::new("/tmp/var1.txt");
        assert_eq!(path.with_suffix(".gz").as_str(), "/tmp/var1.txt.gz");
        assert!(path.with_suffix(".gz").has_suffix(".gz"));
    }
}
