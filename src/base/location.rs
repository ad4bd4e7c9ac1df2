//! Canonical locations of source units and directories.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A canonical, URI-like identifier for a source unit, manifest, or directory.
///
/// Locations are always `/`-separated, lexically normalized (no `.` or `..`
/// segments) and never end with a separator, so two spellings of the same
/// path compare equal. Symlink resolution happens before a `Location` is
/// built (see `FileSystemProvider::canonicalize`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(Arc<str>);

impl Location {
    /// Build a location from a path, normalizing it lexically.
    pub fn from_path(path: &Path) -> Self {
        let mut parts: Vec<String> = Vec::new();
        let mut absolute = false;
        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    parts.push(prefix.as_os_str().to_string_lossy().replace('\\', "/"))
                }
                Component::RootDir => absolute = true,
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.last().is_some_and(|p| p != "..") {
                        parts.pop();
                    } else if !absolute {
                        parts.push("..".to_string());
                    }
                }
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            }
        }
        let joined = parts.join("/");
        if absolute {
            Self(Arc::from(format!("/{joined}")))
        } else {
            Self(Arc::from(joined))
        }
    }

    /// Build a location from a string path.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::from_path(Path::new(&path.as_ref().replace('\\', "/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.0.as_ref())
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension of the last segment, without the dot.
    ///
    /// Dot-files such as `.hidden` have no extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// The containing directory, if any.
    pub fn parent(&self) -> Option<Location> {
        let idx = self.0.rfind('/')?;
        if idx == 0 {
            if self.0.len() > 1 {
                return Some(Self(Arc::from("/")));
            }
            return None;
        }
        Some(Self(Arc::from(&self.0[..idx])))
    }

    /// Append a relative segment.
    pub fn join(&self, segment: &str) -> Location {
        Self::from_path(&self.to_path_buf().join(segment))
    }

    /// True when `self` lies strictly below `dir`.
    pub fn is_descendant_of(&self, dir: &Location) -> bool {
        let dir = dir.as_str();
        if dir == "/" {
            return self.0.len() > 1 && self.0.starts_with('/');
        }
        self.0.len() > dir.len()
            && self.0.starts_with(dir)
            && self.0.as_bytes()[dir.len()] == b'/'
    }

    /// True when `self` is `dir` or lies below it.
    pub fn is_within(&self, dir: &Location) -> bool {
        self == dir || self.is_descendant_of(dir)
    }

    /// Number of `/`-separated segments, used to pick the deepest package root.
    pub fn depth(&self) -> usize {
        self.0.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({})", self.0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

impl From<&str> for Location {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl AsRef<str> for Location {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
