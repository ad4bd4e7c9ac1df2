//! File system access for the workspace builder.
//!
//! The builder never touches `std::fs` directly: everything goes through a
//! [`FileSystemProvider`], so tests can run against [`MemoryFileSystem`].

use std::collections::BTreeMap;
use std::io;

use parking_lot::RwLock;
use walkdir::WalkDir;

use crate::base::Location;

pub trait FileSystemProvider: Send + Sync {
    fn read_to_string(&self, location: &Location) -> io::Result<String>;

    fn is_dir(&self, location: &Location) -> bool;

    fn exists(&self, location: &Location) -> bool;

    /// Resolve symlinks. Locations that cannot be resolved (for example
    /// because they no longer exist) are returned unchanged.
    fn canonicalize(&self, location: &Location) -> Location;

    /// Every file below `dir`, in sorted order.
    fn walk(&self, dir: &Location) -> Vec<Location>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystemProvider for OsFileSystem {
    fn read_to_string(&self, location: &Location) -> io::Result<String> {
        std::fs::read_to_string(location.to_path_buf())
    }

    fn is_dir(&self, location: &Location) -> bool {
        location.to_path_buf().is_dir()
    }

    fn exists(&self, location: &Location) -> bool {
        location.to_path_buf().exists()
    }

    /// A path that no longer exists is resolved through its nearest existing
    /// ancestor, so deletions reported through a symlink still map to the
    /// real location.
    fn canonicalize(&self, location: &Location) -> Location {
        let path = location.to_path_buf();
        let mut missing = Vec::new();
        let mut current = path.as_path();
        loop {
            match std::fs::canonicalize(current) {
                Ok(real) => {
                    let real = missing.iter().rev().fold(real, |acc, name| acc.join(name));
                    return Location::from_path(&real);
                }
                Err(_) => {
                    let (Some(parent), Some(name)) = (current.parent(), current.file_name()) else {
                        return location.clone();
                    };
                    missing.push(name);
                    current = parent;
                }
            }
        }
    }

    fn walk(&self, dir: &Location) -> Vec<Location> {
        let mut files: Vec<Location> = WalkDir::new(dir.to_path_buf())
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("[BUILD] skipping unreadable entry under {}: {}", dir, e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| Location::from_path(entry.path()))
            .collect();
        files.sort();
        files
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<Location, String>,
    /// Alias directory or file -> real location.
    aliases: BTreeMap<Location, Location>,
}

/// An in-memory file system.
///
/// Directories exist implicitly while they contain a file. Aliases behave
/// like symlinks: reading through an alias reads the target, and
/// [`FileSystemProvider::canonicalize`] maps alias paths to real paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: RwLock<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, location: impl Into<Location>, text: impl Into<String>) {
        self.state.write().files.insert(location.into(), text.into());
    }

    /// Remove a file, or every file below a directory.
    pub fn remove(&self, location: impl Into<Location>) {
        let location = location.into();
        self.state
            .write()
            .files
            .retain(|file, _| !file.is_within(&location));
    }

    /// Make `alias` point at `target`.
    pub fn alias(&self, alias: impl Into<Location>, target: impl Into<Location>) {
        self.state.write().aliases.insert(alias.into(), target.into());
    }

    fn resolve(state: &MemoryState, location: &Location) -> Location {
        let alias = state
            .aliases
            .iter()
            .filter(|(alias, _)| location.is_within(alias))
            .max_by_key(|(alias, _)| alias.depth());
        match alias {
            Some((alias, target)) if alias == location => target.clone(),
            Some((alias, target)) => {
                let rest = &location.as_str()[alias.as_str().len() + 1..];
                target.join(rest)
            }
            None => location.clone(),
        }
    }
}

impl FileSystemProvider for MemoryFileSystem {
    fn read_to_string(&self, location: &Location) -> io::Result<String> {
        let state = self.state.read();
        let real = Self::resolve(&state, location);
        state.files.get(&real).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{location} does not exist"))
        })
    }

    fn is_dir(&self, location: &Location) -> bool {
        let state = self.state.read();
        let real = Self::resolve(&state, location);
        state.files.keys().any(|file| file.is_descendant_of(&real))
    }

    fn exists(&self, location: &Location) -> bool {
        let state = self.state.read();
        let real = Self::resolve(&state, location);
        state.files.keys().any(|file| file.is_within(&real))
    }

    fn canonicalize(&self, location: &Location) -> Location {
        Self::resolve(&self.state.read(), location)
    }

    fn walk(&self, dir: &Location) -> Vec<Location> {
        let state = self.state.read();
        let real = Self::resolve(&state, dir);
        state
            .files
            .keys()
            .filter(|file| file.is_descendant_of(&real))
            .cloned()
            .collect()
    }
}
