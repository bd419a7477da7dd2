//! Optional virtual filesystem capability.
//!
//! A virtual filesystem is plugged in through [`VfsProvider`]. Its paths are
//! absolute and `/`-separated; its locators are `<scheme>:<path>`. Listing
//! happens through a visitor the provider drives, mirroring the native
//! listing primitive of such filesystems.
//!
//! [`MemoryVfs`] is an in-memory provider used by embedders and tests.

use crate::error::{LociError, Result};
use crate::resource::ResourceStream;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Cursor;

/// Metadata of one virtual path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsAttributes {
    pub is_dir: bool,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// How a provider should drive a visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitAttributes {
    /// Descend into subdirectories
    pub recurse: bool,

    /// Visit the starting directory itself
    pub include_root: bool,

    /// Skip directories, visit files only
    pub leaves_only: bool,
}

impl VisitAttributes {
    /// Recurse, visiting files and directories below the root.
    pub const RECURSE: VisitAttributes = VisitAttributes {
        recurse: true,
        include_root: false,
        leaves_only: false,
    };
}

/// Callback a provider invokes for every visited path.
pub trait VfsVisitor {
    /// How this visitor wants to be driven.
    fn attributes(&self) -> VisitAttributes;

    /// Called once per visited path.
    fn visit(&mut self, path: &str, attributes: &VfsAttributes);
}

/// A pluggable virtual filesystem.
pub trait VfsProvider: fmt::Debug + Send + Sync {
    /// Locator scheme of this filesystem, e.g. `vfs`.
    fn scheme(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Metadata for `path`, or `None` if nothing exists there.
    fn attributes(&self, path: &str) -> Option<VfsAttributes>;

    /// Open the file at `path`.
    fn open(&self, path: &str) -> Result<ResourceStream>;

    /// Visit everything below `root` according to the visitor's attributes.
    fn visit(&self, root: &str, visitor: &mut dyn VfsVisitor) -> Result<()>;
}

/// Normalize a virtual path: leading separator, no trailing separator.
pub fn normalize_vfs_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

struct MemoryFile {
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
}

/// An in-memory virtual filesystem.
///
/// Directories are implicit: a directory exists as long as some file lives
/// below it.
pub struct MemoryVfs {
    scheme: String,
    files: RwLock<BTreeMap<String, MemoryFile>>,
}

impl MemoryVfs {
    /// Create an empty filesystem using the `vfs` scheme.
    pub fn new() -> Self {
        Self::with_scheme("vfs")
    }

    /// Create an empty filesystem with a custom scheme.
    pub fn with_scheme(scheme: impl Into<String>) -> Self {
        MemoryVfs {
            scheme: scheme.into(),
            files: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store a file, replacing any previous content.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let file = MemoryFile {
            bytes: bytes.into(),
            modified: Utc::now(),
        };
        self.files.write().insert(normalize_vfs_path(path), file);
    }

    /// Remove a file.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(&normalize_vfs_path(path)).is_some()
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Check if no file is stored.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn dir_attributes() -> VfsAttributes {
        VfsAttributes {
            is_dir: true,
            size: 0,
            last_modified: None,
        }
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryVfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryVfs")
            .field("scheme", &self.scheme)
            .field("files", &self.len())
            .finish()
    }
}

impl VfsProvider for MemoryVfs {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn attributes(&self, path: &str) -> Option<VfsAttributes> {
        let path = normalize_vfs_path(path);
        let files = self.files.read();
        if let Some(file) = files.get(&path) {
            return Some(VfsAttributes {
                is_dir: false,
                size: file.bytes.len() as u64,
                last_modified: Some(file.modified),
            });
        }
        let dir = if path == "/" { path } else { format!("{}/", path) };
        files
            .keys()
            .any(|name| name.starts_with(&dir))
            .then(Self::dir_attributes)
    }

    fn open(&self, path: &str) -> Result<ResourceStream> {
        let normalized = normalize_vfs_path(path);
        let files = self.files.read();
        let file = files
            .get(&normalized)
            .ok_or_else(|| LociError::not_found(format!("{}:{}", self.scheme, normalized)))?;
        Ok(Box::new(Cursor::new(file.bytes.clone())))
    }

    fn visit(&self, root: &str, visitor: &mut dyn VfsVisitor) -> Result<()> {
        let root = normalize_vfs_path(root);
        let root_attributes = self.attributes(&root).ok_or_else(|| {
            LociError::medium(format!("{}:{}", self.scheme, root), "no such directory")
        })?;
        let options = visitor.attributes();
        let prefix = if root == "/" {
            root.clone()
        } else {
            format!("{}/", root)
        };

        // Snapshot so the visitor runs without holding the lock
        let mut directories = BTreeSet::new();
        let mut leaves = BTreeMap::new();
        {
            let files = self.files.read();
            for (name, file) in files.range(prefix.clone()..) {
                let Some(relative) = name.strip_prefix(&prefix) else {
                    break;
                };
                let segments: Vec<&str> = relative.split('/').collect();
                if !options.recurse && segments.len() > 1 {
                    directories.insert(format!("{}{}", prefix, segments[0]));
                    continue;
                }
                for depth in 1..segments.len() {
                    directories.insert(format!("{}{}", prefix, segments[..depth].join("/")));
                }
                leaves.insert(
                    name.clone(),
                    VfsAttributes {
                        is_dir: false,
                        size: file.bytes.len() as u64,
                        last_modified: Some(file.modified),
                    },
                );
            }
        }

        if options.include_root && (!options.leaves_only || !root_attributes.is_dir) {
            visitor.visit(&root, &root_attributes);
        }

        let mut visited: BTreeMap<String, VfsAttributes> = leaves;
        if !options.leaves_only {
            for dir in directories {
                visited.insert(dir, Self::dir_attributes());
            }
        }
        for (path, attributes) in &visited {
            visitor.visit(path, attributes);
        }
        Ok(())
    }
}
