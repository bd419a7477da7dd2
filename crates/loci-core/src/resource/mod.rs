//! The resource abstraction.
//!
//! A [`Resource`] is a handle to one addressable unit of content, wherever
//! it lives: a file, an entry inside an archive, a class path entry or a
//! path in a virtual filesystem. Handles are cheap values. They never cache
//! content; every [`Resource::open_stream`] call opens a fresh stream.
//!
//! ## Identity
//!
//! Two resources are the same resource when their [`ResourceKey`]s are
//! equal. The key is the human-readable description, plus the normalized
//! locator for variants that carry one, so that two finders reaching the
//! same physical location collapse into one result.

mod archive;
mod class_path;
mod file;
mod url;
mod vfs;

pub use self::archive::ArchiveEntryResource;
pub use self::class_path::ClassPathResource;
pub use self::file::FileResource;
pub use self::url::UrlResource;
pub use self::vfs::VfsResource;

use crate::archive::{ArchiveLocator, SharedArchive};
use crate::error::{LociError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared handle to a resource of any backend.
pub type ResourceRef = Arc<dyn Resource>;

/// A byte stream opened from a resource.
pub type ResourceStream = Box<dyn Read + Send>;

/// Capabilities every resource backend exposes.
///
/// Only [`exists`](Self::exists), [`open_stream`](Self::open_stream),
/// [`locator`](Self::locator) and [`description`](Self::description) are
/// required; the rest have defaults that either derive their answer from
/// those or fail with the error the taxonomy prescribes.
pub trait Resource: fmt::Debug + Send + Sync {
    /// Whether the resource physically exists right now. Never cached.
    fn exists(&self) -> bool;

    /// Whether the content can be read.
    fn is_readable(&self) -> bool {
        self.exists()
    }

    /// Whether the resource is a file in the local filesystem.
    fn is_file(&self) -> bool {
        false
    }

    /// Open a fresh stream over the content.
    ///
    /// Fails with [`LociError::NotFound`] if the resource does not exist.
    fn open_stream(&self) -> Result<ResourceStream>;

    /// The backend locator of this resource.
    fn locator(&self) -> Result<::url::Url>;

    /// The local file backing this resource.
    fn to_file(&self) -> Result<PathBuf> {
        Err(LociError::not_a_file(self.description()))
    }

    /// Content length in bytes.
    ///
    /// The default drains a fresh stream and counts, which is O(n).
    /// Backends with cheap metadata override it.
    fn content_length(&self) -> Result<u64> {
        let mut stream = self.open_stream()?;
        Ok(io::copy(&mut stream, &mut io::sink())?)
    }

    /// Last modification time.
    fn last_modified(&self) -> Result<DateTime<Utc>> {
        Err(LociError::not_resolvable(
            self.description(),
            "a modification time",
        ))
    }

    /// A resource at `relative_path` relative to this one.
    fn create_relative(&self, _relative_path: &str) -> Result<ResourceRef> {
        Err(LociError::not_supported(
            "create_relative",
            self.description(),
        ))
    }

    /// The final path segment, if the backend has a notion of one.
    fn filename(&self) -> Option<String> {
        None
    }

    /// Human-readable description, used for identity and logging.
    fn description(&self) -> String;

    /// Identity key.
    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.description(), None)
    }

    /// The archive locator of this resource, for archive-backed variants.
    fn archive_locator(&self) -> Option<ArchiveLocator> {
        None
    }

    /// An open archive this resource was obtained through, if any.
    fn shared_archive(&self) -> Option<SharedArchive> {
        None
    }
}

impl fmt::Display for dyn Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl PartialEq for dyn Resource {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for dyn Resource {}

/// Identity of a resource: its description and, where available, its
/// normalized locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    description: String,
    locator: Option<String>,
}

impl ResourceKey {
    /// Create a key.
    pub fn new(description: impl Into<String>, locator: Option<String>) -> Self {
        ResourceKey {
            description: description.into(),
            locator,
        }
    }

    /// The description part.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The locator part.
    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }
}

/// Duplicate-free, insertion-ordered collection of resources.
///
/// The first resource inserted under a key wins; later duplicates are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    entries: IndexMap<ResourceKey, ResourceRef>,
}

impl ResourceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resource. Returns false if an equal one was already present.
    pub fn insert(&mut self, resource: ResourceRef) -> bool {
        let key = resource.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, resource);
        true
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check membership by identity.
    pub fn contains(&self, resource: &dyn Resource) -> bool {
        self.entries.contains_key(&resource.key())
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceRef> {
        self.entries.values()
    }

    /// Descriptions in insertion order.
    pub fn descriptions(&self) -> Vec<String> {
        self.entries
            .keys()
            .map(|key| key.description().to_string())
            .collect()
    }

    /// Keep at most the first `limit` resources.
    pub fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit);
    }

    /// Convert into a vector in insertion order.
    pub fn into_vec(self) -> Vec<ResourceRef> {
        self.entries.into_values().collect()
    }
}

impl Extend<ResourceRef> for ResourceSet {
    fn extend<I: IntoIterator<Item = ResourceRef>>(&mut self, iter: I) {
        for resource in iter {
            self.insert(resource);
        }
    }
}

impl FromIterator<ResourceRef> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = ResourceRef>>(iter: I) -> Self {
        let mut set = ResourceSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for ResourceSet {
    type Item = ResourceRef;
    type IntoIter = indexmap::map::IntoValues<ResourceKey, ResourceRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a ResourceRef;
    type IntoIter = indexmap::map::Values<'a, ResourceKey, ResourceRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

/// Map an I/O error from opening content to the taxonomy.
pub(crate) fn open_error(err: io::Error, description: String) -> LociError {
    if err.kind() == io::ErrorKind::NotFound {
        LociError::not_found(description)
    } else {
        LociError::Io(err)
    }
}
