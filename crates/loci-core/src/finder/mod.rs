//! Per-medium resource finders.
//!
//! A finder enumerates the resources below a base resource whose relative
//! path matches a sub-pattern. Finders hold no mutable state, so one
//! instance serves any number of concurrent calls.

mod archive;
mod class_path;
mod file;
mod vfs;

pub use self::archive::ArchiveResourceFinder;
pub use self::class_path::ClassPathResourceFinder;
pub use self::file::FileResourceFinder;
pub use self::vfs::VfsResourceFinder;

use crate::error::Result;
use crate::resource::ResourceRef;

/// Enumerates matching resources within one storage medium.
pub trait ResourceFinder: Send + Sync {
    /// Finder name for logging.
    fn name(&self) -> &'static str;

    /// Every resource below `base` whose path relative to `base` matches
    /// `sub_pattern`.
    ///
    /// Errors reaching the medium are returned to the caller, which decides
    /// whether to absorb them.
    fn find(&self, base: &ResourceRef, sub_pattern: &str) -> Result<Vec<ResourceRef>>;
}
