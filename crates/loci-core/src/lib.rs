//! # Loci Core Library
//!
//! This crate resolves location patterns such as `classpath:/META-INF/*.md`
//! or `file:/srv/app/**/*.toml` to the resources they address, across plain
//! files, archives, a layered class path and an optional virtual
//! filesystem. All media are accessed through one [`Resource`] interface
//! and matched with one glob syntax.
//!
//! ## Architecture
//!
//! - **Matcher** (`matcher`): `?`, `*` and `**` glob matching over `/`-separated paths
//! - **Location** (`location`): Location classification and root extraction
//! - **Resource** (`resource`): The resource interface and its backends
//! - **Archive** (`archive`): Archive locators and archive access
//! - **Class path** (`classpath`): Layered directory and archive search path
//! - **VFS** (`vfs`): Pluggable virtual filesystem capability
//! - **Finder** (`finder`): One finder per storage medium
//! - **Loader** (`loader`): Pattern resolution across all media
//! - **Cache** (`cache`): Advisory cache of values derived from resources
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use loci_core::{PathMatchingResourceLoader, Resource};
//!
//! let loader = PathMatchingResourceLoader::builder()
//!     .base_dir("/srv/app")
//!     .build();
//!
//! for resource in loader.resolve("config/**/*.toml")? {
//!     println!("{} ({} bytes)", resource.description(), resource.content_length()?);
//! }
//! # Ok::<(), loci_core::LociError>(())
//! ```

pub mod archive;
pub mod cache;
pub mod classpath;
pub mod config;
pub mod error;
pub mod finder;
pub mod loader;
pub mod location;
pub mod matcher;
pub mod resource;
pub mod vfs;

// Re-export commonly used types
pub use archive::{ArchiveLocator, ArchiveSource, SharedArchive};
pub use cache::ResourceCache;
pub use classpath::{ClassPath, ClassPathLayer};
pub use config::Config;
pub use error::{LociError, Result};
pub use finder::{
    ArchiveResourceFinder, ClassPathResourceFinder, FileResourceFinder, ResourceFinder,
    VfsResourceFinder,
};
pub use loader::{BundleRootRewriter, LoaderBuilder, LocatorRewriter, PathMatchingResourceLoader};
pub use location::{classify, extract_root, Classification, Medium, RootExtraction};
pub use matcher::{is_pattern, PathMatcher};
pub use resource::{
    ArchiveEntryResource, ClassPathResource, FileResource, Resource, ResourceKey, ResourceRef,
    ResourceSet, ResourceStream, UrlResource, VfsResource,
};
pub use vfs::{MemoryVfs, VfsAttributes, VfsProvider, VfsVisitor, VisitAttributes};
