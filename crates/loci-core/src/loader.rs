//! Pattern resolution.
//!
//! [`PathMatchingResourceLoader`] turns a location pattern into the set of
//! resources it addresses:
//!
//! 1. A literal location is looked up directly. Class path locations
//!    yield one resource per layer exposing the name.
//! 2. A pattern is split into its pattern-free root and the remainder.
//! 3. The root is looked up as a literal, giving the base resources.
//! 4. Each base resource is handed to the finder for its medium, picked by
//!    the scheme of its locator. Bundle locators are first rewritten by a
//!    registered [`LocatorRewriter`].
//! 5. Everything found is merged into one duplicate-free [`ResourceSet`].
//!
//! A failure searching one base resource is logged and skipped; the other
//! bases still contribute.
//!
//! ## Example
//!
//! ```rust,no_run
//! use loci_core::PathMatchingResourceLoader;
//!
//! let loader = PathMatchingResourceLoader::builder()
//!     .class_path_entries(["target/classes", "lib/commons.jar"])
//!     .build();
//!
//! for resource in loader.resolve("classpath:META-INF/**/*.md")? {
//!     println!("{}", resource.description());
//! }
//! # Ok::<(), loci_core::LociError>(())
//! ```

use crate::cache::ResourceCache;
use crate::classpath::ClassPath;
use crate::error::{LociError, Result};
use crate::finder::{
    ArchiveResourceFinder, ClassPathResourceFinder, FileResourceFinder, ResourceFinder,
    VfsResourceFinder,
};
use crate::location::{class_path_prefix_len, classify, scheme_of, Medium, RootExtraction, FILE_SCHEME};
use crate::matcher::PathMatcher;
use crate::resource::{
    ArchiveEntryResource, ClassPathResource, FileResource, Resource, ResourceRef, ResourceSet,
    UrlResource, VfsResource,
};
use crate::vfs::VfsProvider;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Rewrites locators that cannot be searched directly into ones that can.
///
/// Bundle locators of a module runtime are the typical case: they only
/// become searchable once mapped onto the file or archive they live in.
pub trait LocatorRewriter: fmt::Debug + Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// The searchable locator for `locator`, or `None` to leave it alone.
    fn rewrite(&self, locator: &Url) -> Option<Url>;
}

/// Maps bundle hosts onto base locators.
///
/// `bundleresource://12.fwk/META-INF/` becomes `<base>/META-INF/` when
/// host `12.fwk` is mapped to `<base>`.
#[derive(Debug, Default, Clone)]
pub struct BundleRootRewriter {
    roots: HashMap<String, Url>,
}

impl BundleRootRewriter {
    /// Create a rewriter with no mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map bundle `host` to `base`. The base should end with a separator.
    pub fn map(mut self, host: impl Into<String>, base: Url) -> Self {
        self.roots.insert(host.into(), base);
        self
    }
}

impl LocatorRewriter for BundleRootRewriter {
    fn name(&self) -> &str {
        "bundle-root"
    }

    fn rewrite(&self, locator: &Url) -> Option<Url> {
        let base = self.roots.get(locator.host_str()?)?;
        base.join(locator.path().trim_start_matches('/')).ok()
    }
}

/// Resolves location patterns across files, archives, the class path and
/// an optional virtual filesystem.
///
/// The loader is `Send + Sync`; one instance serves concurrent calls.
pub struct PathMatchingResourceLoader {
    matcher: Arc<PathMatcher>,
    base_dir: PathBuf,
    class_path: Arc<ClassPath>,
    file_finder: FileResourceFinder,
    archive_finder: ArchiveResourceFinder,
    class_path_finder: ClassPathResourceFinder,
    vfs_finder: VfsResourceFinder,
    rewriters: RwLock<Vec<Arc<dyn LocatorRewriter>>>,
    cache: Option<Arc<ResourceCache>>,
}

impl PathMatchingResourceLoader {
    /// Start building a loader.
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    /// The matcher used by every finder.
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Base directory for relative plain paths.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The class path searched by `classpath:` locations.
    pub fn class_path(&self) -> &Arc<ClassPath> {
        &self.class_path
    }

    /// The advisory cache, if one was configured.
    pub fn cache(&self) -> Option<&Arc<ResourceCache>> {
        self.cache.as_ref()
    }

    /// True if a virtual filesystem provider is plugged in.
    pub fn vfs_active(&self) -> bool {
        self.vfs_finder.is_active()
    }

    /// The plugged-in virtual filesystem provider.
    pub fn vfs_provider(&self) -> Option<&Arc<dyn VfsProvider>> {
        self.vfs_finder.provider()
    }

    /// Register a locator rewriter. Rewriters are tried in registration order.
    pub fn register_rewriter(&self, rewriter: Arc<dyn LocatorRewriter>) {
        debug!(rewriter = rewriter.name(), "Registered locator rewriter");
        self.rewriters.write().push(rewriter);
    }

    /// The resource a literal location addresses.
    ///
    /// No storage is touched; the returned resource may not exist.
    pub fn get_resource(&self, location: &str) -> Result<ResourceRef> {
        if let Some(prefix_len) = class_path_prefix_len(location) {
            return Ok(Arc::new(ClassPathResource::new(
                &location[prefix_len..],
                Arc::clone(&self.class_path),
            )));
        }

        let Some(scheme) = scheme_of(location) else {
            return Ok(Arc::new(self.plain_file(location)));
        };

        match self.medium_of(scheme) {
            Medium::Archive => Ok(Arc::new(ArchiveEntryResource::parse(location)?)),
            Medium::Vfs => match self
                .vfs_finder
                .provider()
                .filter(|provider| provider.scheme().eq_ignore_ascii_case(scheme))
            {
                Some(provider) => Ok(Arc::new(VfsResource::new(
                    Arc::clone(provider),
                    &location[scheme.len() + 1..],
                ))),
                None => Ok(Arc::new(UrlResource::parse(location)?)),
            },
            _ if scheme.eq_ignore_ascii_case(FILE_SCHEME) => {
                Ok(Arc::new(FileResource::new(file_url_to_path(location)?)))
            }
            _ => Ok(Arc::new(UrlResource::parse(location)?)),
        }
    }

    /// Resolve `pattern` to every resource it addresses.
    ///
    /// Literal locations resolve to the resources that exist. Errors
    /// interpreting the location are returned; errors searching a single
    /// base resource are logged and that base contributes nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&self, pattern: &str) -> Result<ResourceSet> {
        let mut resolved = ResourceSet::new();
        if pattern.is_empty() {
            return Ok(resolved);
        }

        let classification = classify(pattern);
        if !classification.is_pattern() {
            resolved.extend(self.find_literal(pattern)?);
            return Ok(resolved);
        }

        let RootExtraction { root, remainder } = classification.extract_root();
        let bases = self.find_literal(&root)?;
        debug!(root = %root, remainder = %remainder, bases = bases.len(), "Resolved search roots");

        for base in &bases {
            match self.dispatch(base, &remainder) {
                Ok(found) => resolved.extend(found),
                Err(err) if err.is_absorbable() => {
                    debug!(base = %base.description(), error = %err, "Skipping unreachable search root");
                }
                Err(err) => {
                    warn!(base = %base.description(), error = %err, "Skipping search root");
                }
            }
        }

        debug!(found = resolved.len(), "Resolution finished");
        Ok(resolved)
    }

    /// A value derived from `resource`, served from the cache when one is
    /// configured.
    pub fn computed<T>(
        &self,
        resource: &dyn Resource,
        compute: impl FnOnce(&dyn Resource) -> Result<T>,
    ) -> Result<T>
    where
        T: Any + Clone + Send + Sync,
    {
        match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(&resource.key(), || compute(resource)),
            None => compute(resource),
        }
    }

    /// Resources a literal location addresses that exist right now.
    ///
    /// A bundle locator counts as existing when its rewritten form does.
    fn find_literal(&self, location: &str) -> Result<Vec<ResourceRef>> {
        if let Some(prefix_len) = class_path_prefix_len(location) {
            return Ok(self.class_path_finder.find(&location[prefix_len..]));
        }
        let resource = self.get_resource(location)?;
        let exists = resource.exists()
            || self
                .rewritten(&resource)
                .is_some_and(|rewritten| rewritten.exists());
        Ok(if exists {
            vec![resource]
        } else {
            debug!(resource = %resource.description(), "Literal location does not exist");
            Vec::new()
        })
    }

    fn dispatch(&self, base: &ResourceRef, sub_pattern: &str) -> Result<Vec<ResourceRef>> {
        let medium = if base.archive_locator().is_some() {
            Medium::Archive
        } else {
            base.locator()
                .map_or(Medium::FileLike, |locator| self.medium_of(locator.scheme()))
        };

        let finder: &dyn ResourceFinder = match medium {
            Medium::Archive => &self.archive_finder,
            Medium::Vfs => &self.vfs_finder,
            Medium::Bundle => match self.rewritten(base) {
                Some(rewritten) => {
                    debug!(base = %base.description(), rewritten = %rewritten.description(), "Searching rewritten bundle locator");
                    return self.dispatch(&rewritten, sub_pattern);
                }
                None => &self.file_finder,
            },
            Medium::FileLike => &self.file_finder,
        };

        debug!(base = %base.description(), finder = finder.name(), pattern = sub_pattern, "Dispatching");
        finder.find(base, sub_pattern)
    }

    /// The searchable resource behind a bundle locator.
    ///
    /// Returns `None` for other locators, when no rewriter applies, or when
    /// the rewritten locator is itself a bundle locator.
    fn rewritten(&self, resource: &ResourceRef) -> Option<ResourceRef> {
        let locator = resource.locator().ok()?;
        if Medium::of_scheme(locator.scheme()) != Medium::Bundle {
            return None;
        }
        let rewritten = self
            .rewriters
            .read()
            .iter()
            .find_map(|rewriter| rewriter.rewrite(&locator))?;
        if Medium::of_scheme(rewritten.scheme()) == Medium::Bundle {
            warn!(locator = %locator, rewritten = %rewritten, "Rewriter produced another bundle locator");
            return None;
        }
        self.get_resource(rewritten.as_str()).ok()
    }

    /// The medium behind `scheme`, with the plugged-in provider's own
    /// scheme taking precedence.
    fn medium_of(&self, scheme: &str) -> Medium {
        match self.vfs_finder.provider() {
            Some(provider) if provider.scheme().eq_ignore_ascii_case(scheme) => Medium::Vfs,
            _ => Medium::of_scheme(scheme),
        }
    }

    fn plain_file(&self, location: &str) -> FileResource {
        if location.is_empty() {
            return FileResource::new(format!("{}/", self.base_dir.display()));
        }
        let path = Path::new(location);
        if path.is_absolute() {
            FileResource::new(path)
        } else {
            FileResource::new(format!("{}/{}", self.base_dir.display(), location))
        }
    }
}

impl fmt::Debug for PathMatchingResourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatchingResourceLoader")
            .field("base_dir", &self.base_dir)
            .field("class_path", &self.class_path)
            .field("vfs_active", &self.vfs_finder.is_active())
            .field("rewriters", &self.rewriters.read().len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Convert a `file:` locator to a path, keeping a trailing separator.
fn file_url_to_path(location: &str) -> Result<PathBuf> {
    let url = Url::parse(location)
        .map_err(|err| LociError::invalid_location(location, err.to_string()))?;
    let path = url
        .to_file_path()
        .map_err(|()| LociError::invalid_location(location, "not a local file locator"))?;
    if location.ends_with('/') && !path.as_os_str().to_string_lossy().ends_with('/') {
        let mut rendered = path.into_os_string();
        rendered.push("/");
        return Ok(PathBuf::from(rendered));
    }
    Ok(path)
}

/// Builder for [`PathMatchingResourceLoader`].
#[derive(Default)]
pub struct LoaderBuilder {
    matcher: Option<PathMatcher>,
    base_dir: Option<PathBuf>,
    class_path: Option<Arc<ClassPath>>,
    vfs_provider: Option<Arc<dyn VfsProvider>>,
    rewriters: Vec<Arc<dyn LocatorRewriter>>,
    cache: Option<Arc<ResourceCache>>,
    follow_links: bool,
    max_depth: Option<usize>,
}

impl LoaderBuilder {
    /// Use a custom matcher.
    pub fn matcher(mut self, matcher: PathMatcher) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Base directory for relative plain paths. Defaults to the working directory.
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// The class path searched by `classpath:` locations.
    pub fn class_path(mut self, class_path: impl Into<Arc<ClassPath>>) -> Self {
        self.class_path = Some(class_path.into());
        self
    }

    /// Build the class path from entry paths.
    pub fn class_path_entries<I, P>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.class_path(ClassPath::from_entries(entries))
    }

    /// Plug in a virtual filesystem.
    pub fn vfs_provider(mut self, provider: Arc<dyn VfsProvider>) -> Self {
        self.vfs_provider = Some(provider);
        self
    }

    /// Register a locator rewriter.
    pub fn rewriter(mut self, rewriter: Arc<dyn LocatorRewriter>) -> Self {
        self.rewriters.push(rewriter);
        self
    }

    /// Attach an advisory cache.
    pub fn cache(mut self, cache: Arc<ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Follow symbolic links in directory walks.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Limit the depth of directory walks.
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Build the loader.
    pub fn build(self) -> PathMatchingResourceLoader {
        let matcher = Arc::new(self.matcher.unwrap_or_default());
        let base_dir = self
            .base_dir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let class_path = self
            .class_path
            .unwrap_or_else(|| Arc::new(ClassPath::empty()));

        debug!(
            base_dir = %base_dir.display(),
            class_path_layers = class_path.len(),
            "Building resource loader"
        );

        PathMatchingResourceLoader {
            file_finder: FileResourceFinder::new(Arc::clone(&matcher))
                .follow_links(self.follow_links)
                .max_depth(self.max_depth),
            archive_finder: ArchiveResourceFinder::new(Arc::clone(&matcher)),
            class_path_finder: ClassPathResourceFinder::new(Arc::clone(&class_path)),
            vfs_finder: VfsResourceFinder::probe(Arc::clone(&matcher), self.vfs_provider),
            rewriters: RwLock::new(self.rewriters),
            cache: self.cache,
            matcher,
            base_dir,
            class_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_archive;
    use crate::vfs::MemoryVfs;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("data/sub")).unwrap();
        fs::write(root.join("data/a.txt"), "a").unwrap();
        fs::write(root.join("data/sub/b.txt"), "b").unwrap();
        fs::write(root.join("data/sub/c.csv"), "c").unwrap();
        temp_dir
    }

    fn loader(root: &Path) -> PathMatchingResourceLoader {
        PathMatchingResourceLoader::builder().base_dir(root).build()
    }

    fn files(set: &ResourceSet, root: &Path) -> Vec<String> {
        let mut names: Vec<String> = set
            .iter()
            .map(|resource| {
                let path = resource.to_file().unwrap();
                crate::location::to_slash_path(path.strip_prefix(root).unwrap())
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_empty_pattern() {
        let temp_dir = fixture();
        assert!(loader(temp_dir.path()).resolve("").unwrap().is_empty());
    }

    #[test]
    fn test_relative_patterns_use_base_dir() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let loader = loader(root);

        let found = loader.resolve("data/**/*.txt").unwrap();
        assert_eq!(files(&found, root), vec!["data/a.txt", "data/sub/b.txt"]);

        let found = loader.resolve("**/*.csv").unwrap();
        assert_eq!(files(&found, root), vec!["data/sub/c.csv"]);
    }

    #[test]
    fn test_file_url_pattern() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let pattern = format!("{}data/*.txt", Url::from_directory_path(root).unwrap());

        let found = loader(root).resolve(&pattern).unwrap();
        assert_eq!(files(&found, root), vec!["data/a.txt"]);
    }

    #[test]
    fn test_literal_resolution() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let loader = loader(root);

        assert_eq!(loader.resolve("data/a.txt").unwrap().len(), 1);
        assert!(loader.resolve("data/none.txt").unwrap().is_empty());
        assert!(matches!(
            loader.resolve("jar:http://example.com/x.jar!/a.txt"),
            Err(LociError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn test_get_resource_variants() {
        let temp_dir = fixture();
        let loader = loader(temp_dir.path());

        let resource = loader.get_resource("classpath:/a.txt").unwrap();
        assert_eq!(resource.description(), "class path resource [a.txt]");

        let resource = loader.get_resource("jar:file:/libs/lib.jar!/a.txt").unwrap();
        assert!(resource.description().starts_with("archive entry ["));

        let resource = loader.get_resource("https://example.com/a.txt").unwrap();
        assert_eq!(resource.description(), "URL [https://example.com/a.txt]");

        let resource = loader.get_resource("file:/data/x/").unwrap();
        assert_eq!(resource.to_file().unwrap(), PathBuf::from("/data/x/"));

        // Without a provider, VFS locators fall back to plain URLs
        let resource = loader.get_resource("vfs:/app/a.txt").unwrap();
        assert!(resource.description().starts_with("URL ["));
    }

    #[test]
    fn test_class_path_resolution() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let jar = root.join("lib.jar");
        write_archive(
            &jar,
            &[("META-INF/LICENSE.md", "l"), ("META-INF/NOTICE.md", "n")],
        );
        fs::create_dir_all(root.join("classes/META-INF")).unwrap();
        fs::write(root.join("classes/META-INF/README.md"), "r").unwrap();

        let loader = PathMatchingResourceLoader::builder()
            .base_dir(root)
            .class_path_entries([root.join("classes"), jar])
            .build();

        let found = loader.resolve("classpath:/META-INF/*.md").unwrap();
        assert_eq!(found.len(), 3);

        let found = loader.resolve("classpath*:**/*.md").unwrap();
        assert_eq!(found.len(), 3);

        // Only the directory layer lists META-INF as an entry of its own
        let found = loader.resolve("classpath:*").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_unreachable_roots_are_absorbed() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let broken = root.join("broken.jar");
        fs::write(&broken, "not a zip").unwrap();
        fs::create_dir_all(root.join("classes")).unwrap();
        fs::write(root.join("classes/x.md"), "x").unwrap();

        let loader = PathMatchingResourceLoader::builder()
            .base_dir(root)
            .class_path(ClassPath::new(vec![
                crate::classpath::ClassPathLayer::directory(root.join("classes")),
                crate::classpath::ClassPathLayer::archive(&broken),
            ]))
            .build();

        let found = loader.resolve("classpath:*.md").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_vfs_resolution() {
        let temp_dir = fixture();
        let vfs = MemoryVfs::new();
        vfs.insert("/app/a.txt", "a");
        vfs.insert("/app/sub/b.txt", "b");
        let loader = PathMatchingResourceLoader::builder()
            .base_dir(temp_dir.path())
            .vfs_provider(Arc::new(vfs))
            .build();
        assert!(loader.vfs_active());

        let found = loader.resolve("vfs:/app/**/*.txt").unwrap();
        assert_eq!(
            found.descriptions(),
            vec!["VFS resource [vfs:/app/a.txt]", "VFS resource [vfs:/app/sub/b.txt]"]
        );
    }

    #[test]
    fn test_vfs_with_custom_scheme() {
        let temp_dir = fixture();
        let vfs = MemoryVfs::with_scheme("mem");
        vfs.insert("/app/a.txt", "a");
        vfs.insert("/app/b.csv", "b");
        let loader = PathMatchingResourceLoader::builder()
            .base_dir(temp_dir.path())
            .vfs_provider(Arc::new(vfs))
            .build();
        assert!(loader.vfs_active());

        let found = loader.resolve("mem:/app/*.txt").unwrap();
        assert_eq!(found.descriptions(), vec!["VFS resource [mem:/app/a.txt]"]);

        let found = loader.resolve("mem:/app/a.txt").unwrap();
        assert_eq!(found.descriptions(), vec!["VFS resource [mem:/app/a.txt]"]);

        let resource = loader.get_resource("mem:/app/b.csv").unwrap();
        assert!(resource.exists());
        assert!(loader.resolve("mem:/app/none.txt").unwrap().is_empty());
    }

    #[test]
    fn test_bundle_rewriting() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let loader = loader(root);

        // Without a rewriter the bundle root is not a local directory
        assert!(loader
            .resolve("bundleresource://12.fwk/data/*.txt")
            .unwrap()
            .is_empty());

        loader.register_rewriter(Arc::new(
            BundleRootRewriter::new().map("12.fwk", Url::from_directory_path(root).unwrap()),
        ));

        let found = loader
            .resolve("bundleresource://12.fwk/data/*.txt")
            .unwrap();
        assert_eq!(files(&found, root), vec!["data/a.txt"]);
    }

    #[test]
    fn test_computed_uses_cache() {
        let temp_dir = fixture();
        let root = temp_dir.path();
        let cache = Arc::new(ResourceCache::new());
        let loader = PathMatchingResourceLoader::builder()
            .base_dir(root)
            .cache(Arc::clone(&cache))
            .build();

        let resource = loader.get_resource("data/a.txt").unwrap();
        let length = loader
            .computed(resource.as_ref(), |resource| resource.content_length())
            .unwrap();
        assert_eq!(length, 1);
        assert_eq!(cache.len(), 1);

        // A second call is served from the cache
        let length: u64 = loader
            .computed(resource.as_ref(), |_| Err(LociError::not_found("unused")))
            .unwrap();
        assert_eq!(length, 1);
    }

    #[test]
    fn test_idempotent() {
        let temp_dir = fixture();
        let loader = loader(temp_dir.path());
        let first = loader.resolve("data/**/*").unwrap();
        let second = loader.resolve("data/**/*").unwrap();
        assert_eq!(first.descriptions(), second.descriptions());
        assert_eq!(first.len(), 4);
    }
}
