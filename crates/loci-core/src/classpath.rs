//! Layered class path.
//!
//! A [`ClassPath`] is an ordered list of layers, each a directory or an
//! archive, optionally chained to a parent class path that is searched
//! first. Looking a name up returns one resource per layer exposing it, so
//! the same name can legitimately resolve to several resources.

use crate::archive::{contains_entry, ArchiveLocator, ArchiveSource, SharedArchive};
use crate::error::{LociError, Result};
use crate::resource::{ArchiveEntryResource, FileResource, ResourceRef};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One entry of a class path.
pub enum ClassPathLayer {
    /// A directory tree
    Directory(PathBuf),

    /// An archive file, opened on first use and kept open
    Archive {
        path: PathBuf,
        shared: Mutex<Option<SharedArchive>>,
    },
}

impl ClassPathLayer {
    /// A directory layer.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        ClassPathLayer::Directory(path.into())
    }

    /// An archive layer.
    pub fn archive(path: impl Into<PathBuf>) -> Self {
        ClassPathLayer::Archive {
            path: path.into(),
            shared: Mutex::new(None),
        }
    }

    /// A layer for `path`, a directory if it is one and an archive otherwise.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::directory(path)
        } else {
            Self::archive(path)
        }
    }

    /// The directory or archive file of this layer.
    pub fn path(&self) -> &Path {
        match self {
            ClassPathLayer::Directory(path) => path,
            ClassPathLayer::Archive { path, .. } => path,
        }
    }

    /// True for archive layers.
    pub fn is_archive(&self) -> bool {
        matches!(self, ClassPathLayer::Archive { .. })
    }

    /// The resource for `name` in this layer, if the layer has it.
    ///
    /// The empty name addresses the layer root.
    pub fn find(&self, name: &str) -> Option<ResourceRef> {
        match self {
            ClassPathLayer::Directory(dir) => {
                let resource = if name.is_empty() {
                    FileResource::new(format!("{}/", dir.display()))
                } else {
                    FileResource::new(dir.join(name))
                };
                resource.path().exists().then(|| Arc::new(resource) as ResourceRef)
            }
            ClassPathLayer::Archive { path, .. } => {
                let shared = match self.shared_archive() {
                    Ok(shared) => shared,
                    Err(err) => {
                        warn!(archive = %path.display(), error = %err, "Skipping unreadable class path archive");
                        return None;
                    }
                };
                let found = name.is_empty()
                    || shared.with(|archive| contains_entry(archive, name));
                found.then(|| {
                    let locator = ArchiveLocator::for_file(path, name);
                    Arc::new(ArchiveEntryResource::with_shared(locator, shared)) as ResourceRef
                })
            }
        }
    }

    /// The open archive of an archive layer, opening it on first use.
    pub fn shared_archive(&self) -> Result<SharedArchive> {
        match self {
            ClassPathLayer::Directory(dir) => Err(LociError::not_supported(
                "shared_archive",
                format!("class path directory [{}]", dir.display()),
            )),
            ClassPathLayer::Archive { path, shared } => {
                let mut slot = shared.lock();
                if let Some(open) = slot.as_ref() {
                    return Ok(open.clone());
                }
                let open = SharedArchive::open(ArchiveSource::File(path.clone()))?;
                *slot = Some(open.clone());
                Ok(open)
            }
        }
    }

    fn release(&self) {
        if let ClassPathLayer::Archive { shared, .. } = self {
            shared.lock().take();
        }
    }
}

impl fmt::Debug for ClassPathLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassPathLayer::Directory(path) => f.debug_tuple("Directory").field(path).finish(),
            ClassPathLayer::Archive { path, shared } => f
                .debug_struct("Archive")
                .field("path", path)
                .field("open", &shared.lock().is_some())
                .finish(),
        }
    }
}

/// An ordered, optionally parented list of class path layers.
#[derive(Debug, Default)]
pub struct ClassPath {
    parent: Option<Arc<ClassPath>>,
    layers: Vec<ClassPathLayer>,
}

impl ClassPath {
    /// Create a class path from layers.
    pub fn new(layers: Vec<ClassPathLayer>) -> Self {
        ClassPath {
            parent: None,
            layers,
        }
    }

    /// An empty class path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a class path from entry paths, classifying each one.
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::new(entries.into_iter().map(ClassPathLayer::for_path).collect())
    }

    /// Chain to a parent class path that is searched first.
    pub fn with_parent(mut self, parent: Arc<ClassPath>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// The parent class path.
    pub fn parent(&self) -> Option<&Arc<ClassPath>> {
        self.parent.as_ref()
    }

    /// This class path's own layers, without the parent's.
    pub fn layers(&self) -> &[ClassPathLayer] {
        &self.layers
    }

    /// Total number of layers including the parent chain.
    pub fn len(&self) -> usize {
        self.parent.as_ref().map_or(0, |parent| parent.len()) + self.layers.len()
    }

    /// Check if there are no layers at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every layer exposing `name`, parent layers first.
    ///
    /// A leading separator on `name` is ignored.
    pub fn find_resources(&self, name: &str) -> Vec<ResourceRef> {
        let name = name.trim_start_matches('/');
        let mut found = self
            .parent
            .as_ref()
            .map(|parent| parent.find_resources(name))
            .unwrap_or_default();

        for layer in &self.layers {
            if let Some(resource) = layer.find(name) {
                trace!(name, layer = %layer.path().display(), "Class path layer exposes name");
                found.push(resource);
            }
        }
        found
    }

    /// The first layer exposing `name`.
    pub fn find_resource(&self, name: &str) -> Option<ResourceRef> {
        let name = name.trim_start_matches('/');
        if let Some(resource) = self
            .parent
            .as_ref()
            .and_then(|parent| parent.find_resource(name))
        {
            return Some(resource);
        }
        self.layers.iter().find_map(|layer| layer.find(name))
    }

    /// Close every archive kept open by this class path and its parents.
    ///
    /// Resources still holding a shared archive keep it alive until they
    /// are dropped.
    pub fn release_archives(&self) {
        if let Some(parent) = &self.parent {
            parent.release_archives();
        }
        for layer in &self.layers {
            layer.release();
        }
        debug!(layers = self.layers.len(), "Released class path archives");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_archive;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ClassPath) {
        let temp_dir = TempDir::new().unwrap();
        let classes = temp_dir.path().join("classes");
        fs::create_dir_all(classes.join("META-INF")).unwrap();
        fs::write(classes.join("META-INF/app.md"), "app").unwrap();
        fs::write(classes.join("config.toml"), "x = 1").unwrap();

        let jar = temp_dir.path().join("lib.jar");
        write_archive(
            &jar,
            &[("META-INF/LICENSE.md", "license"), ("config.toml", "y = 2")],
        );

        let class_path = ClassPath::from_entries([classes, jar]);
        (temp_dir, class_path)
    }

    #[test]
    fn test_layer_classification() {
        let (_temp_dir, class_path) = fixture();
        assert_eq!(class_path.len(), 2);
        assert!(!class_path.layers()[0].is_archive());
        assert!(class_path.layers()[1].is_archive());
    }

    #[test]
    fn test_find_resources_across_layers() {
        let (_temp_dir, class_path) = fixture();

        let found = class_path.find_resources("config.toml");
        assert_eq!(found.len(), 2);
        assert!(found[0].description().starts_with("file ["));
        assert!(found[1].description().starts_with("archive entry ["));

        let found = class_path.find_resources("/META-INF/LICENSE.md");
        assert_eq!(found.len(), 1);
        assert!(found[0].exists());

        assert!(class_path.find_resources("missing.txt").is_empty());
    }

    #[test]
    fn test_empty_name_yields_layer_roots() {
        let (_temp_dir, class_path) = fixture();
        let roots = class_path.find_resources("");
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|root| root.exists()));
    }

    #[test]
    fn test_parent_searched_first() {
        let (_temp_dir, parent) = fixture();
        let child_dir = TempDir::new().unwrap();
        fs::write(child_dir.path().join("config.toml"), "z = 3").unwrap();

        let class_path =
            ClassPath::from_entries([child_dir.path().to_path_buf()]).with_parent(Arc::new(parent));
        assert_eq!(class_path.len(), 3);

        let first = class_path.find_resource("config.toml").unwrap();
        assert!(first.description().contains("classes"));
        assert_eq!(class_path.find_resources("config.toml").len(), 3);
    }

    #[test]
    fn test_archive_kept_open_until_released() {
        let (_temp_dir, class_path) = fixture();
        let layer = &class_path.layers()[1];

        let resource = layer.find("META-INF/LICENSE.md").unwrap();
        assert!(resource.shared_archive().is_some());
        assert!(format!("{:?}", layer).contains("open: true"));

        class_path.release_archives();
        assert!(format!("{:?}", layer).contains("open: false"));
        // The resource still holds its own handle
        assert!(resource.exists());
    }

    #[test]
    fn test_unreadable_archive_layer_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("broken.jar");
        fs::write(&bogus, "not a zip").unwrap();

        let class_path = ClassPath::from_entries([bogus]);
        assert!(class_path.find_resources("anything").is_empty());
    }
}
