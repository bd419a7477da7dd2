use super::{Resource, ResourceKey, ResourceRef, ResourceStream};
use crate::error::{LociError, Result};
use crate::location::{apply_relative_path, last_segment};
use crate::vfs::{normalize_vfs_path, VfsProvider};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

/// A path in a virtual filesystem.
#[derive(Debug, Clone)]
pub struct VfsResource {
    provider: Arc<dyn VfsProvider>,
    path: String,
}

impl VfsResource {
    /// Create a resource for `path` in `provider`.
    ///
    /// A trailing separator is kept so relative paths resolve below it.
    pub fn new(provider: Arc<dyn VfsProvider>, path: &str) -> Self {
        let mut normalized = normalize_vfs_path(path);
        if path.ends_with('/') && normalized != "/" {
            normalized.push('/');
        }
        VfsResource {
            provider,
            path: normalized,
        }
    }

    /// The virtual path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn locator_string(&self) -> String {
        format!("{}:{}", self.provider.scheme(), self.path)
    }
}

impl Resource for VfsResource {
    fn exists(&self) -> bool {
        self.provider.attributes(&self.path).is_some()
    }

    fn is_readable(&self) -> bool {
        self.provider
            .attributes(&self.path)
            .is_some_and(|attributes| !attributes.is_dir)
    }

    fn open_stream(&self) -> Result<ResourceStream> {
        match self.provider.attributes(&self.path) {
            None => Err(LociError::not_found(self.description())),
            Some(attributes) if attributes.is_dir => {
                Err(LociError::not_supported("open_stream", self.description()))
            }
            Some(_) => self.provider.open(&self.path),
        }
    }

    fn locator(&self) -> Result<Url> {
        let rendered = self.locator_string();
        Url::parse(&rendered).map_err(|_| LociError::not_resolvable(self.description(), "a URL"))
    }

    fn content_length(&self) -> Result<u64> {
        self.provider
            .attributes(&self.path)
            .map(|attributes| attributes.size)
            .ok_or_else(|| LociError::not_found(self.description()))
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        self.provider
            .attributes(&self.path)
            .and_then(|attributes| attributes.last_modified)
            .ok_or_else(|| LociError::not_resolvable(self.description(), "a modification time"))
    }

    fn create_relative(&self, relative_path: &str) -> Result<ResourceRef> {
        let path = apply_relative_path(&self.path, relative_path);
        Ok(Arc::new(VfsResource::new(Arc::clone(&self.provider), &path)))
    }

    fn filename(&self) -> Option<String> {
        last_segment(&self.path).map(str::to_string)
    }

    fn description(&self) -> String {
        format!("VFS resource [{}]", self.locator_string())
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.description(), Some(self.locator_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryVfs;
    use std::io::Read;

    fn provider() -> Arc<dyn VfsProvider> {
        let vfs = MemoryVfs::new();
        vfs.insert("/app/a.txt", "alpha");
        vfs.insert("/app/sub/b.txt", "beta");
        Arc::new(vfs)
    }

    #[test]
    fn test_vfs_capabilities() {
        let resource = VfsResource::new(provider(), "/app/a.txt");
        assert!(resource.exists());
        assert!(resource.is_readable());
        assert_eq!(resource.content_length().unwrap(), 5);
        assert!(resource.last_modified().is_ok());
        assert_eq!(resource.locator().unwrap().as_str(), "vfs:/app/a.txt");
        assert_eq!(resource.description(), "VFS resource [vfs:/app/a.txt]");
        assert!(matches!(resource.to_file(), Err(LociError::NotAFile { .. })));

        let mut contents = String::new();
        resource
            .open_stream()
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "alpha");
    }

    #[test]
    fn test_directories_and_relative() {
        let dir = VfsResource::new(provider(), "/app/");
        assert_eq!(dir.path(), "/app/");
        assert!(dir.exists());
        assert!(!dir.is_readable());
        assert!(matches!(
            dir.open_stream(),
            Err(LociError::NotSupported { .. })
        ));

        let child = dir.create_relative("sub/b.txt").unwrap();
        assert_eq!(child.description(), "VFS resource [vfs:/app/sub/b.txt]");
        assert_eq!(child.filename().as_deref(), Some("b.txt"));
        assert!(child.exists());
    }

    #[test]
    fn test_missing_path() {
        let resource = VfsResource::new(provider(), "/app/none.txt");
        assert!(!resource.exists());
        assert!(matches!(
            resource.open_stream(),
            Err(LociError::NotFound { .. })
        ));
    }
}
