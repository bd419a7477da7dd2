use super::{Resource, ResourceRef, ResourceStream};
use crate::archive::{ArchiveLocator, SharedArchive};
use crate::classpath::ClassPath;
use crate::error::{LociError, Result};
use crate::location::{apply_relative_path, clean_path, last_segment};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// A name looked up on a class path.
///
/// Every operation delegates to the first layer exposing the name at the
/// time of the call.
#[derive(Debug, Clone)]
pub struct ClassPathResource {
    path: String,
    class_path: Arc<ClassPath>,
}

impl ClassPathResource {
    /// Create a resource for `path`; a leading separator is ignored.
    pub fn new(path: &str, class_path: Arc<ClassPath>) -> Self {
        let path = clean_path(path).trim_start_matches('/').to_string();
        ClassPathResource { path, class_path }
    }

    /// The name on the class path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn resolve(&self) -> Option<ResourceRef> {
        self.class_path.find_resource(&self.path)
    }

    fn require(&self) -> Result<ResourceRef> {
        self.resolve()
            .ok_or_else(|| LociError::not_found(self.description()))
    }
}

impl Resource for ClassPathResource {
    fn exists(&self) -> bool {
        self.resolve().is_some()
    }

    fn is_readable(&self) -> bool {
        self.resolve().is_some_and(|resource| resource.is_readable())
    }

    fn is_file(&self) -> bool {
        self.resolve().is_some_and(|resource| resource.is_file())
    }

    fn open_stream(&self) -> Result<ResourceStream> {
        self.require()?.open_stream()
    }

    fn locator(&self) -> Result<Url> {
        self.resolve()
            .ok_or_else(|| LociError::not_resolvable(self.description(), "a URL"))?
            .locator()
    }

    fn to_file(&self) -> Result<PathBuf> {
        self.require()?.to_file()
    }

    fn content_length(&self) -> Result<u64> {
        self.require()?.content_length()
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        self.require()?.last_modified()
    }

    fn create_relative(&self, relative_path: &str) -> Result<ResourceRef> {
        let path = apply_relative_path(&self.path, relative_path);
        Ok(Arc::new(ClassPathResource::new(
            &path,
            Arc::clone(&self.class_path),
        )))
    }

    fn filename(&self) -> Option<String> {
        last_segment(&self.path).map(str::to_string)
    }

    fn description(&self) -> String {
        format!("class path resource [{}]", self.path)
    }

    fn archive_locator(&self) -> Option<ArchiveLocator> {
        self.resolve()?.archive_locator()
    }

    fn shared_archive(&self) -> Option<SharedArchive> {
        self.resolve()?.shared_archive()
    }
}
