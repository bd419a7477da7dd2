use super::{open_error, Resource, ResourceRef, ResourceStream};
use crate::error::{LociError, Result};
use crate::location::{apply_relative_path, clean_path, last_segment, to_slash_path};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// A file or directory in the local filesystem.
///
/// The path is cleaned lexically on construction. A trailing separator is
/// kept so that [`create_relative`](Resource::create_relative) resolves
/// below a directory instead of beside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    /// Create a resource for `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        FileResource {
            path: PathBuf::from(clean_path(&raw)),
        }
    }

    /// The filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

impl Resource for FileResource {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_readable(&self) -> bool {
        !self.path.is_dir() && File::open(&self.path).is_ok()
    }

    fn is_file(&self) -> bool {
        self.path.is_file()
    }

    fn open_stream(&self) -> Result<ResourceStream> {
        if self.path.is_dir() {
            return Err(LociError::not_supported("open_stream", self.description()));
        }
        let file = File::open(&self.path).map_err(|err| open_error(err, self.description()))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn locator(&self) -> Result<Url> {
        let url = if self.path.is_dir() {
            Url::from_directory_path(&self.path)
        } else {
            Url::from_file_path(&self.path)
        };
        url.map_err(|()| LociError::not_resolvable(self.description(), "a URL"))
    }

    fn to_file(&self) -> Result<PathBuf> {
        Ok(self.path.clone())
    }

    fn content_length(&self) -> Result<u64> {
        let metadata = fs::metadata(&self.path).map_err(|err| open_error(err, self.description()))?;
        Ok(metadata.len())
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        let metadata = fs::metadata(&self.path).map_err(|err| open_error(err, self.description()))?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }

    fn create_relative(&self, relative_path: &str) -> Result<ResourceRef> {
        let path = apply_relative_path(&self.raw_path(), relative_path);
        Ok(Arc::new(FileResource::new(path)))
    }

    fn filename(&self) -> Option<String> {
        last_segment(&self.raw_path()).map(str::to_string)
    }

    fn description(&self) -> String {
        format!("file [{}]", to_slash_path(&self.path))
    }
}
