use super::{open_error, Resource, ResourceKey, ResourceRef, ResourceStream};
use crate::error::{LociError, Result};
use crate::location::{last_segment, FILE_SCHEME};
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// A resource addressed by an arbitrary URL.
///
/// Only `file:` URLs can be read; every other scheme is reported as not
/// existing and fails to open, since no network access is performed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlResource {
    url: Url,
}

impl UrlResource {
    /// Wrap an already parsed URL.
    pub fn new(url: Url) -> Self {
        UrlResource { url }
    }

    /// Parse `location` as a URL.
    pub fn parse(location: &str) -> Result<Self> {
        let url = Url::parse(location)
            .map_err(|err| LociError::invalid_location(location, err.to_string()))?;
        Ok(UrlResource { url })
    }

    /// The wrapped URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn local_path(&self) -> Option<PathBuf> {
        if self.url.scheme() == FILE_SCHEME {
            self.url.to_file_path().ok()
        } else {
            None
        }
    }

    fn require_local(&self, operation: &str) -> Result<PathBuf> {
        self.local_path()
            .ok_or_else(|| LociError::not_supported(operation, self.description()))
    }
}

impl Resource for UrlResource {
    fn exists(&self) -> bool {
        self.local_path().is_some_and(|path| path.exists())
    }

    fn is_file(&self) -> bool {
        self.local_path().is_some_and(|path| path.is_file())
    }

    fn open_stream(&self) -> Result<ResourceStream> {
        let path = self.require_local("open_stream")?;
        let file = File::open(path).map_err(|err| open_error(err, self.description()))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn locator(&self) -> Result<Url> {
        Ok(self.url.clone())
    }

    fn to_file(&self) -> Result<PathBuf> {
        self.local_path()
            .ok_or_else(|| LociError::not_a_file(self.description()))
    }

    fn content_length(&self) -> Result<u64> {
        let path = self.require_local("content_length")?;
        let metadata = fs::metadata(path).map_err(|err| open_error(err, self.description()))?;
        Ok(metadata.len())
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        let path = self
            .local_path()
            .ok_or_else(|| LociError::not_resolvable(self.description(), "a modification time"))?;
        let metadata = fs::metadata(path).map_err(|err| open_error(err, self.description()))?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }

    fn create_relative(&self, relative_path: &str) -> Result<ResourceRef> {
        let relative = relative_path.trim_start_matches('/');
        let url = self
            .url
            .join(relative)
            .map_err(|_| LociError::not_supported("create_relative", self.description()))?;
        Ok(Arc::new(UrlResource::new(url)))
    }

    fn filename(&self) -> Option<String> {
        last_segment(self.url.path()).map(str::to_string)
    }

    fn description(&self) -> String {
        format!("URL [{}]", self.url)
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.description(), Some(self.url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_url_is_local() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "abc").unwrap();

        let resource = UrlResource::new(Url::from_file_path(&path).unwrap());
        assert!(resource.exists());
        assert!(resource.is_file());
        assert_eq!(resource.to_file().unwrap(), path);
        assert_eq!(resource.content_length().unwrap(), 3);
        assert_eq!(resource.filename().as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_remote_url_is_not_a_file() {
        let resource = UrlResource::parse("https://example.com/files/a.txt").unwrap();
        assert!(!resource.exists());
        assert!(!resource.is_file());
        assert!(matches!(resource.to_file(), Err(LociError::NotAFile { .. })));
        assert!(matches!(
            resource.open_stream(),
            Err(LociError::NotSupported { .. })
        ));
        assert!(matches!(
            resource.last_modified(),
            Err(LociError::NotResolvable { .. })
        ));
        assert_eq!(resource.description(), "URL [https://example.com/files/a.txt]");
    }

    #[test]
    fn test_create_relative_and_normalization() {
        let resource = UrlResource::parse("https://EXAMPLE.com/files/./a.txt").unwrap();
        assert_eq!(resource.url().as_str(), "https://example.com/files/a.txt");

        let sibling = resource.create_relative("/b.txt").unwrap();
        assert_eq!(sibling.description(), "URL [https://example.com/files/b.txt]");
    }

    #[test]
    fn test_invalid_location() {
        assert!(matches!(
            UrlResource::parse("not a url"),
            Err(LociError::InvalidLocation { .. })
        ));
    }
}
