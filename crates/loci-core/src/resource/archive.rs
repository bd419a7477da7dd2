use super::{Resource, ResourceKey, ResourceRef, ResourceStream};
use crate::archive::{contains_entry, is_directory_entry, with_archive, ArchiveLocator, SharedArchive};
use crate::error::{LociError, Result};
use crate::location::{apply_relative_path, last_segment};
use chrono::{DateTime, NaiveDate, Utc};
use std::io::{Cursor, Read};
use std::sync::Arc;
use url::Url;
use zip::result::ZipError;

/// Upper bound on the buffer reserved up front from a declared entry size.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// An entry inside an archive.
///
/// Every operation opens the archive and closes it again, unless the
/// resource carries a [`SharedArchive`] for the same archive, which is
/// borrowed instead.
#[derive(Debug, Clone)]
pub struct ArchiveEntryResource {
    locator: ArchiveLocator,
    shared: Option<SharedArchive>,
}

impl ArchiveEntryResource {
    /// Create a resource for the entry `locator` points at.
    pub fn new(locator: ArchiveLocator) -> Self {
        ArchiveEntryResource {
            locator,
            shared: None,
        }
    }

    /// Create a resource that reads through an already open archive.
    pub fn with_shared(locator: ArchiveLocator, shared: SharedArchive) -> Self {
        ArchiveEntryResource {
            locator,
            shared: Some(shared),
        }
    }

    /// Parse an archive locator string.
    pub fn parse(location: &str) -> Result<Self> {
        Ok(Self::new(ArchiveLocator::parse(location)?))
    }

    /// Entry path inside the archive.
    pub fn entry(&self) -> &str {
        self.locator.entry()
    }

    fn access<R>(&self, f: impl FnOnce(&mut crate::archive::OpenArchive) -> Result<R>) -> Result<R> {
        with_archive(self.locator.source(), self.shared.as_ref(), f)
    }

    fn entry_error(&self, err: ZipError) -> LociError {
        match err {
            ZipError::FileNotFound => LociError::not_found(self.description()),
            other => LociError::from(other),
        }
    }
}

impl Resource for ArchiveEntryResource {
    fn exists(&self) -> bool {
        let entry = self.locator.entry();
        self.access(|archive| Ok(contains_entry(archive, entry)))
            .unwrap_or(false)
    }

    fn is_readable(&self) -> bool {
        let entry = self.locator.entry();
        self.access(|archive| {
            Ok(contains_entry(archive, entry) && !is_directory_entry(archive, entry))
        })
        .unwrap_or(false)
    }

    fn open_stream(&self) -> Result<ResourceStream> {
        let entry = self.locator.entry();
        let bytes = self.access(|archive| {
            if is_directory_entry(archive, entry) {
                return Err(LociError::not_supported("open_stream", self.description()));
            }
            let mut file = archive.by_name(entry).map_err(|err| self.entry_error(err))?;
            let mut bytes = Vec::with_capacity(capacity_hint(file.size()));
            file.read_to_end(&mut bytes)?;
            Ok(bytes)
        })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn locator(&self) -> Result<Url> {
        self.locator
            .to_url()
            .map_err(|_| LociError::not_resolvable(self.description(), "a URL"))
    }

    fn content_length(&self) -> Result<u64> {
        let entry = self.locator.entry();
        self.access(|archive| {
            let file = archive.by_name(entry).map_err(|err| self.entry_error(err))?;
            Ok(file.size())
        })
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        let entry = self.locator.entry();
        let stamp = self.access(|archive| {
            let file = archive.by_name(entry).map_err(|err| self.entry_error(err))?;
            Ok(file.last_modified())
        })?;
        stamp
            .and_then(|stamp| {
                NaiveDate::from_ymd_opt(stamp.year().into(), stamp.month().into(), stamp.day().into())?
                    .and_hms_opt(stamp.hour().into(), stamp.minute().into(), stamp.second().into())
            })
            .map(|naive| naive.and_utc())
            .ok_or_else(|| LociError::not_resolvable(self.description(), "a modification time"))
    }

    fn create_relative(&self, relative_path: &str) -> Result<ResourceRef> {
        let entry = apply_relative_path(self.locator.entry(), relative_path);
        Ok(Arc::new(ArchiveEntryResource {
            locator: self.locator.with_entry(entry),
            shared: self.shared.clone(),
        }))
    }

    fn filename(&self) -> Option<String> {
        last_segment(self.locator.entry()).map(str::to_string)
    }

    fn description(&self) -> String {
        format!("archive entry [{}]", self.locator)
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(self.description(), Some(self.locator.to_string()))
    }

    fn archive_locator(&self) -> Option<ArchiveLocator> {
        Some(self.locator.clone())
    }

    fn shared_archive(&self) -> Option<SharedArchive> {
        self.shared.clone()
    }
}

/// Initial buffer size for an entry declaring `declared` bytes.
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_archive;
    use crate::archive::ArchiveSource;
    use std::path::Path;
    use tempfile::TempDir;

    fn fixture(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("lib.jar");
        write_archive(
            &path,
            &[
                ("META-INF/", ""),
                ("META-INF/LICENSE.md", "license text"),
                ("org/x/A.class", "cafebabe"),
            ],
        );
        path
    }

    #[test]
    fn test_entry_capabilities() {
        let temp_dir = TempDir::new().unwrap();
        let path = fixture(temp_dir.path());

        let resource = ArchiveEntryResource::new(ArchiveLocator::for_file(&path, "META-INF/LICENSE.md"));
        assert!(resource.exists());
        assert!(resource.is_readable());
        assert!(!resource.is_file());
        assert_eq!(resource.content_length().unwrap(), 12);
        assert_eq!(resource.filename().as_deref(), Some("LICENSE.md"));
        assert!(matches!(resource.to_file(), Err(LociError::NotAFile { .. })));
        assert_eq!(resource.locator().unwrap().scheme(), "jar");

        let mut contents = String::new();
        resource
            .open_stream()
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "license text");
    }

    #[test]
    fn test_missing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let path = fixture(temp_dir.path());

        let resource = ArchiveEntryResource::new(ArchiveLocator::for_file(&path, "META-INF/NOTICE.md"));
        assert!(!resource.exists());
        assert!(matches!(
            resource.open_stream(),
            Err(LociError::NotFound { .. })
        ));
    }

    #[test]
    fn test_inferred_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = fixture(temp_dir.path());

        let resource = ArchiveEntryResource::new(ArchiveLocator::for_file(&path, "org/x/"));
        assert!(resource.exists());
        assert!(!resource.is_readable());
        assert!(matches!(
            resource.open_stream(),
            Err(LociError::NotSupported { .. })
        ));
    }

    #[test]
    fn test_missing_archive_does_not_exist() {
        let resource = ArchiveEntryResource::new(ArchiveLocator::for_file("/nowhere/lib.jar", "a.txt"));
        assert!(!resource.exists());
        assert!(matches!(
            resource.open_stream(),
            Err(LociError::MediumUnavailable { .. })
        ));
    }

    #[test]
    fn test_create_relative_keeps_shared_archive() {
        let temp_dir = TempDir::new().unwrap();
        let path = fixture(temp_dir.path());
        let shared = SharedArchive::open(ArchiveSource::File(path.clone())).unwrap();

        let dir = ArchiveEntryResource::with_shared(ArchiveLocator::for_file(&path, "META-INF/"), shared);
        let child = dir.create_relative("LICENSE.md").unwrap();
        assert!(child.exists());
        assert!(child.shared_archive().is_some());
        assert_eq!(
            child.archive_locator().unwrap().entry(),
            "META-INF/LICENSE.md"
        );
        assert!(child.description().starts_with("archive entry [jar:file:"));
        assert!(child.description().ends_with("lib.jar!/META-INF/LICENSE.md]"));
    }

    #[test]
    fn test_last_modified() {
        let temp_dir = TempDir::new().unwrap();
        let path = fixture(temp_dir.path());

        let resource = ArchiveEntryResource::new(ArchiveLocator::for_file(&path, "org/x/A.class"));
        let stamp = resource.last_modified().unwrap();
        assert!(stamp.timestamp() > 0);
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(capacity_hint(0), 0);
        assert_eq!(capacity_hint(4096), 4096);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOCATION as usize);
    }
}
