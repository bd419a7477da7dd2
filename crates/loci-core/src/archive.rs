//! Archive locators and archive access.
//!
//! An archive locator names an archive and an entry path inside it:
//!
//! ```text
//! jar:file:/libs/lib.jar!/META-INF/               plain archive
//! war:file:/srv/app.war*/WEB-INF/classes/         web archive marker
//! jar:file:/srv/app.war*/WEB-INF/lib/x.jar!/a/    archive inside an archive
//! jar:jar:file:/outer.zip!/inner.jar!/a/          same, jar-style
//! ```
//!
//! The entry path is whatever follows the *last* container separator; the
//! rest addresses the archive, possibly itself stored inside another one.
//! Nested archives are read into memory before they are opened.

use crate::error::{LociError, Result};
use crate::location::{ARCHIVE_SCHEMES, FILE_SCHEME, JAR_URL_SEPARATOR, WAR_URL_SEPARATOR};
use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;
use zip::ZipArchive;

/// Anything an archive can be read from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Reader type behind every opened archive.
pub type ArchiveReader = Box<dyn ReadSeek>;

/// An opened archive.
pub type OpenArchive = ZipArchive<ArchiveReader>;

/// Where the bytes of an archive come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveSource {
    /// An archive file in the local filesystem
    File(PathBuf),

    /// An archive stored as an entry of another archive
    Nested {
        outer: Box<ArchiveSource>,
        entry: String,
        separator: &'static str,
    },
}

impl ArchiveSource {
    /// Parse the archive part of a locator (everything before the entry).
    fn parse(raw: &str, location: &str) -> Result<Self> {
        let raw = strip_archive_scheme(raw);
        if let Some((outer, entry, separator)) = split_last_separator(raw) {
            return Ok(ArchiveSource::Nested {
                outer: Box::new(ArchiveSource::parse(outer, location)?),
                entry: entry.to_string(),
                separator,
            });
        }
        Ok(ArchiveSource::File(file_part_to_path(raw, location)?))
    }

    /// Open this archive.
    ///
    /// The returned archive owns its reader; dropping it closes the file.
    pub fn open(&self) -> Result<OpenArchive> {
        match self {
            ArchiveSource::File(path) => {
                let file = File::open(path).map_err(|err| {
                    LociError::medium(path.display().to_string(), err.to_string())
                })?;
                let reader: ArchiveReader = Box::new(BufReader::new(file));
                ZipArchive::new(reader).map_err(|err| {
                    LociError::medium(path.display().to_string(), err.to_string())
                })
            }
            ArchiveSource::Nested { outer, entry, .. } => {
                let mut bytes = Vec::new();
                {
                    let mut outer_archive = outer.open()?;
                    let mut inner = outer_archive
                        .by_name(entry)
                        .map_err(|err| LociError::medium(self.to_string(), err.to_string()))?;
                    inner.read_to_end(&mut bytes)?;
                }
                debug!(archive = %self, bytes = bytes.len(), "Loaded nested archive into memory");
                let reader: ArchiveReader = Box::new(Cursor::new(bytes));
                ZipArchive::new(reader)
                    .map_err(|err| LociError::medium(self.to_string(), err.to_string()))
            }
        }
    }

    /// The outermost archive file.
    pub fn root_file(&self) -> &Path {
        match self {
            ArchiveSource::File(path) => path,
            ArchiveSource::Nested { outer, .. } => outer.root_file(),
        }
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveSource::File(path) => match Url::from_file_path(path) {
                Ok(url) => write!(f, "{}", url),
                Err(()) => write!(f, "{}", path.display()),
            },
            ArchiveSource::Nested {
                outer,
                entry,
                separator,
            } => write!(f, "{}{}{}", outer, separator, entry),
        }
    }
}

/// An archive plus an entry path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveLocator {
    scheme: String,
    source: ArchiveSource,
    separator: &'static str,
    entry: String,
}

impl ArchiveLocator {
    /// Create a locator for `entry` inside the archive file at `path`.
    pub fn for_file(path: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        ArchiveLocator {
            scheme: "jar".to_string(),
            source: ArchiveSource::File(path.into()),
            separator: JAR_URL_SEPARATOR,
            entry: entry.into(),
        }
    }

    /// Parse a `jar:`, `war:`, `zip:` or `wsjar:` locator.
    ///
    /// A locator without any container separator addresses the archive
    /// itself, with an empty entry path.
    pub fn parse(location: &str) -> Result<Self> {
        let (scheme, body) = location
            .split_once(':')
            .filter(|(scheme, _)| ARCHIVE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()))
            .ok_or_else(|| LociError::invalid_location(location, "not an archive locator"))?;

        let (archive, entry, separator) = match split_last_separator(body) {
            Some(parts) => parts,
            None => (body, "", JAR_URL_SEPARATOR),
        };

        Ok(ArchiveLocator {
            scheme: scheme.to_ascii_lowercase(),
            source: ArchiveSource::parse(archive, location)?,
            separator,
            entry: entry.to_string(),
        })
    }

    /// The archive holding the entry.
    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// Entry path inside the archive, without a leading separator.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// A locator for another entry of the same archive.
    pub fn with_entry(&self, entry: impl Into<String>) -> Self {
        ArchiveLocator {
            scheme: self.scheme.clone(),
            source: self.source.clone(),
            separator: self.separator,
            entry: entry.into(),
        }
    }

    /// The locator as a URL.
    pub fn to_url(&self) -> Result<Url> {
        let rendered = self.to_string();
        Url::parse(&rendered).map_err(|err| LociError::invalid_location(rendered, err.to_string()))
    }
}

impl fmt::Display for ArchiveLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}{}",
            self.scheme, self.source, self.separator, self.entry
        )
    }
}

/// An already-open archive shared by its owner.
///
/// Resources created from a class path layer carry the layer's open
/// archive so that scanning them does not open the file again. Whoever
/// borrows it must not close it; the last owner dropping it does.
#[derive(Clone)]
pub struct SharedArchive {
    source: ArchiveSource,
    archive: Arc<Mutex<OpenArchive>>,
}

impl SharedArchive {
    /// Open `source` for shared use.
    pub fn open(source: ArchiveSource) -> Result<Self> {
        let archive = source.open()?;
        debug!(archive = %source, entries = archive.len(), "Opened shared archive");
        Ok(SharedArchive {
            source,
            archive: Arc::new(Mutex::new(archive)),
        })
    }

    /// The archive this handle reads from.
    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// Run `f` with exclusive access to the archive.
    pub fn with<R>(&self, f: impl FnOnce(&mut OpenArchive) -> R) -> R {
        let mut archive = self.archive.lock();
        f(&mut archive)
    }
}

impl fmt::Debug for SharedArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedArchive")
            .field("source", &self.source)
            .finish()
    }
}

/// Run `f` against the archive at `source`.
///
/// A shared archive for the same source is borrowed and left open.
/// Otherwise the archive is opened for this call only and closed when the
/// call returns, whether `f` succeeds or not.
pub fn with_archive<R>(
    source: &ArchiveSource,
    shared: Option<&SharedArchive>,
    f: impl FnOnce(&mut OpenArchive) -> Result<R>,
) -> Result<R> {
    if let Some(shared) = shared.filter(|shared| shared.source() == source) {
        trace!(archive = %source, "Borrowing open archive");
        return shared.with(f);
    }

    let mut archive = source.open()?;
    trace!(archive = %source, "Opened archive for a single call");
    f(&mut archive)
}

/// True if `entry` names a file or directory in `archive`.
///
/// Directories count even when the archive has no explicit entry for
/// them, as long as some entry lives below them. The empty path is the
/// archive root.
pub fn contains_entry(archive: &OpenArchive, entry: &str) -> bool {
    if entry.is_empty() {
        return true;
    }
    let dir = if entry.ends_with('/') {
        entry.to_string()
    } else {
        format!("{}/", entry)
    };
    archive
        .file_names()
        .any(|name| name == entry || name.starts_with(&dir))
}

/// True if `entry` is a directory in `archive`.
pub fn is_directory_entry(archive: &OpenArchive, entry: &str) -> bool {
    if entry.is_empty() || entry.ends_with('/') {
        return contains_entry(archive, entry);
    }
    let dir = format!("{}/", entry);
    archive.file_names().any(|name| name.starts_with(&dir))
}

fn strip_archive_scheme(raw: &str) -> &str {
    match raw.split_once(':') {
        Some((scheme, rest)) if ARCHIVE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) => {
            rest
        }
        _ => raw,
    }
}

/// Split at whichever container separator occurs last.
fn split_last_separator(raw: &str) -> Option<(&str, &str, &'static str)> {
    let jar = raw.rfind(JAR_URL_SEPARATOR);
    let war = raw.rfind(WAR_URL_SEPARATOR);
    let (index, separator) = match (jar, war) {
        (Some(j), Some(w)) if w > j => (w, WAR_URL_SEPARATOR),
        (Some(j), _) => (j, JAR_URL_SEPARATOR),
        (None, Some(w)) => (w, WAR_URL_SEPARATOR),
        (None, None) => return None,
    };
    Some((&raw[..index], &raw[index + separator.len()..], separator))
}

fn file_part_to_path(raw: &str, location: &str) -> Result<PathBuf> {
    match crate::location::scheme_of(raw) {
        Some(scheme) if scheme.eq_ignore_ascii_case(FILE_SCHEME) => {
            let url = Url::parse(raw)
                .map_err(|err| LociError::invalid_location(location, err.to_string()))?;
            url.to_file_path().map_err(|()| {
                LociError::invalid_location(location, "archive is not a local file")
            })
        }
        Some(scheme) => Err(LociError::invalid_location(
            location,
            format!("archives behind {}: locators cannot be opened", scheme),
        )),
        None => Ok(PathBuf::from(raw)),
    }
}
