//! Location classification and root extraction.
//!
//! A location is either a literal address or a pattern. Patterns are split
//! into a pattern-free *root* and the *remainder* holding the wildcards:
//!
//! ```text
//! classpath:/WEB-INF/*.xml   ->  classpath:/WEB-INF/  +  *.xml
//! file:/a/b/**/c*.txt        ->  file:/a/b/           +  **/c*.txt
//! ```
//!
//! Everything here is pure string logic; no storage medium is touched.

use crate::matcher::is_pattern;
use std::path::{Component, Path};

/// Prefix selecting class path lookup.
pub const CLASSPATH_URL_PREFIX: &str = "classpath:";

/// Alias of [`CLASSPATH_URL_PREFIX`].
pub const CLASSPATH_ALL_URL_PREFIX: &str = "classpath*:";

/// Scheme of local file locators.
pub const FILE_SCHEME: &str = "file";

/// Web-archive prefix whose locations use the `*/` container marker.
pub const WAR_URL_PREFIX: &str = "war:";

/// Separator between an archive and an entry inside it.
pub const JAR_URL_SEPARATOR: &str = "!/";

/// Composite-archive marker used by web-archive style nested addressing.
pub const WAR_URL_SEPARATOR: &str = "*/";

/// Schemes addressing entries inside archives.
pub const ARCHIVE_SCHEMES: &[&str] = &["jar", "war", "zip", "wsjar"];

/// Schemes starting with this prefix belong to a virtual filesystem.
pub const VFS_SCHEME_PREFIX: &str = "vfs";

/// Schemes starting with this prefix need a locator rewriter first.
pub const BUNDLE_SCHEME_PREFIX: &str = "bundle";

/// Backend a locator belongs to, decided by its scheme alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    /// Entry inside an archive
    Archive,
    /// Virtual filesystem
    Vfs,
    /// Bundle locator that must be rewritten before it can be searched
    Bundle,
    /// Anything else, searched as a directory tree
    FileLike,
}

impl Medium {
    /// Classify a locator scheme.
    pub fn of_scheme(scheme: &str) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if ARCHIVE_SCHEMES.contains(&scheme.as_str()) {
            Medium::Archive
        } else if scheme.starts_with(VFS_SCHEME_PREFIX) {
            Medium::Vfs
        } else if scheme.starts_with(BUNDLE_SCHEME_PREFIX) {
            Medium::Bundle
        } else {
            Medium::FileLike
        }
    }
}

/// A location string split into its pattern-free root and the remainder.
///
/// `root + remainder` always reproduces the original location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootExtraction {
    /// Literal leading part, ending at a separator or the prefix end
    pub root: String,

    /// Pattern-bearing suffix
    pub remainder: String,
}

/// The result of classifying a location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    location: String,
    class_path: bool,
    name_start: usize,
    prefix_end: usize,
    pattern: bool,
}

impl Classification {
    /// The original location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// True if the location carried a class path prefix.
    pub fn is_class_path(&self) -> bool {
        self.class_path
    }

    /// The location without its class path prefix.
    pub fn name(&self) -> &str {
        &self.location[self.name_start..]
    }

    /// Index where the non-prefix part of the location begins.
    pub fn prefix_end(&self) -> usize {
        self.prefix_end
    }

    /// True if the part after the prefix contains wildcards.
    pub fn is_pattern(&self) -> bool {
        self.pattern
    }

    /// Split the location into root and remainder.
    ///
    /// The end of the root starts at the full length and moves back one
    /// separator at a time while the part between the prefix end and the
    /// current end is still a pattern. A trailing separator right at the
    /// current end is skipped when searching backward. If no pattern-free
    /// part is found the root is just the prefix.
    pub fn extract_root(&self) -> RootExtraction {
        let location = self.location.as_str();
        let bytes = location.as_bytes();
        let mut end = location.len();

        while end > self.prefix_end && is_pattern(&location[self.prefix_end..end]) {
            end = bytes[..end - 1]
                .iter()
                .rposition(|&b| b == b'/')
                .map_or(0, |slash| slash + 1);
        }
        if end < self.prefix_end {
            end = self.prefix_end;
        }

        RootExtraction {
            root: location[..end].to_string(),
            remainder: location[end..].to_string(),
        }
    }
}

/// Classify a location string.
pub fn classify(location: &str) -> Classification {
    let name_start = class_path_prefix_len(location).unwrap_or(0);
    let class_path = name_start > 0;
    let prefix_end = name_start + prefix_end(&location[name_start..]);

    Classification {
        location: location.to_string(),
        class_path,
        name_start,
        prefix_end,
        pattern: is_pattern(&location[prefix_end..]),
    }
}

/// Shorthand for `classify(location).extract_root()`.
pub fn extract_root(location: &str) -> RootExtraction {
    classify(location).extract_root()
}

/// Length of a class path prefix at the start of `location`, if any.
pub fn class_path_prefix_len(location: &str) -> Option<usize> {
    [CLASSPATH_ALL_URL_PREFIX, CLASSPATH_URL_PREFIX]
        .into_iter()
        .find(|prefix| location.starts_with(prefix))
        .map(str::len)
}

/// Index just past the scheme of `location`.
///
/// Web-archive locations split just past the `*` of their first `*/`
/// marker instead, so the pattern test never sees the container part.
pub fn prefix_end(location: &str) -> usize {
    if location.starts_with(WAR_URL_PREFIX) {
        if let Some(marker) = location.find(WAR_URL_SEPARATOR) {
            return marker + 1;
        }
    }
    location.find(':').map_or(0, |colon| colon + 1)
}

/// The URL scheme of `location`, if it has one.
///
/// Single-letter schemes are treated as Windows drive letters.
pub fn scheme_of(location: &str) -> Option<&str> {
    let colon = location.find(':')?;
    let scheme = &location[..colon];
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (valid && scheme.len() > 1).then_some(scheme)
}

/// Normalize a `/`-separated path lexically.
///
/// Backslashes become `/`, `.` segments are dropped and `..` removes the
/// preceding segment where there is one. Leading and trailing separators
/// are kept.
pub fn clean_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let absolute = normalized.starts_with('/');
    let trailing = normalized.len() > 1 && normalized.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let mut cleaned = String::with_capacity(normalized.len());
    if absolute {
        cleaned.push('/');
    }
    cleaned.push_str(&parts.join("/"));
    if trailing && !parts.is_empty() {
        cleaned.push('/');
    }
    cleaned
}

/// Resolve `relative` against `path` the way a browser resolves a link
/// against a page: the last segment of `path` is replaced unless `path`
/// ends with a separator.
pub fn apply_relative_path(path: &str, relative: &str) -> String {
    match path.rfind('/') {
        Some(slash) => {
            let mut joined = path[..slash + 1].to_string();
            joined.push_str(relative.trim_start_matches('/'));
            joined
        }
        None => relative.to_string(),
    }
}

/// Render a filesystem path with `/` separators.
pub fn to_slash_path(path: &Path) -> String {
    let mut rendered = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => rendered.push('/'),
            Component::Prefix(prefix) => rendered.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !rendered.is_empty() && !rendered.ends_with('/') {
                    rendered.push('/');
                }
                rendered.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    rendered
}

/// The last non-empty `/`-separated segment of `path`.
pub fn last_segment(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}
