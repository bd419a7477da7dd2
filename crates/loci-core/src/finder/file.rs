use super::ResourceFinder;
use crate::error::Result;
use crate::location::to_slash_path;
use crate::matcher::PathMatcher;
use crate::resource::{FileResource, Resource, ResourceRef};
use std::sync::Arc;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Finds files and directories below a local directory.
///
/// The walk is depth first in file name order. A directory is only entered
/// if the sub-pattern can still match something below it.
#[derive(Debug, Clone)]
pub struct FileResourceFinder {
    matcher: Arc<PathMatcher>,
    follow_links: bool,
    max_depth: Option<usize>,
}

impl FileResourceFinder {
    /// Create a finder using `matcher`.
    pub fn new(matcher: Arc<PathMatcher>) -> Self {
        FileResourceFinder {
            matcher,
            follow_links: false,
            max_depth: None,
        }
    }

    /// Follow symbolic links while walking.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Limit how deep below the base directory the walk goes.
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }
}

impl ResourceFinder for FileResourceFinder {
    fn name(&self) -> &'static str {
        "file"
    }

    fn find(&self, base: &ResourceRef, sub_pattern: &str) -> Result<Vec<ResourceRef>> {
        let root = base.to_file()?;
        if !root.is_dir() {
            debug!(root = %root.display(), "Skipping search root, not a directory");
            return Ok(Vec::new());
        }

        if !self.matcher.is_pattern(sub_pattern) {
            let candidate = FileResource::new(root.join(sub_pattern));
            return Ok(if candidate.exists() {
                vec![Arc::new(candidate) as ResourceRef]
            } else {
                Vec::new()
            });
        }

        let separator = self.matcher.separator();
        let mut walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(self.follow_links)
            .sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut found: Vec<ResourceRef> = Vec::new();
        let mut entries = walker.into_iter();
        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(root = %root.display(), error = %err, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let relative = to_slash_path(relative);
            let is_dir = entry.file_type().is_dir();

            let matched = self.matcher.matches(sub_pattern, &relative)
                || (is_dir
                    && sub_pattern.ends_with(separator)
                    && self
                        .matcher
                        .matches(sub_pattern, &format!("{}{}", relative, separator)));
            if matched {
                trace!(path = %relative, "Matched");
                found.push(Arc::new(FileResource::new(entry.path())));
            }

            if is_dir
                && !self
                    .matcher
                    .match_start(sub_pattern, &format!("{}{}", relative, separator))
            {
                trace!(path = %relative, "Pruned directory");
                entries.skip_current_dir();
            }
        }

        debug!(root = %root.display(), pattern = sub_pattern, found = found.len(), "File search finished");
        Ok(found)
    }
}
