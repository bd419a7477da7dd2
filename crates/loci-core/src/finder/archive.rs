use super::ResourceFinder;
use crate::archive::{with_archive, ArchiveLocator};
use crate::error::Result;
use crate::matcher::PathMatcher;
use crate::resource::{ArchiveEntryResource, ResourceRef};
use std::sync::Arc;
use tracing::{debug, trace};

/// Finds entries inside an archive.
///
/// The central directory is scanned once per call. An open archive carried
/// by the base resource is borrowed; otherwise the archive is opened for
/// the call and closed before returning, on every path.
#[derive(Debug, Clone)]
pub struct ArchiveResourceFinder {
    matcher: Arc<PathMatcher>,
}

impl ArchiveResourceFinder {
    /// Create a finder using `matcher`.
    pub fn new(matcher: Arc<PathMatcher>) -> Self {
        ArchiveResourceFinder { matcher }
    }
}

impl ResourceFinder for ArchiveResourceFinder {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn find(&self, base: &ResourceRef, sub_pattern: &str) -> Result<Vec<ResourceRef>> {
        let locator = match base.archive_locator() {
            Some(locator) => locator,
            None => ArchiveLocator::parse(base.locator()?.as_str())?,
        };
        let shared = base.shared_archive();

        let mut root_entry = locator.entry().to_string();
        if !root_entry.is_empty() && !root_entry.ends_with('/') {
            root_entry.push('/');
        }

        let matched: Vec<String> = with_archive(locator.source(), shared.as_ref(), |archive| {
            let mut matched = Vec::new();
            for name in archive.file_names() {
                let Some(relative) = name.strip_prefix(root_entry.as_str()) else {
                    continue;
                };
                if relative.is_empty() {
                    continue;
                }
                if self.matcher.matches(sub_pattern, relative) {
                    trace!(entry = name, "Matched");
                    matched.push(name.to_string());
                }
            }
            Ok(matched)
        })?;

        debug!(
            archive = %locator.source(),
            root = %root_entry,
            pattern = sub_pattern,
            found = matched.len(),
            "Archive search finished"
        );

        Ok(matched
            .into_iter()
            .map(|entry| {
                let entry_locator = locator.with_entry(entry);
                let resource = match &shared {
                    Some(shared) => ArchiveEntryResource::with_shared(entry_locator, shared.clone()),
                    None => ArchiveEntryResource::new(entry_locator),
                };
                Arc::new(resource) as ResourceRef
            })
            .collect())
    }
}
