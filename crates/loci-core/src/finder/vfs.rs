use super::ResourceFinder;
use crate::error::Result;
use crate::matcher::PathMatcher;
use crate::resource::{ResourceRef, VfsResource};
use crate::vfs::{normalize_vfs_path, VfsAttributes, VfsProvider, VfsVisitor, VisitAttributes};
use std::sync::Arc;
use tracing::{debug, trace};

/// Finds paths in a virtual filesystem, if one is plugged in.
///
/// Without a provider the finder is inert and every search yields nothing.
#[derive(Debug, Clone)]
pub struct VfsResourceFinder {
    matcher: Arc<PathMatcher>,
    provider: Option<Arc<dyn VfsProvider>>,
}

impl VfsResourceFinder {
    /// Probe for a provider once, producing a live or an inert finder.
    pub fn probe(matcher: Arc<PathMatcher>, provider: Option<Arc<dyn VfsProvider>>) -> Self {
        match &provider {
            Some(provider) => debug!(
                provider = provider.name(),
                scheme = provider.scheme(),
                "Virtual filesystem provider detected"
            ),
            None => debug!("No virtual filesystem provider, VFS search disabled"),
        }
        VfsResourceFinder { matcher, provider }
    }

    /// True if a provider is plugged in.
    pub fn is_active(&self) -> bool {
        self.provider.is_some()
    }

    /// The plugged-in provider.
    pub fn provider(&self) -> Option<&Arc<dyn VfsProvider>> {
        self.provider.as_ref()
    }
}

impl ResourceFinder for VfsResourceFinder {
    fn name(&self) -> &'static str {
        "vfs"
    }

    fn find(&self, base: &ResourceRef, sub_pattern: &str) -> Result<Vec<ResourceRef>> {
        let Some(provider) = &self.provider else {
            return Ok(Vec::new());
        };
        let locator = base.locator()?;
        if !locator.scheme().eq_ignore_ascii_case(provider.scheme()) {
            debug!(locator = %locator, provider = provider.scheme(), "Locator belongs to another virtual filesystem");
            return Ok(Vec::new());
        }

        let root = normalize_vfs_path(locator.path());
        let mut visitor = PatternVisitor {
            matcher: &self.matcher,
            provider,
            sub_pattern,
            prefix: if root == "/" {
                root.clone()
            } else {
                format!("{}/", root)
            },
            found: Vec::new(),
        };
        provider.visit(&root, &mut visitor)?;

        debug!(root = %root, pattern = sub_pattern, found = visitor.found.len(), "VFS search finished");
        Ok(visitor.found)
    }
}

/// Collects visited paths whose path below the root matches the pattern.
struct PatternVisitor<'a> {
    matcher: &'a PathMatcher,
    provider: &'a Arc<dyn VfsProvider>,
    sub_pattern: &'a str,
    prefix: String,
    found: Vec<ResourceRef>,
}

impl VfsVisitor for PatternVisitor<'_> {
    fn attributes(&self) -> VisitAttributes {
        VisitAttributes::RECURSE
    }

    fn visit(&mut self, path: &str, attributes: &VfsAttributes) {
        let Some(relative) = path.strip_prefix(&self.prefix) else {
            return;
        };
        let separator = self.matcher.separator();
        let matched = self.matcher.matches(self.sub_pattern, relative)
            || (attributes.is_dir
                && self.sub_pattern.ends_with(separator)
                && self
                    .matcher
                    .matches(self.sub_pattern, &format!("{}{}", relative, separator)));
        if matched {
            trace!(path, "Matched");
            self.found
                .push(Arc::new(VfsResource::new(Arc::clone(self.provider), path)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FileResource;
    use crate::vfs::MemoryVfs;

    fn provider() -> Arc<dyn VfsProvider> {
        let vfs = MemoryVfs::new();
        vfs.insert("/app/a.txt", "a");
        vfs.insert("/app/sub/b.txt", "b");
        vfs.insert("/app/sub/c.json", "{}");
        Arc::new(vfs)
    }

    fn descriptions(found: &[ResourceRef]) -> Vec<String> {
        found.iter().map(|resource| resource.description()).collect()
    }

    #[test]
    fn test_active_finder() {
        let provider = provider();
        let finder = VfsResourceFinder::probe(Arc::new(PathMatcher::new()), Some(Arc::clone(&provider)));
        assert!(finder.is_active());

        let base: ResourceRef = Arc::new(VfsResource::new(provider, "/app/"));
        let found = finder.find(&base, "**/*.txt").unwrap();
        assert_eq!(
            descriptions(&found),
            vec!["VFS resource [vfs:/app/a.txt]", "VFS resource [vfs:/app/sub/b.txt]"]
        );

        let found = finder.find(&base, "sub").unwrap();
        assert_eq!(descriptions(&found), vec!["VFS resource [vfs:/app/sub]"]);
    }

    #[test]
    fn test_trailing_separator_matches_directories() {
        let provider = provider();
        let finder = VfsResourceFinder::probe(Arc::new(PathMatcher::new()), Some(Arc::clone(&provider)));

        let base: ResourceRef = Arc::new(VfsResource::new(provider, "/app/"));
        let found = finder.find(&base, "**/").unwrap();
        assert_eq!(descriptions(&found), vec!["VFS resource [vfs:/app/sub]"]);
    }

    #[test]
    fn test_inert_finder() {
        let finder = VfsResourceFinder::probe(Arc::new(PathMatcher::new()), None);
        assert!(!finder.is_active());

        let base: ResourceRef = Arc::new(VfsResource::new(provider(), "/app/"));
        assert!(finder.find(&base, "**").unwrap().is_empty());
    }

    #[test]
    fn test_foreign_locator_is_ignored() {
        let finder = VfsResourceFinder::probe(Arc::new(PathMatcher::new()), Some(provider()));
        let base: ResourceRef = Arc::new(FileResource::new("/app/"));
        assert!(finder.find(&base, "**").unwrap().is_empty());
    }
}
