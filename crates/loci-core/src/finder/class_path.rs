use crate::classpath::ClassPath;
use crate::resource::ResourceRef;
use std::sync::Arc;
use tracing::debug;

/// Enumerates every class path layer exposing a name.
///
/// Unlike the other finders this one takes a literal name rather than a
/// base resource and sub-pattern, and is the one lookup that may return
/// several resources for a single literal name.
#[derive(Debug, Clone)]
pub struct ClassPathResourceFinder {
    class_path: Arc<ClassPath>,
}

impl ClassPathResourceFinder {
    /// Create a finder over `class_path`.
    pub fn new(class_path: Arc<ClassPath>) -> Self {
        ClassPathResourceFinder { class_path }
    }

    /// The class path searched.
    pub fn class_path(&self) -> &Arc<ClassPath> {
        &self.class_path
    }

    /// One resource per layer exposing `name`, in layer order.
    pub fn find(&self, name: &str) -> Vec<ResourceRef> {
        let found = self.class_path.find_resources(name);
        debug!(name, layers = self.class_path.len(), found = found.len(), "Class path lookup finished");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_archive;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_same_name_on_several_layers() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        fs::create_dir_all(first.join("META-INF")).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("META-INF/services"), "a").unwrap();
        let jar = temp_dir.path().join("lib.jar");
        write_archive(&jar, &[("META-INF/services", "b")]);

        let finder = ClassPathResourceFinder::new(Arc::new(ClassPath::from_entries([
            first, second, jar,
        ])));
        let found = finder.find("META-INF/services");
        assert_eq!(found.len(), 2);
        assert!(found[0].is_file());
        assert!(!found[1].is_file());
        assert!(finder.find("META-INF/none").is_empty());
    }
}
