//! Application state management.

use loci_core::{Config, PathMatchingResourceLoader, ResourceCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line settings that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Base directory for relative locations
    pub base_dir: Option<PathBuf>,

    /// Class path entries, replacing the configured ones when non-empty
    pub class_path: Vec<PathBuf>,
}

impl Overrides {
    /// Fold the overrides into `config`.
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(base_dir) = self.base_dir {
            config.general.base_dir = Some(base_dir);
        }
        if !self.class_path.is_empty() {
            config.class_path.entries = self.class_path;
        }
        config
    }
}

/// Shared application state.
pub struct App {
    /// Effective configuration
    pub config: Config,

    /// The resource loader
    pub loader: PathMatchingResourceLoader,

    /// Cache of values derived from resources
    pub cache: Arc<ResourceCache>,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: Config, overrides: Overrides) -> anyhow::Result<Self> {
        let config = overrides.apply(config);
        let cache = Arc::new(ResourceCache::new());
        let loader = config.loader_builder().cache(Arc::clone(&cache)).build();

        info!(
            base_dir = %loader.base_dir().display(),
            class_path_layers = loader.class_path().len(),
            "Application initialized"
        );

        Ok(App {
            config,
            loader,
            cache,
        })
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.loader.class_path().release_archives();
        self.cache.clear();
    }
}
