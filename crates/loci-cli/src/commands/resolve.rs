//! Resolve command - list the resources location patterns address.

use crate::app::{App, Overrides};
use crate::OutputFormat;
use chrono::{DateTime, Utc};
use loci_core::{Config, PathMatchingResourceLoader, Resource, ResourceSet};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::warn;

/// Size and modification time of a resource, when the backend knows them.
#[derive(Debug, Clone, Serialize)]
struct Stat {
    size: Option<u64>,
    modified: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ResolvedResource {
    description: String,
    locator: Option<String>,
    is_file: bool,
    #[serde(flatten)]
    stat: Option<Stat>,
}

#[derive(Serialize)]
struct ResolvedPattern {
    pattern: String,
    elapsed_ms: f64,
    count: usize,
    resources: Vec<ResolvedResource>,
}

/// Run the resolve command.
pub fn run(
    config: Config,
    overrides: Overrides,
    patterns: &[String],
    limit: Option<usize>,
    stat: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config, overrides)?;

    let results: Vec<ResolvedPattern> = patterns
        .par_iter()
        .map(|pattern| resolve_one(&app.loader, pattern, limit, stat))
        .collect::<anyhow::Result<_>>()?;

    match output {
        OutputFormat::Text => {
            for result in &results {
                if patterns.len() > 1 {
                    println!("{}:", result.pattern);
                }
                for resource in &result.resources {
                    match &resource.stat {
                        Some(stat) => println!(
                            "{} ({}, {})",
                            resource.description,
                            stat.size
                                .map_or_else(|| "? bytes".to_string(), |size| format!("{} bytes", size)),
                            stat.modified
                                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                        ),
                        None => println!("{}", resource.description),
                    }
                }
                eprintln!(
                    "Found {} resources for '{}' in {:.3}ms",
                    result.count, result.pattern, result.elapsed_ms
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

fn resolve_one(
    loader: &PathMatchingResourceLoader,
    pattern: &str,
    limit: Option<usize>,
    stat: bool,
) -> anyhow::Result<ResolvedPattern> {
    let start = Instant::now();
    let mut resolved: ResourceSet = loader.resolve(pattern)?;
    let elapsed = start.elapsed();

    let count = resolved.len();
    if let Some(limit) = limit {
        resolved.truncate(limit);
    }

    let mut resources = Vec::with_capacity(resolved.len());
    for resource in &resolved {
        let stat = if stat {
            Some(loader.computed(resource.as_ref(), |resource| Ok(stat_of(resource)))?)
        } else {
            None
        };
        resources.push(ResolvedResource {
            description: resource.description(),
            locator: resource.locator().ok().map(|url| url.to_string()),
            is_file: resource.is_file(),
            stat,
        });
    }

    Ok(ResolvedPattern {
        pattern: pattern.to_string(),
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        count,
        resources,
    })
}

fn stat_of(resource: &dyn Resource) -> Stat {
    let size = match resource.content_length() {
        Ok(size) => Some(size),
        Err(err) => {
            warn!(resource = %resource.description(), error = %err, "Could not determine size");
            None
        }
    };
    Stat {
        size,
        modified: resource.last_modified().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn loader(temp_dir: &TempDir) -> PathMatchingResourceLoader {
        PathMatchingResourceLoader::builder()
            .base_dir(temp_dir.path())
            .cache(std::sync::Arc::new(loci_core::ResourceCache::new()))
            .build()
    }

    #[test]
    fn test_resolve_one_with_limit() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("conf")).unwrap();
        fs::write(temp_dir.path().join("conf/a.toml"), "a = 1").unwrap();
        fs::write(temp_dir.path().join("conf/b.toml"), "b = 2").unwrap();

        let result = resolve_one(&loader(&temp_dir), "conf/*.toml", Some(1), false).unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.resources.len(), 1);
        assert!(result.resources[0].is_file);
        assert!(result.resources[0].stat.is_none());
    }

    #[test]
    fn test_resolve_one_with_stat() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "hello").unwrap();

        let result = resolve_one(&loader(&temp_dir), "*.txt", None, true).unwrap();
        let stat = result.resources[0].stat.as_ref().unwrap();
        assert_eq!(stat.size, Some(5));
        assert!(stat.modified.is_some());
    }
}
