//! Status command - show the effective configuration.

use crate::app::{App, Overrides};
use loci_core::{ClassPathLayer, Config};
use std::path::Path;

/// Run the status command.
pub fn run(config: Config, overrides: Overrides, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };
    let app = App::new(config, overrides)?;

    println!("Loci Status");
    println!("===========");
    println!();

    println!("Configuration:");
    println!(
        "  Config file:       {}{}",
        config_file.display(),
        if config_file.exists() { "" } else { " (not found, using defaults)" }
    );
    println!("  Base directory:    {}", app.loader.base_dir().display());
    println!("  Log level:         {}", app.config.general.log_level);
    println!();

    println!("Matcher:");
    println!("  Case sensitive:    {}", app.config.matcher.case_sensitive);
    println!("  Trim tokens:       {}", app.config.matcher.trim_tokens);
    println!("  Cache patterns:    {}", app.config.matcher.cache_patterns);
    println!();

    println!("Directory walk:");
    println!("  Follow links:      {}", app.config.walk.follow_links);
    match app.config.walk.max_depth {
        Some(depth) => println!("  Max depth:         {}", depth),
        None => println!("  Max depth:         unlimited"),
    }
    println!(
        "  Virtual FS:        {}",
        if app.loader.vfs_active() { "active" } else { "not available" }
    );
    println!();

    let class_path = app.loader.class_path();
    println!("Class path ({} layers):", class_path.len());
    if class_path.is_empty() {
        println!("  (empty)");
    }
    for layer in class_path.layers() {
        println!("  {}", layer_line(layer));
    }

    Ok(())
}

fn layer_line(layer: &ClassPathLayer) -> String {
    let kind = if layer.is_archive() { "archive" } else { "dir" };
    let status = if layer.path().exists() { "✓" } else { "✗ missing" };
    format!("[{}] {} {}", kind, layer.path().display(), status)
}
