//! Cat command - print the contents of a single resource.

use crate::app::{App, Overrides};
use loci_core::{Config, Resource};
use std::io::{self, Write};
use tracing::debug;

/// Run the cat command.
///
/// Patterns are rejected; a class path location prints the first layer
/// exposing the name.
pub fn run(config: Config, overrides: Overrides, location: &str) -> anyhow::Result<()> {
    if loci_core::classify(location).is_pattern() {
        anyhow::bail!("'{}' is a pattern; use 'loci resolve' to list its matches", location);
    }

    let app = App::new(config, overrides)?;
    let resource = app.loader.get_resource(location)?;
    debug!(resource = %resource.description(), "Reading resource");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    copy_to(resource.as_ref(), &mut out)?;
    out.flush()?;
    Ok(())
}

fn copy_to(resource: &dyn Resource, out: &mut impl Write) -> anyhow::Result<u64> {
    let mut stream = resource.open_stream()?;
    Ok(io::copy(&mut stream, out)?)
}
