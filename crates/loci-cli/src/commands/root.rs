//! Root command - show how a location is split for searching.

use loci_core::classify;

/// Run the root command.
pub fn run(pattern: &str) -> anyhow::Result<()> {
    for line in describe(pattern) {
        println!("{}", line);
    }
    Ok(())
}

fn describe(pattern: &str) -> Vec<String> {
    let classification = classify(pattern);
    let mut lines = vec![
        format!("Location:     {}", classification.location()),
        format!("Class path:   {}", classification.is_class_path()),
        format!("Pattern:      {}", classification.is_pattern()),
        format!("Prefix end:   {}", classification.prefix_end()),
    ];

    if classification.is_pattern() {
        let extraction = classification.extract_root();
        lines.push(format!("Root:         {}", extraction.root));
        lines.push(format!("Sub-pattern:  {}", extraction.remainder));
    }
    lines
}
