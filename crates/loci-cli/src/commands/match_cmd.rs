//! Match command - test paths against a pattern.

use loci_core::{Config, PathMatcher};

/// Run the match command.
///
/// Prints one line per path and fails if any path does not match.
pub fn run(config: Config, pattern: &str, paths: &[String]) -> anyhow::Result<()> {
    let matcher = config.path_matcher();
    let report = match_report(&matcher, pattern, paths);

    for line in &report.lines {
        println!("{}", line);
    }

    if report.misses > 0 {
        anyhow::bail!("{} of {} paths did not match '{}'", report.misses, paths.len(), pattern);
    }
    Ok(())
}

struct MatchReport {
    lines: Vec<String>,
    misses: usize,
}

fn match_report(matcher: &PathMatcher, pattern: &str, paths: &[String]) -> MatchReport {
    let mut lines = Vec::with_capacity(paths.len());
    let mut misses = 0;

    for path in paths {
        if !matcher.matches(pattern, path) {
            misses += 1;
            if matcher.match_start(pattern, path) {
                lines.push(format!("✗ {}  (prefix of a match)", path));
            } else {
                lines.push(format!("✗ {}", path));
            }
            continue;
        }

        let mut line = format!("✓ {}", path);
        let within = matcher.extract_path_within_pattern(pattern, path);
        if !within.is_empty() && within != *path {
            line.push_str(&format!("  [{}]", within));
        }
        if let Some(variables) = matcher.extract_uri_template_variables(pattern, path) {
            for (name, value) in &variables {
                line.push_str(&format!("  {}={}", name, value));
            }
        }
        lines.push(line);
    }

    MatchReport { lines, misses }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_report() {
        let matcher = PathMatcher::new();
        let paths = vec![
            "/docs/cvs/commit.html".to_string(),
            "/docs/cvs/commit.txt".to_string(),
        ];

        let report = match_report(&matcher, "/docs/cvs/*.html", &paths);
        assert_eq!(report.misses, 1);
        assert_eq!(report.lines[0], "✓ /docs/cvs/commit.html  [commit.html]");
        assert_eq!(report.lines[1], "✗ /docs/cvs/commit.txt");
    }

    #[test]
    fn test_match_report_variables() {
        let matcher = PathMatcher::new();
        let paths = vec!["/hotels/42".to_string()];

        let report = match_report(&matcher, "/hotels/{hotel}", &paths);
        assert_eq!(report.misses, 0);
        assert_eq!(report.lines[0], "✓ /hotels/42  hotel=42");
    }
}
