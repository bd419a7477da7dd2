//! Glob-style path matching over separator-delimited strings.
//!
//! The matcher understands three wildcard tokens:
//!
//! - `?` matches exactly one character within a segment
//! - `*` matches zero or more characters within a segment
//! - `**` matches zero or more whole segments
//!
//! A segment may also carry URI template variables such as `{name}` or
//! `{name:[a-z]+}`; those segments are compiled to regular expressions and
//! the captured values can be read back with
//! [`PathMatcher::extract_uri_template_variables`].
//!
//! ## Algorithm
//!
//! Both the pattern and the path are split into segments. Fixed segments
//! before the first `**` and after the last `**` are consumed from both ends.
//! Whatever lies between consecutive `**` tokens is then located in the
//! remaining path by trying split points left to right and taking the first
//! one that fits. The search is bounded by the number of segments, never by
//! the number of characters, so the worst case stays polynomial.
//!
//! ## Example
//!
//! ```rust
//! use loci_core::PathMatcher;
//!
//! let matcher = PathMatcher::new();
//! assert!(matcher.matches("**/*.xml", "WEB-INF/web.xml"));
//! assert!(!matcher.matches("*.xml", "WEB-INF/web.xml"));
//! ```

use dashmap::DashMap;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default segment separator.
pub const DEFAULT_SEPARATOR: &str = "/";

/// Token matching any number of whole segments.
const DOUBLE_WILDCARD: &str = "**";

/// Compiled-pattern caching switches itself off past this many entries.
const CACHE_TURNOFF_THRESHOLD: usize = 65_536;

/// Returns true if `path` contains a wildcard or template character.
///
/// This is the separator-independent check used by location classification.
pub fn is_pattern(path: &str) -> bool {
    path.contains(['*', '?', '{'])
}

/// Matches `/`-delimited paths against glob patterns.
///
/// The matcher is stateless apart from an optional cache of compiled
/// segments, which lives in a concurrent map so one instance can be shared
/// across threads.
pub struct PathMatcher {
    /// Segment separator
    separator: String,

    /// Compare characters case-sensitively
    case_sensitive: bool,

    /// Trim whitespace around segments when tokenizing
    trim_tokens: bool,

    /// Caching requested by the caller
    cache_patterns: bool,

    /// Cleared once the caches grow past the turnoff threshold
    cache_active: AtomicBool,

    /// Tokenized patterns
    token_cache: DashMap<String, Arc<[String]>>,

    /// Compiled single-segment matchers
    segment_cache: DashMap<String, Arc<SegmentMatcher>>,
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathMatcher")
            .field("separator", &self.separator)
            .field("case_sensitive", &self.case_sensitive)
            .field("trim_tokens", &self.trim_tokens)
            .field("cache_patterns", &self.cache_patterns)
            .field("cached_segments", &self.segment_cache.len())
            .finish()
    }
}

impl PathMatcher {
    /// Create a matcher using `/` as separator.
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    /// Create a matcher using a custom separator.
    ///
    /// An empty separator falls back to `/`.
    pub fn with_separator(separator: impl Into<String>) -> Self {
        let mut separator = separator.into();
        if separator.is_empty() {
            separator = DEFAULT_SEPARATOR.to_string();
        }
        PathMatcher {
            separator,
            case_sensitive: true,
            trim_tokens: false,
            cache_patterns: true,
            cache_active: AtomicBool::new(true),
            token_cache: DashMap::new(),
            segment_cache: DashMap::new(),
        }
    }

    /// Set whether characters are compared case-sensitively.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self.clear_cache();
        self
    }

    /// Set whether whitespace around segments is trimmed.
    pub fn trim_tokens(mut self, trim_tokens: bool) -> Self {
        self.trim_tokens = trim_tokens;
        self.clear_cache();
        self
    }

    /// Set whether tokenized patterns and compiled segments are cached.
    pub fn cache_patterns(mut self, cache_patterns: bool) -> Self {
        self.cache_patterns = cache_patterns;
        self.cache_active = AtomicBool::new(cache_patterns);
        self.clear_cache();
        self
    }

    /// The segment separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Drop every cached tokenization and compiled segment.
    pub fn clear_cache(&self) {
        self.token_cache.clear();
        self.segment_cache.clear();
    }

    /// Returns true if `path` contains `?`, `*` or `{`.
    pub fn is_pattern(&self, path: &str) -> bool {
        is_pattern(path)
    }

    /// Full match of `path` against `pattern`.
    pub fn matches(&self, pattern: &str, path: &str) -> bool {
        self.do_match(pattern, path, true, None)
    }

    /// Returns true if `path` could be a leading part of something `pattern`
    /// matches.
    ///
    /// Directory walks use this to decide whether descending into a
    /// directory can still produce matches. It is true for every ancestor
    /// directory of a path that [`matches`](Self::matches).
    pub fn match_start(&self, pattern: &str, path: &str) -> bool {
        self.do_match(pattern, path, false, None)
    }

    /// Returns the part of `path` matched by the wildcard portion of
    /// `pattern`.
    ///
    /// Segments are walked in step; from the first pattern segment carrying
    /// a wildcard onward, every remaining path segment is emitted. A literal
    /// pattern yields an empty string.
    ///
    /// - `/docs/cvs/*.html` and `/docs/cvs/commit.html` give `commit.html`
    /// - `/docs/**` and `/docs/cvs/commit` give `cvs/commit`
    pub fn extract_path_within_pattern(&self, pattern: &str, path: &str) -> String {
        let pattern_parts = self.tokenize(pattern);
        let path_parts = self.tokenize(path);

        let first_wildcard = pattern_parts
            .iter()
            .position(|part| part.contains(['*', '?']));

        match first_wildcard {
            Some(start) if start < path_parts.len() => path_parts[start..].join(&self.separator),
            _ => String::new(),
        }
    }

    /// Extract URI template variables such as `{name}` from `path`.
    ///
    /// Returns `None` when `path` does not match `pattern`. Variables are
    /// returned in the order they appear in the pattern.
    pub fn extract_uri_template_variables(
        &self,
        pattern: &str,
        path: &str,
    ) -> Option<IndexMap<String, String>> {
        let mut variables = IndexMap::new();
        if self.do_match(pattern, path, true, Some(&mut variables)) {
            Some(variables)
        } else {
            None
        }
    }

    fn do_match(
        &self,
        pattern: &str,
        path: &str,
        full_match: bool,
        mut variables: Option<&mut IndexMap<String, String>>,
    ) -> bool {
        let sep = self.separator.as_str();
        if path.starts_with(sep) != pattern.starts_with(sep) && !pattern.starts_with(DOUBLE_WILDCARD)
        {
            return false;
        }
        // A pattern ending in the separator only matches containers.
        if full_match && pattern.ends_with(sep) && !path.ends_with(sep) {
            return false;
        }

        let patt_dirs = self.tokenize_pattern(pattern);
        let path_dirs = self.tokenize(path);

        // Signed cursors: the end indices walk below zero when a side is used up.
        let mut patt_start: isize = 0;
        let mut patt_end: isize = patt_dirs.len() as isize - 1;
        let mut path_start: isize = 0;
        let mut path_end: isize = path_dirs.len() as isize - 1;

        let patt = |i: isize| patt_dirs[i as usize].as_str();
        let segment = |i: isize| path_dirs[i as usize].as_str();

        // Fixed prefix up to the first `**`
        while patt_start <= patt_end && path_start <= path_end {
            let dir = patt(patt_start);
            if dir == DOUBLE_WILDCARD {
                break;
            }
            if !self.match_segment(dir, segment(path_start), variables.as_deref_mut()) {
                return false;
            }
            patt_start += 1;
            path_start += 1;
        }

        if path_start > path_end {
            // Path used up: only a trailing `*` or run of `**` may remain
            if patt_start > patt_end {
                return pattern.ends_with(sep) == path.ends_with(sep);
            }
            if !full_match {
                return true;
            }
            if patt_start == patt_end && patt(patt_start) == "*" && path.ends_with(sep) {
                return true;
            }
            return (patt_start..=patt_end).all(|i| patt(i) == DOUBLE_WILDCARD);
        } else if patt_start > patt_end {
            // Pattern used up while path segments remain
            return false;
        } else if !full_match && patt(patt_start) == DOUBLE_WILDCARD {
            return true;
        }

        // Fixed suffix after the last `**`
        while patt_start <= patt_end && path_start <= path_end {
            let dir = patt(patt_end);
            if dir == DOUBLE_WILDCARD {
                break;
            }
            if !self.match_segment(dir, segment(path_end), variables.as_deref_mut()) {
                return false;
            }
            patt_end -= 1;
            path_end -= 1;
        }

        if path_start > path_end {
            return (patt_start..=patt_end).all(|i| patt(i) == DOUBLE_WILDCARD);
        }

        // Interior runs between consecutive `**` tokens
        while patt_start != patt_end && path_start <= path_end {
            let next_double = ((patt_start + 1)..=patt_end).find(|&i| patt(i) == DOUBLE_WILDCARD);
            let Some(next_double) = next_double else {
                break;
            };
            if next_double == patt_start + 1 {
                // `**/**` collapses to a single `**`
                patt_start += 1;
                continue;
            }

            let run_len = next_double - patt_start - 1;
            let available = path_end - path_start + 1;
            let mut found: Option<isize> = None;

            for offset in 0..=(available - run_len) {
                let fits = (0..run_len).all(|j| {
                    self.match_segment(
                        patt(patt_start + 1 + j),
                        segment(path_start + offset + j),
                        variables.as_deref_mut(),
                    )
                });
                if fits {
                    found = Some(path_start + offset);
                    break;
                }
            }

            let Some(found) = found else {
                return false;
            };
            patt_start = next_double;
            path_start = found + run_len;
        }

        (patt_start..=patt_end).all(|i| patt(i) == DOUBLE_WILDCARD)
    }

    /// Match one pattern segment against one path segment.
    fn match_segment(
        &self,
        pattern: &str,
        text: &str,
        variables: Option<&mut IndexMap<String, String>>,
    ) -> bool {
        self.segment_matcher(pattern)
            .matches(text, self.case_sensitive, variables)
    }

    fn segment_matcher(&self, pattern: &str) -> Arc<SegmentMatcher> {
        let caching = self.cache_active.load(Ordering::Relaxed);
        if caching {
            if let Some(hit) = self.segment_cache.get(pattern) {
                return Arc::clone(hit.value());
            }
        }

        let compiled = Arc::new(SegmentMatcher::compile(pattern, self.case_sensitive));

        if caching {
            if self.segment_cache.len() >= CACHE_TURNOFF_THRESHOLD {
                self.deactivate_cache();
            } else {
                self.segment_cache
                    .insert(pattern.to_string(), Arc::clone(&compiled));
            }
        }
        compiled
    }

    fn tokenize_pattern(&self, pattern: &str) -> Arc<[String]> {
        let caching = self.cache_active.load(Ordering::Relaxed);
        if caching {
            if let Some(hit) = self.token_cache.get(pattern) {
                return Arc::clone(hit.value());
            }
        }

        let tokens: Arc<[String]> = self.tokenize(pattern).into();

        if caching {
            if self.token_cache.len() >= CACHE_TURNOFF_THRESHOLD {
                self.deactivate_cache();
            } else {
                self.token_cache
                    .insert(pattern.to_string(), Arc::clone(&tokens));
            }
        }
        tokens
    }

    fn deactivate_cache(&self) {
        // Past this size the cache is likely fed by unbounded input
        warn!(
            threshold = CACHE_TURNOFF_THRESHOLD,
            "Pattern cache exceeded threshold, turning it off"
        );
        self.cache_active.store(false, Ordering::Relaxed);
        self.clear_cache();
    }

    fn tokenize(&self, path: &str) -> Vec<String> {
        path.split(self.separator.as_str())
            .map(|token| if self.trim_tokens { token.trim() } else { token })
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A compiled single-segment pattern.
#[derive(Debug)]
enum SegmentMatcher {
    /// No wildcard at all
    Literal(String),

    /// `?` and `*` only
    Glob(Vec<char>),

    /// Contains `{...}` variables; `groups[i]` is the capture index of `names[i]`
    Template {
        regex: Option<Regex>,
        names: Vec<String>,
        groups: Vec<usize>,
    },
}

impl SegmentMatcher {
    fn compile(pattern: &str, case_sensitive: bool) -> Self {
        if pattern.contains('{') {
            Self::compile_template(pattern, case_sensitive)
        } else if pattern.contains(['*', '?']) {
            SegmentMatcher::Glob(pattern.chars().collect())
        } else {
            SegmentMatcher::Literal(pattern.to_string())
        }
    }

    fn compile_template(pattern: &str, case_sensitive: bool) -> Self {
        let mut source = String::with_capacity(pattern.len() * 2 + 8);
        if !case_sensitive {
            source.push_str("(?i)");
        }
        source.push('^');

        let mut names = Vec::new();
        let mut groups = Vec::new();
        let mut next_group = 1;

        let chars: Vec<char> = pattern.chars().collect();
        let mut literal = String::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '?' => {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    source.push('.');
                    i += 1;
                }
                '*' => {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    source.push_str(".*");
                    i += 1;
                }
                '{' => match find_variable_end(&chars, i) {
                    Some(end) => {
                        source.push_str(&regex::escape(&literal));
                        literal.clear();

                        let body: String = chars[i + 1..end].iter().collect();
                        let (name, custom) = match body.split_once(':') {
                            Some((name, custom)) => (name.trim().to_string(), Some(custom)),
                            None => (body.trim().to_string(), None),
                        };

                        let inner_groups = match custom {
                            Some(custom) => {
                                source.push('(');
                                source.push_str(custom);
                                source.push(')');
                                Regex::new(custom)
                                    .map(|re| re.captures_len() - 1)
                                    .unwrap_or(0)
                            }
                            None => {
                                source.push_str("((?s).*)");
                                0
                            }
                        };

                        names.push(name);
                        groups.push(next_group);
                        next_group += 1 + inner_groups;
                        i = end + 1;
                    }
                    None => {
                        literal.push('{');
                        i += 1;
                    }
                },
                c => {
                    literal.push(c);
                    i += 1;
                }
            }
        }
        source.push_str(&regex::escape(&literal));
        source.push('$');

        let regex = match Regex::new(&source) {
            Ok(regex) => Some(regex),
            Err(err) => {
                debug!(pattern, error = %err, "Segment pattern does not compile, it will never match");
                None
            }
        };

        SegmentMatcher::Template {
            regex,
            names,
            groups,
        }
    }

    fn matches(
        &self,
        text: &str,
        case_sensitive: bool,
        variables: Option<&mut IndexMap<String, String>>,
    ) -> bool {
        match self {
            SegmentMatcher::Literal(literal) => {
                if case_sensitive {
                    literal == text
                } else {
                    literal.to_lowercase() == text.to_lowercase()
                }
            }
            SegmentMatcher::Glob(pattern) => glob_match(pattern, text, case_sensitive),
            SegmentMatcher::Template {
                regex,
                names,
                groups,
            } => {
                let Some(regex) = regex else {
                    return false;
                };
                let Some(captures) = regex.captures(text) else {
                    return false;
                };
                if let Some(variables) = variables {
                    for (name, group) in names.iter().zip(groups) {
                        if let Some(value) = captures.get(*group) {
                            variables.insert(name.clone(), value.as_str().to_string());
                        }
                    }
                }
                true
            }
        }
    }
}

/// Find the `}` closing the variable opened at `start`, allowing one level
/// of nested braces for quantifiers such as `{id:[0-9]{2}}`.
fn find_variable_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (i > start + 1).then_some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Single-segment glob match of `?` and `*`.
///
/// Iterative with a single backtrack point: on mismatch, the most recent
/// `*` absorbs one more character.
fn glob_match(pattern: &[char], text: &str, case_sensitive: bool) -> bool {
    let text: Vec<char> = text.chars().collect();
    let same = |a: char, b: char| {
        if case_sensitive {
            a == b
        } else {
            a == b || a.to_lowercase().eq(b.to_lowercase())
        }
    };

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '?' || same(pattern[p], text[t])) {
            p += 1;
            t += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
