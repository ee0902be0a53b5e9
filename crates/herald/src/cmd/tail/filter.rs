//! Content filters for received records (client-side filtering)
//!
//! The server sends every record to every subscriber; these filters decide
//! which ones the CLI prints. Records are expected to carry `guild`,
//! `channel`, `author` and `author_bot` fields; a record missing a field
//! never matches a filter on that field.

use serde_json::Value;

/// Content filter for records
#[derive(Debug, Default)]
pub struct ContentFilter {
    /// Filter by guild name (glob-style matching)
    guilds: Option<Vec<Pattern>>,
    /// Filter by channel name (glob-style matching)
    channels: Option<Vec<Pattern>>,
    /// Filter by author name (glob-style matching)
    authors: Option<Vec<Pattern>>,
    /// Filter by substring on any string field
    substring: Option<String>,
    /// Drop records with `author_bot: true`
    hide_bots: bool,
}

/// Simple glob-style pattern (supports * and ?)
#[derive(Debug, Clone)]
pub struct Pattern {
    pattern: String,
}

impl Pattern {
    /// Create a new pattern from a glob string
    pub fn new(glob: &str) -> Self {
        Self {
            pattern: glob.to_string(),
        }
    }

    /// Check if a string matches this pattern
    #[inline]
    pub fn matches(&self, s: &str) -> bool {
        glob_match(&self.pattern, s)
    }
}

/// Simple glob matching (supports `*` and `?`)
///
/// - `*` matches any sequence of characters (including empty)
/// - `?` matches exactly one character
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Resume point after the last `*`: (pattern index, text index)
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                pi += 1;
                backtrack = Some((pi, ti));
            }
            Some('?') => {
                pi += 1;
                ti += 1;
            }
            Some(&c) if c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                // Let the last star swallow one more character
                Some((star_pi, star_ti)) => {
                    pi = star_pi;
                    ti = star_ti + 1;
                    backtrack = Some((star_pi, ti));
                }
                None => return false,
            },
        }
    }

    // Only stars may remain
    p[pi..].iter().all(|&c| c == '*')
}

/// Compile patterns; an empty list means no filter
fn compile(patterns: Vec<&str>) -> Option<Vec<Pattern>> {
    if patterns.is_empty() {
        return None;
    }
    Some(patterns.into_iter().map(Pattern::new).collect())
}

/// Whether `field` of `record` is a string matching any pattern
fn field_matches(patterns: &Option<Vec<Pattern>>, record: &Value, field: &str) -> bool {
    match patterns {
        None => true,
        Some(patterns) => record
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|value| patterns.iter().any(|p| p.matches(value))),
    }
}

/// Whether any string anywhere in `value` contains `text`
fn contains_text(value: &Value, text: &str) -> bool {
    match value {
        Value::String(s) => s.contains(text),
        Value::Array(items) => items.iter().any(|v| contains_text(v, text)),
        Value::Object(map) => map.values().any(|v| contains_text(v, text)),
        _ => false,
    }
}

impl ContentFilter {
    /// Create a new empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any filter is set
    pub fn is_active(&self) -> bool {
        self.guilds.is_some()
            || self.channels.is_some()
            || self.authors.is_some()
            || self.substring.is_some()
            || self.hide_bots
    }

    /// Add guild name filter (glob patterns)
    pub fn with_guilds(mut self, patterns: Vec<&str>) -> Self {
        self.guilds = compile(patterns);
        self
    }

    /// Add channel name filter (glob patterns)
    pub fn with_channels(mut self, patterns: Vec<&str>) -> Self {
        self.channels = compile(patterns);
        self
    }

    /// Add author name filter (glob patterns)
    pub fn with_authors(mut self, patterns: Vec<&str>) -> Self {
        self.authors = compile(patterns);
        self
    }

    /// Add substring filter (matches any string field)
    pub fn with_substring(mut self, text: &str) -> Self {
        if text.is_empty() {
            return self;
        }
        self.substring = Some(text.to_string());
        self
    }

    pub fn without_bots(mut self, hide: bool) -> Self {
        self.hide_bots = hide;
        self
    }

    /// Check if a record passes every configured filter
    pub fn matches(&self, record: &Value) -> bool {
        if self.hide_bots && record.get("author_bot").and_then(Value::as_bool) == Some(true) {
            return false;
        }

        if !field_matches(&self.guilds, record, "guild")
            || !field_matches(&self.channels, record, "channel")
            || !field_matches(&self.authors, record, "author")
        {
            return false;
        }

        match &self.substring {
            Some(text) => contains_text(record, text),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod filter_test;
