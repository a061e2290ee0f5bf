//! Category filtering for export targets
//!
//! Every target carries an include list and an exclude list of category
//! patterns:
//! - Exact names: `db`, `http.request`
//! - Wildcards: `db.*` matches `db.connection` but not `dbx`; `?` matches
//!   a single character
//!
//! An empty include list matches everything; an exclude match always wins.

use crate::message::Message;
use regex::{Regex, RegexBuilder};
use std::fmt;

/// A single compiled category pattern
#[derive(Clone)]
pub struct CategoryPattern {
    source: String,
    /// None for patterns without wildcards (exact comparison)
    regex: Option<Regex>,
}

impl CategoryPattern {
    /// Compile a glob-style pattern into an anchored regex
    pub fn new(pattern: &str) -> Self {
        if !pattern.contains(['*', '?']) {
            return Self {
                source: pattern.to_string(),
                regex: None,
            };
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');

        let mut literal = String::new();
        for ch in pattern.chars() {
            match ch {
                '*' | '?' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str(if ch == '*' { ".*" } else { "." });
                }
                _ => literal.push(ch),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        // Only the compiled size limit can reject an escaped expression
        // Wildcards span any character, newlines included
        let regex = match RegexBuilder::new(&expr).dot_matches_new_line(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!("Category pattern {:?} treated as literal: {}", pattern, e);
                None
            }
        };

        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    /// Check whether `category` matches this pattern
    pub fn matches(&self, category: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(category),
            None => self.source == category,
        }
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for CategoryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CategoryPattern").field(&self.source).finish()
    }
}

impl PartialEq for CategoryPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Include/exclude category filter shared by all targets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFilter {
    include: Vec<CategoryPattern>,
    exclude: Vec<CategoryPattern>,
}

impl CategoryFilter {
    /// Create a filter that lets every category through
    pub fn all() -> Self {
        Self::default()
    }

    /// Return a copy of this filter with the include list replaced
    pub fn with_include<I, S>(&self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include: compile(patterns),
            exclude: self.exclude.clone(),
        }
    }

    /// Return a copy of this filter with the exclude list replaced
    pub fn with_exclude<I, S>(&self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include: self.include.clone(),
            exclude: compile(patterns),
        }
    }

    pub fn include(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(CategoryPattern::as_str)
    }

    pub fn exclude(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(CategoryPattern::as_str)
    }

    /// Decide whether a category passes the filter
    pub fn matches(&self, category: &str) -> bool {
        let matched =
            self.include.is_empty() || self.include.iter().any(|p| p.matches(category));

        matched && !self.exclude.iter().any(|p| p.matches(category))
    }

    /// Keep the messages whose category passes, preserving order
    pub fn filter(&self, messages: &[Message]) -> Vec<Message> {
        messages
            .iter()
            .filter(|m| self.matches(m.category()))
            .cloned()
            .collect()
    }
}

fn compile<I, S>(patterns: I) -> Vec<CategoryPattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| CategoryPattern::new(p.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Context;

    fn message(category: &str) -> Message {
        Message::new(category, "test", Context::new())
    }

    #[test]
    fn test_filter_all_matches_everything() {
        let filter = CategoryFilter::all();
        assert!(filter.matches("foo"));
        assert!(filter.matches("application"));
        assert!(filter.matches(""));
    }

    #[test]
    fn test_include_exact() {
        let filter = CategoryFilter::all().with_include(["foo"]);
        assert!(filter.matches("foo"));
        assert!(!filter.matches("some"));
        assert!(!filter.matches("foobar"));
    }

    #[test]
    fn test_exclude_exact() {
        let filter = CategoryFilter::all().with_exclude(["foo"]);
        assert!(!filter.matches("foo"));
        assert!(filter.matches("some"));
    }

    #[test]
    fn test_exclude_takes_precedence() {
        let filter = CategoryFilter::all()
            .with_include(["db.*"])
            .with_exclude(["db.cache"]);
        assert!(filter.matches("db.connection"));
        assert!(!filter.matches("db.cache"));
    }

    #[test]
    fn test_trailing_wildcard_prefix() {
        let filter = CategoryFilter::all().with_include(["db.*"]);
        assert!(filter.matches("db.connection"));
        assert!(filter.matches("db."));
        assert!(!filter.matches("dbx"));
        assert!(!filter.matches("db"));
    }

    #[test]
    fn test_wildcard_matches_newlines() {
        let filter = CategoryFilter::all().with_include(["db.*"]);
        assert!(filter.matches("db.a\nb"));
        assert!(filter.matches("db.\n"));
        assert!(!filter.matches("db\n.a"));

        assert!(CategoryPattern::new("a?b").matches("a\nb"));
    }

    #[test]
    fn test_question_mark_single_char() {
        let pattern = CategoryPattern::new("v?");
        assert!(pattern.matches("v1"));
        assert!(!pattern.matches("v10"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = CategoryPattern::new("a.b+(c)");
        assert!(pattern.matches("a.b+(c)"));
        assert!(!pattern.matches("axb+(c)"));

        let namespaced = CategoryPattern::new("App\\Db\\*");
        assert!(namespaced.matches("App\\Db\\Connection"));
    }

    #[test]
    fn test_with_include_does_not_touch_original() {
        let base = CategoryFilter::all();
        let narrowed = base.with_include(["foo"]);
        assert!(base.matches("bar"));
        assert!(!narrowed.matches("bar"));
    }

    #[test]
    fn test_filter_messages_keeps_order() {
        let filter = CategoryFilter::all().with_exclude(["noise"]);
        let messages = vec![message("a"), message("noise"), message("b")];

        let kept = filter.filter(&messages);
        let categories: Vec<_> = kept.iter().map(Message::category).collect();
        assert_eq!(categories, vec!["a", "b"]);
    }

    #[test]
    fn test_pattern_lists_roundtrip() {
        let filter = CategoryFilter::all()
            .with_include(["a", "b.*"])
            .with_exclude(["b.x"]);
        assert_eq!(filter.include().collect::<Vec<_>>(), vec!["a", "b.*"]);
        assert_eq!(filter.exclude().collect::<Vec<_>>(), vec!["b.x"]);
    }
}
