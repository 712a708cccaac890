//! Autocomplete source: the tag counter minus the active image's tags.

use std::collections::HashSet;

use super::tag_counter::TagCounter;

/// Filtered view over a [`TagCounter`] that never offers a tag the active
/// image already has.
#[derive(Debug, Clone, Default)]
pub struct CompleterTagFilter {
    entries: Vec<(String, usize)>,
}

impl CompleterTagFilter {
    /// Build the suggestion source, excluding `image_tags`.
    pub fn new(counter: &TagCounter, image_tags: &[String]) -> Self {
        let excluded: HashSet<&str> = image_tags.iter().map(String::as_str).collect();
        let entries = counter
            .iter()
            .filter(|(tag, _)| !excluded.contains(tag))
            .map(|(tag, count)| (tag.to_string(), count))
            .collect();
        Self { entries }
    }

    /// Tags starting with `prefix` (case-insensitive), most used first.
    ///
    /// An empty prefix yields nothing: the popup only opens once typing starts.
    pub fn completions(&self, prefix: &str) -> Vec<&str> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let needle = prefix.to_lowercase();
        self.entries
            .iter()
            .filter(|(tag, _)| tag.to_lowercase().starts_with(&needle))
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    /// Highest-ranked completion for `prefix`.
    pub fn first_completion(&self, prefix: &str) -> Option<&str> {
        self.completions(prefix).into_iter().next()
    }

    /// Whether `tag` can be suggested.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == tag)
    }
}
