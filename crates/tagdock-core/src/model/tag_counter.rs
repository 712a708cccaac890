//! Tag frequency table across the image collection.

use std::collections::{HashMap, HashSet};

use crate::types::Image;

/// Number of images carrying each tag.
///
/// Entries are ordered by count (descending), then by tag text. An image that
/// carries the same tag twice counts once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounter {
    entries: Vec<(String, usize)>,
}

impl TagCounter {
    /// Count tags over a set of images.
    pub fn from_images(images: &[Image]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for image in images {
            let unique: HashSet<&str> = image.tags.iter().map(String::as_str).collect();
            for tag in unique {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut entries: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(tag, count)| (tag.to_string(), count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self { entries }
    }

    /// Count for a tag (0 if unknown).
    pub fn count(&self, tag: &str) -> usize {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map_or(0, |(_, c)| *c)
    }

    /// Iterate `(tag, count)` in ranking order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(t, c)| (t.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
