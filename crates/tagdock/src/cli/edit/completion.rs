//! Tab completion for the tag prompt.

use dialoguer::Completion;
use tagdock_core::model::CompleterTagFilter;

/// Completes the piece after the last separator from the tag filter.
pub struct TagCompletion {
    filter: CompleterTagFilter,
    separator: String,
}

impl TagCompletion {
    pub fn new(filter: CompleterTagFilter, separator: &str) -> Self {
        Self {
            filter,
            separator: separator.to_string(),
        }
    }
}

impl Completion for TagCompletion {
    fn get(&self, input: &str) -> Option<String> {
        let split = input
            .rfind(&self.separator)
            .map(|i| i + self.separator.len())
            .unwrap_or(0);
        let (head, piece) = input.split_at(split);
        let completion = self.filter.first_completion(piece)?;
        if completion == piece {
            return None;
        }
        Some(format!("{head}{completion}"))
    }
}
