//! Single-line tag entry with a filtered autocomplete popup.

use crate::model::{CompleterTagFilter, TagCounter};
use crate::types::{split_tags, Key, KeyEvent};

use super::Confirm;

/// A batched "add these tags to these images" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsAdditionRequest {
    pub tags: Vec<String>,
    pub image_indices: Vec<usize>,
}

/// What submitting a tag should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTagDecision {
    /// Empty input; nothing happens
    Ignored,
    /// Append this tag to the active image's list
    InsertSingle(String),
    /// Hand the request to whoever applies batched additions
    Bulk(TagsAdditionRequest),
    /// The user declined the confirmation prompt
    Declined,
}

/// Result of a key press in the input box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Nothing to do beyond updating the box
    None,
    /// Submit this text as tag input; the box has already been cleared
    Submit(String),
}

/// Text entry plus completer state.
#[derive(Debug, Clone)]
pub struct TagInputBox {
    text: String,
    separator: String,
    completer: CompleterTagFilter,
    popup_visible: bool,
}

impl TagInputBox {
    pub const PLACEHOLDER: &'static str = "Add Tag";

    pub fn new(separator: &str) -> Self {
        Self {
            text: String::new(),
            separator: separator.to_string(),
            completer: CompleterTagFilter::default(),
            popup_visible: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.refresh_popup();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.popup_visible = false;
    }

    pub fn is_popup_visible(&self) -> bool {
        self.popup_visible
    }

    pub fn hide_popup(&mut self) {
        self.popup_visible = false;
    }

    /// Completions for the current text, most used first.
    pub fn completions(&self) -> Vec<&str> {
        self.completer.completions(&self.text)
    }

    pub fn completer(&self) -> &CompleterTagFilter {
        &self.completer
    }

    /// Rebuild the completer source so it excludes `image_tags`.
    pub fn filter_completer_data(&mut self, counter: &TagCounter, image_tags: &[String]) {
        self.completer = CompleterTagFilter::new(counter, image_tags);
        self.refresh_popup();
    }

    /// Handle a key press.
    ///
    /// Return submits the box text. Ctrl+Return with the popup open submits
    /// the first completion instead. Either way the box is cleared and the
    /// popup hidden.
    pub fn key_press(&mut self, event: &KeyEvent) -> InputAction {
        match event.key {
            Key::Return => {
                let first = self
                    .popup_visible
                    .then(|| self.completer.first_completion(&self.text))
                    .flatten()
                    .map(str::to_string);
                let submitted = match first {
                    Some(tag) if event.modifiers.ctrl => tag,
                    _ => self.text.clone(),
                };
                self.clear();
                InputAction::Submit(submitted)
            }
            Key::Char(c) => {
                self.text.push(c);
                self.refresh_popup();
                InputAction::None
            }
            Key::Backspace => {
                self.text.pop();
                self.refresh_popup();
                InputAction::None
            }
            Key::Escape => {
                self.popup_visible = false;
                InputAction::None
            }
            _ => InputAction::None,
        }
    }

    /// Decide what submitting `text` means for the current image selection.
    ///
    /// With exactly one tag and one selected image the tag goes straight into
    /// the list. Otherwise a batched request is produced, after confirmation
    /// when more than one image would be touched.
    pub fn add_tag(
        &self,
        text: &str,
        selected_image_indices: &[usize],
        confirm: &mut dyn Confirm,
    ) -> AddTagDecision {
        if text.is_empty() {
            return AddTagDecision::Ignored;
        }
        let tags = split_tags(text, &self.separator);
        let selected_image_count = selected_image_indices.len();
        if tags.len() == 1 && selected_image_count == 1 {
            return AddTagDecision::InsertSingle(text.to_string());
        }
        if selected_image_count > 1 {
            let question = if tags.len() > 1 {
                format!("Add tags to {selected_image_count} selected images?")
            } else {
                format!(
                    "Add tag \"{}\" to {selected_image_count} selected images?",
                    tags[0]
                )
            };
            if !confirm.confirm("Add Tag", &question) {
                tracing::debug!("Batched tag addition declined");
                return AddTagDecision::Declined;
            }
        }
        AddTagDecision::Bulk(TagsAdditionRequest {
            tags,
            image_indices: selected_image_indices.to_vec(),
        })
    }

    fn refresh_popup(&mut self) {
        self.popup_visible = !self.completer.completions(&self.text).is_empty();
    }
}
