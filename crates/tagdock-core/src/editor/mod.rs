//! The image tags editor: tag list, input box and token budget for the
//! active image.
//!
//! Every local edit is written straight back to the [`ImageCollection`] with
//! [`ImageCollection::update_tags`]. Bulk mutations made elsewhere reach the
//! editor through [`ImageTagsEditor::reload_image_tags_if_changed`].

pub mod input_box;
pub mod tags_list;

use std::sync::Arc;

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::model::{ImageCollection, ListChange, ProxyImageList, RowRange, TagListModel};
use crate::tokens::{LabelStyle, TextTokenizer, TokenBudget};
use crate::types::{KeyEvent, Modifiers};

pub use input_box::{AddTagDecision, InputAction, TagInputBox, TagsAdditionRequest};
pub use tags_list::{ImageTagsList, ListAction};

/// Yes/no question shown before a batched edit.
pub trait Confirm {
    fn confirm(&mut self, title: &str, question: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str, &str) -> bool,
{
    fn confirm(&mut self, title: &str, question: &str) -> bool {
        self(title, question)
    }
}

/// Editor for the tags of one image at a time.
pub struct ImageTagsEditor {
    model: TagListModel,
    input: TagInputBox,
    list: ImageTagsList,
    tokenizer: Arc<dyn TextTokenizer>,
    separator: String,
    token_overhead: usize,
    max_token_count: usize,
    budget: TokenBudget,
    image_index: Option<usize>,
}

impl ImageTagsEditor {
    pub fn new(tokenizer: Arc<dyn TextTokenizer>, config: &EditorConfig) -> Self {
        Self {
            model: TagListModel::new(),
            input: TagInputBox::new(&config.separator),
            list: ImageTagsList::new(),
            tokenizer,
            separator: config.separator.clone(),
            token_overhead: config.token_overhead,
            max_token_count: config.max_token_count,
            budget: TokenBudget {
                count: 0,
                limit: config.max_token_count,
            },
            image_index: None,
        }
    }

    /// Source row of the active image.
    pub fn image_index(&self) -> Option<usize> {
        self.image_index
    }

    pub fn tags(&self) -> &[String] {
        self.model.string_list()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn input(&self) -> &TagInputBox {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut TagInputBox {
        &mut self.input
    }

    pub fn list(&self) -> &ImageTagsList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ImageTagsList {
        &mut self.list
    }

    pub fn token_budget(&self) -> TokenBudget {
        self.budget
    }

    pub fn token_label(&self) -> String {
        self.budget.label()
    }

    pub fn label_style(&self) -> LabelStyle {
        self.budget.style()
    }

    /// Load the tags of the image shown at `proxy_row`.
    ///
    /// A row the proxy cannot resolve is ignored.
    pub fn load_image_tags(
        &mut self,
        images: &ImageCollection,
        proxy: &ProxyImageList,
        proxy_row: usize,
    ) -> Result<(), EditorError> {
        let Some(source_row) = proxy.map_to_source(proxy_row) else {
            tracing::debug!("Proxy row {proxy_row} does not resolve to an image");
            return Ok(());
        };
        self.load_source_row(images, source_row)
    }

    /// Reload if the active image lies in `range`.
    ///
    /// Returns whether a reload happened.
    pub fn reload_image_tags_if_changed(
        &mut self,
        images: &ImageCollection,
        range: RowRange,
    ) -> Result<bool, EditorError> {
        match self.image_index {
            Some(row) if range.contains(row) => {
                tracing::debug!("Active image {row} changed in {range:?}, reloading");
                self.load_source_row(images, row)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Budget `tags` would use with this editor's tokenizer and separator.
    pub fn measure(&self, tags: &[String]) -> Result<TokenBudget, EditorError> {
        Ok(TokenBudget::measure(
            self.tokenizer.as_ref(),
            tags,
            &self.separator,
            self.token_overhead,
            self.max_token_count,
        )?)
    }

    /// Recompute the token budget from the current tags.
    pub fn count_tokens(&mut self) -> Result<(), EditorError> {
        self.budget = self.measure(self.model.string_list())?;
        if self.budget.is_over() {
            tracing::debug!("Caption is over budget: {}", self.budget.label());
        }
        Ok(())
    }

    /// Make the first tag current and selected.
    pub fn select_first_tag(&mut self) {
        if self.model.row_count() > 0 {
            self.list.select_only(0);
        }
    }

    /// Drop the active image, leaving an empty list.
    pub fn unload(&mut self, images: &ImageCollection) -> Result<(), EditorError> {
        self.image_index = None;
        let change = self.model.set_string_list(Vec::new());
        self.apply_change(&change, images)
    }

    /// Submit `text` as tag input for the given image selection.
    ///
    /// A single tag for a single image is appended here. A bulk request is
    /// returned for the caller to apply.
    pub fn submit_tag(
        &mut self,
        text: &str,
        selected_image_indices: &[usize],
        confirm: &mut dyn Confirm,
        images: &mut ImageCollection,
    ) -> Result<AddTagDecision, EditorError> {
        let decision = self.input.add_tag(text, selected_image_indices, confirm);
        if let AddTagDecision::InsertSingle(tag) = &decision {
            self.append_tag(tag, images)?;
        }
        Ok(decision)
    }

    /// Key press in the input box.
    pub fn input_key(
        &mut self,
        event: &KeyEvent,
        selected_image_indices: &[usize],
        confirm: &mut dyn Confirm,
        images: &mut ImageCollection,
    ) -> Result<AddTagDecision, EditorError> {
        match self.input.key_press(event) {
            InputAction::Submit(text) => {
                self.submit_tag(&text, selected_image_indices, confirm, images)
            }
            InputAction::None => Ok(AddTagDecision::Ignored),
        }
    }

    /// First phase of choosing a completion: add the chosen tag.
    ///
    /// The box keeps its text until [`clear_input`](Self::clear_input) runs
    /// as a deferred task.
    pub fn completer_activated(
        &mut self,
        completion: &str,
        selected_image_indices: &[usize],
        confirm: &mut dyn Confirm,
        images: &mut ImageCollection,
    ) -> Result<AddTagDecision, EditorError> {
        self.input.hide_popup();
        self.submit_tag(completion, selected_image_indices, confirm, images)
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Key press while the tag list has focus.
    pub fn list_key(&mut self, event: &KeyEvent, images: &mut ImageCollection) -> Result<(), EditorError> {
        match self.list.key_press(event, self.model.row_count()) {
            ListAction::DeleteRows(rows) => self.delete_tags(&rows, images),
            ListAction::None => Ok(()),
        }
    }

    pub fn click_tag(&mut self, row: usize, modifiers: Modifiers) {
        self.list.click(row, modifiers, self.model.row_count());
    }

    /// Remove the selected tags.
    pub fn delete_selected_tags(&mut self, images: &mut ImageCollection) -> Result<(), EditorError> {
        let rows = self.list.selected_rows();
        if rows.is_empty() {
            return Ok(());
        }
        self.delete_tags(&rows, images)
    }

    pub fn delete_tags(&mut self, rows: &[usize], images: &mut ImageCollection) -> Result<(), EditorError> {
        let source_row = self.active_row()?;
        let change = self.model.remove_rows(rows)?;
        self.commit(source_row, &change, images)
    }

    /// Replace the text of one tag in place.
    pub fn edit_tag(&mut self, row: usize, text: &str, images: &mut ImageCollection) -> Result<(), EditorError> {
        let source_row = self.active_row()?;
        let change = self.model.set_data(row, text)?;
        self.commit(source_row, &change, images)
    }

    /// Drag-reorder `rows` to sit before `destination`.
    pub fn move_tags(
        &mut self,
        rows: &[usize],
        destination: usize,
        images: &mut ImageCollection,
    ) -> Result<(), EditorError> {
        let source_row = self.active_row()?;
        match self.model.move_rows(rows, destination)? {
            Some(change) => self.commit(source_row, &change, images),
            None => Ok(()),
        }
    }

    fn append_tag(&mut self, tag: &str, images: &mut ImageCollection) -> Result<(), EditorError> {
        let source_row = self.active_row()?;
        let row = self.model.row_count();
        let change = self.model.insert_row(row)?;
        self.commit(source_row, &change, images)?;
        let change = self.model.set_data(row, tag)?;
        self.commit(source_row, &change, images)
    }

    fn load_source_row(&mut self, images: &ImageCollection, source_row: usize) -> Result<(), EditorError> {
        let image = images.get(source_row).ok_or(EditorError::ImageOutOfRange {
            row: source_row,
            len: images.len(),
        })?;
        tracing::debug!("Loading tags of {} ({} tags)", image.display_name(), image.tags.len());
        self.image_index = Some(source_row);
        let change = self.model.set_string_list(image.tags.clone());
        self.apply_change(&change, images)?;
        if self.list.has_focus() {
            self.select_first_tag();
        }
        Ok(())
    }

    fn commit(
        &mut self,
        source_row: usize,
        change: &ListChange,
        images: &mut ImageCollection,
    ) -> Result<(), EditorError> {
        images.update_tags(source_row, self.model.string_list())?;
        self.apply_change(change, images)
    }

    fn apply_change(&mut self, change: &ListChange, images: &ImageCollection) -> Result<(), EditorError> {
        self.list.on_change(change);
        match change {
            ListChange::Reset | ListChange::DataChanged { .. } | ListChange::RowsMoved { .. } => {
                self.count_tokens()?
            }
            // the follow-up set_data recounts
            ListChange::RowsInserted { .. } => {}
        }
        self.input
            .filter_completer_data(images.tag_counter(), self.model.string_list());
        Ok(())
    }

    fn active_row(&self) -> Result<usize, EditorError> {
        self.image_index.ok_or(EditorError::NoActiveImage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::testing::WordTokenizer;
    use crate::types::{Image, Key};

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (ImageTagsEditor, ImageCollection, ProxyImageList) {
        let tokenizer = Arc::new(WordTokenizer::new(&["sky", "cloud", "sea", ","]));
        let editor = ImageTagsEditor::new(tokenizer, &EditorConfig::default());
        let images = ImageCollection::new(vec![
            Image::new("0.png", tags(&["sky", "cloud"])),
            Image::new("1.png", tags(&["sea"])),
        ]);
        let proxy = ProxyImageList::new(&images);
        (editor, images, proxy)
    }

    fn never_asked() -> impl FnMut(&str, &str) -> bool {
        |title: &str, question: &str| -> bool { panic!("unexpected prompt {title}: {question}") }
    }

    #[test]
    fn test_select_image_then_delete_selected_tag() {
        let (mut editor, mut images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 0).unwrap();
        assert_eq!(editor.tags(), tags(&["sky", "cloud"]).as_slice());
        assert_eq!(editor.token_label(), "3 / 75 Tokens");

        editor.click_tag(0, Modifiers::NONE);
        editor
            .list_key(&KeyEvent::plain(Key::Delete), &mut images)
            .unwrap();

        assert_eq!(editor.tags(), tags(&["cloud"]).as_slice());
        assert_eq!(images.get(0).unwrap().tags, tags(&["cloud"]));
        assert_eq!(editor.token_label(), "1 / 75 Tokens");
        assert_eq!(editor.label_style(), LabelStyle::Normal);
    }

    #[test]
    fn test_unresolved_proxy_row_is_ignored() {
        let (mut editor, images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 9).unwrap();
        assert_eq!(editor.image_index(), None);
        assert!(editor.tags().is_empty());
    }

    #[test]
    fn test_load_selects_first_tag_only_with_focus() {
        let (mut editor, images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 0).unwrap();
        assert!(editor.list().selected_rows().is_empty());

        editor.list_mut().set_focus(true);
        editor.load_image_tags(&images, &proxy, 0).unwrap();
        assert_eq!(editor.list().selected_rows(), vec![0]);
        assert_eq!(editor.list().current_row(), Some(0));
    }

    #[test]
    fn test_single_tag_appends_and_writes_back() {
        let (mut editor, mut images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 1).unwrap();
        let mut confirm = never_asked();
        let decision = editor
            .submit_tag("sky", &[1], &mut confirm, &mut images)
            .unwrap();

        assert_eq!(decision, AddTagDecision::InsertSingle("sky".to_string()));
        assert_eq!(images.get(1).unwrap().tags, tags(&["sea", "sky"]));
        assert_eq!(editor.list().selected_rows(), vec![1]);
        assert!(editor.list_mut().take_scroll_to_bottom());
        assert_eq!(images.tag_counter().count("sky"), 2);
        // now on the image, so no longer offered
        assert!(!editor.input().completer().contains("sky"));
    }

    #[test]
    fn test_bulk_request_is_returned_untouched() {
        let (mut editor, mut images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 0).unwrap();
        let mut asked = 0;
        let mut confirm = |_: &str, _: &str| {
            asked += 1;
            true
        };
        let decision = editor
            .submit_tag("sun", &[0, 1], &mut confirm, &mut images)
            .unwrap();
        assert_eq!(asked, 1);
        assert_eq!(
            decision,
            AddTagDecision::Bulk(TagsAdditionRequest {
                tags: tags(&["sun"]),
                image_indices: vec![0, 1],
            })
        );
        assert_eq!(images.get(0).unwrap().tags, tags(&["sky", "cloud"]));
    }

    #[test]
    fn test_reload_only_when_active_row_in_range() {
        let tokenizer = Arc::new(WordTokenizer::new(&[]));
        let mut editor = ImageTagsEditor::new(tokenizer, &EditorConfig::default());
        let mut images = ImageCollection::new(
            (0..10)
                .map(|i| Image::new(format!("{i}.png"), tags(&["old"])))
                .collect(),
        );
        let proxy = ProxyImageList::new(&images);
        editor.load_image_tags(&images, &proxy, 5).unwrap();

        images.add_tags(&tags(&["new"]), &[5]).unwrap();
        assert!(!editor
            .reload_image_tags_if_changed(&images, RowRange::new(8, 9))
            .unwrap());
        assert_eq!(editor.tags(), tags(&["old"]).as_slice());

        assert!(editor
            .reload_image_tags_if_changed(&images, RowRange::new(2, 7))
            .unwrap());
        assert_eq!(editor.tags(), tags(&["old", "new"]).as_slice());
    }

    #[test]
    fn test_edit_and_move_write_back() {
        let (mut editor, mut images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 0).unwrap();

        editor.edit_tag(1, "sea", &mut images).unwrap();
        assert_eq!(images.get(0).unwrap().tags, tags(&["sky", "sea"]));

        editor.move_tags(&[1], 0, &mut images).unwrap();
        assert_eq!(images.get(0).unwrap().tags, tags(&["sea", "sky"]));
        assert_eq!(editor.list().selected_rows(), vec![0]);

        editor.move_tags(&[], 2, &mut images).unwrap();
        assert_eq!(editor.list().current_row(), Some(0));
        assert_eq!(editor.list().selected_rows(), vec![0]);
    }

    #[test]
    fn test_edits_without_active_image_fail() {
        let (mut editor, mut images, _) = setup();
        assert_eq!(
            editor.edit_tag(0, "x", &mut images).unwrap_err(),
            EditorError::NoActiveImage
        );
    }

    #[test]
    fn test_completer_activation_keeps_text_until_cleared() {
        let (mut editor, mut images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 1).unwrap();
        editor.input_mut().set_text("cl");
        let mut confirm = never_asked();
        editor
            .completer_activated("cloud", &[1], &mut confirm, &mut images)
            .unwrap();
        assert_eq!(images.get(1).unwrap().tags, tags(&["sea", "cloud"]));
        assert_eq!(editor.input().text(), "cl");

        editor.clear_input();
        assert_eq!(editor.input().text(), "");
    }

    #[test]
    fn test_input_return_submits() {
        let (mut editor, mut images, proxy) = setup();
        editor.load_image_tags(&images, &proxy, 1).unwrap();
        editor.input_mut().set_text("dune");
        let mut confirm = never_asked();
        editor
            .input_key(&KeyEvent::plain(Key::Return), &[1], &mut confirm, &mut images)
            .unwrap();
        assert_eq!(images.get(1).unwrap().tags, tags(&["sea", "dune"]));
        assert_eq!(editor.input().text(), "");
    }
}
