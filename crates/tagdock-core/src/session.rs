//! A tagging session: the image collection, its proxy view and the tag
//! editor, wired together through the event loop.
//!
//! Front ends call the methods on [`TaggingSession`]; each one queues the
//! matching event (or edits the active image directly) and then drains the
//! loop, so by the time a method returns every follow-up has run.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::Arc;

use crate::config::{CaptionPosition, Config};
use crate::editor::{AddTagDecision, Confirm, ImageTagsEditor, TagsAdditionRequest};
use crate::error::{EditorError, Result};
use crate::events::{Event, EventLoop, Outbox};
use crate::model::{ImageCollection, ProxyImageList, RowRange};
use crate::tokens::TextTokenizer;
use crate::types::{Image, KeyEvent, Modifiers};

/// Events flowing between the session's components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The active image changed to this proxy row
    ImageSelected { proxy_row: usize },
    /// Tags of these source rows were changed by a bulk operation
    ImageTagsChanged(RowRange),
    /// Tags should be appended to several images
    TagsAdditionRequested(TagsAdditionRequest),
    /// A completion was chosen from the popup
    CompleterActivated(String),
    /// A generated caption is ready for a source row
    CaptionReady { source_row: usize, caption: String },
}

impl EditorEvent {
    pub const IMAGE_SELECTED: &'static str = "image_selected";
    pub const IMAGE_TAGS_CHANGED: &'static str = "image_tags_changed";
    pub const TAGS_ADDITION_REQUESTED: &'static str = "tags_addition_requested";
    pub const COMPLETER_ACTIVATED: &'static str = "completer_activated";
    pub const CAPTION_READY: &'static str = "caption_ready";
}

impl Event for EditorEvent {
    fn name(&self) -> &'static str {
        match self {
            EditorEvent::ImageSelected { .. } => Self::IMAGE_SELECTED,
            EditorEvent::ImageTagsChanged(_) => Self::IMAGE_TAGS_CHANGED,
            EditorEvent::TagsAdditionRequested(_) => Self::TAGS_ADDITION_REQUESTED,
            EditorEvent::CompleterActivated(_) => Self::COMPLETER_ACTIVATED,
            EditorEvent::CaptionReady { .. } => Self::CAPTION_READY,
        }
    }
}

/// Everything the handlers share.
pub struct SessionState {
    pub images: ImageCollection,
    pub proxy: ProxyImageList,
    pub editor: ImageTagsEditor,
    /// Source rows of the selected images
    pub selected_images: Vec<usize>,
    pub caption_position: CaptionPosition,
    confirm: Box<dyn Confirm>,
}

impl SessionState {
    fn submit(&mut self, text: &str) -> Result<AddTagDecision> {
        self.edit_input(|editor, selected, confirm, images| {
            editor.submit_tag(text, selected, confirm, images)
        })
    }

    fn edit_input<T>(
        &mut self,
        edit: impl FnOnce(
            &mut ImageTagsEditor,
            &[usize],
            &mut dyn Confirm,
            &mut ImageCollection,
        ) -> std::result::Result<T, EditorError>,
    ) -> Result<T> {
        let Self {
            images,
            proxy,
            editor,
            selected_images,
            confirm,
            ..
        } = self;
        let result = edit(editor, &selected_images[..], confirm.as_mut(), images);
        proxy.refresh(images);
        Ok(result?)
    }

    /// Run a local edit of the active image, keeping the filtered view in step
    /// with the written-back tags.
    fn edit_locally(
        &mut self,
        edit: impl FnOnce(&mut ImageTagsEditor, &mut ImageCollection) -> std::result::Result<(), EditorError>,
    ) -> Result<()> {
        let Self {
            images,
            proxy,
            editor,
            ..
        } = self;
        let result = edit(editor, images);
        proxy.refresh(images);
        Ok(result?)
    }
}

type Shared = Rc<RefCell<SessionState>>;

pub struct TaggingSession {
    state: Shared,
    events: EventLoop<EditorEvent>,
}

impl TaggingSession {
    pub fn new(
        images: Vec<Image>,
        tokenizer: Arc<dyn TextTokenizer>,
        config: &Config,
        confirm: impl Confirm + 'static,
    ) -> Self {
        let images = ImageCollection::new(images);
        let proxy = ProxyImageList::new(&images);
        let state = Rc::new(RefCell::new(SessionState {
            images,
            proxy,
            editor: ImageTagsEditor::new(tokenizer, &config.editor),
            selected_images: Vec::new(),
            caption_position: config.captioning.caption_position,
            confirm: Box::new(confirm),
        }));
        let mut events = EventLoop::new();
        wire(&state, &mut events);
        Self { state, events }
    }

    pub fn state(&self) -> Ref<'_, SessionState> {
        self.state.borrow()
    }

    /// Mutable access for presentation state such as list focus.
    pub fn state_mut(&self) -> RefMut<'_, SessionState> {
        self.state.borrow_mut()
    }

    /// Current tags of every image, in collection order.
    pub fn images(&self) -> Vec<Image> {
        self.state.borrow().images.images().to_vec()
    }

    /// Register an extra handler, e.g. to redraw after bulk changes.
    pub fn subscribe(
        &mut self,
        name: &'static str,
        handler: impl FnMut(&EditorEvent, &mut Outbox<EditorEvent>) -> Result<()> + 'static,
    ) {
        self.events.subscribe(name, handler);
    }

    /// Make the image at `proxy_row` active and the only selected image.
    pub fn select_image(&mut self, proxy_row: usize) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if let Some(source_row) = state.proxy.map_to_source(proxy_row) {
                state.selected_images = vec![source_row];
            }
        }
        self.events.emit(EditorEvent::ImageSelected { proxy_row });
        self.events.process()
    }

    /// Set the selected images (source rows) without changing the active one.
    pub fn set_selected_images(&mut self, rows: Vec<usize>) {
        let mut state = self.state.borrow_mut();
        let len = state.images.len();
        state.selected_images = rows.into_iter().filter(|&r| r < len).collect();
    }

    /// Submit tag input as if typed and confirmed.
    pub fn submit_input(&mut self, text: &str) -> Result<AddTagDecision> {
        let decision = self.state.borrow_mut().submit(text)?;
        self.dispatch_decision(&decision)?;
        Ok(decision)
    }

    pub fn input_key(&mut self, event: &KeyEvent) -> Result<AddTagDecision> {
        let decision = self
            .state
            .borrow_mut()
            .edit_input(|editor, selected, confirm, images| {
                editor.input_key(event, selected, confirm, images)
            })?;
        self.dispatch_decision(&decision)?;
        Ok(decision)
    }

    /// Choose a completion from the popup.
    pub fn activate_completion(&mut self, completion: &str) -> Result<()> {
        self.events
            .emit(EditorEvent::CompleterActivated(completion.to_string()));
        self.events.process()
    }

    pub fn list_key(&mut self, event: &KeyEvent) -> Result<()> {
        self.state
            .borrow_mut()
            .edit_locally(|editor, images| editor.list_key(event, images))
    }

    pub fn click_tag(&mut self, row: usize, modifiers: Modifiers) {
        self.state.borrow_mut().editor.click_tag(row, modifiers);
    }

    /// Select exactly these tag rows.
    pub fn select_tags(&mut self, rows: Vec<usize>) {
        let mut state = self.state.borrow_mut();
        let row_count = state.editor.tags().len();
        state.editor.list_mut().set_selection(rows, row_count);
    }

    pub fn delete_selected_tags(&mut self) -> Result<()> {
        self.state
            .borrow_mut()
            .edit_locally(|editor, images| editor.delete_selected_tags(images))
    }

    pub fn edit_tag(&mut self, row: usize, text: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .edit_locally(|editor, images| editor.edit_tag(row, text, images))
    }

    pub fn move_tags(&mut self, rows: &[usize], destination: usize) -> Result<()> {
        self.state
            .borrow_mut()
            .edit_locally(|editor, images| editor.move_tags(rows, destination, images))
    }

    /// Remove `tag` from every image. Returns the touched range.
    pub fn delete_tag_everywhere(&mut self, tag: &str) -> Result<Option<RowRange>> {
        let range = self.state.borrow_mut().images.delete_tag(tag);
        self.announce(range)
    }

    /// Rename `old` to `new` on every image. Returns the touched range.
    pub fn rename_tag_everywhere(&mut self, old: &str, new: &str) -> Result<Option<RowRange>> {
        let range = self.state.borrow_mut().images.rename_tag(old, new);
        self.announce(range)
    }

    /// Hand a generated caption to the session.
    pub fn apply_caption(&mut self, source_row: usize, caption: &str) -> Result<()> {
        self.events.emit(EditorEvent::CaptionReady {
            source_row,
            caption: caption.to_string(),
        });
        self.events.process()
    }

    /// Show only images carrying `tag`, or all images for `None`.
    pub fn set_filter(&mut self, tag: Option<String>) {
        let mut state = self.state.borrow_mut();
        let SessionState { images, proxy, .. } = &mut *state;
        proxy.set_filter(tag, images);
    }

    /// Clear the editor, e.g. when a filter hides every image.
    pub fn unload_image(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let SessionState { images, editor, .. } = &mut *state;
        Ok(editor.unload(images)?)
    }

    fn announce(&mut self, range: Option<RowRange>) -> Result<Option<RowRange>> {
        if let Some(range) = range {
            self.events.emit(EditorEvent::ImageTagsChanged(range));
            self.events.process()?;
        }
        Ok(range)
    }

    fn dispatch_decision(&mut self, decision: &AddTagDecision) -> Result<()> {
        if let AddTagDecision::Bulk(request) = decision {
            self.events
                .emit(EditorEvent::TagsAdditionRequested(request.clone()));
        }
        self.events.process()
    }
}

fn wire(state: &Shared, events: &mut EventLoop<EditorEvent>) {
    let shared = state.clone();
    events.subscribe(EditorEvent::IMAGE_SELECTED, move |event, _| {
        if let EditorEvent::ImageSelected { proxy_row } = event {
            let mut state = shared.borrow_mut();
            let SessionState {
                images,
                proxy,
                editor,
                ..
            } = &mut *state;
            editor.load_image_tags(images, proxy, *proxy_row)?;
        }
        Ok(())
    });

    let shared = state.clone();
    events.subscribe(EditorEvent::IMAGE_TAGS_CHANGED, move |event, _| {
        if let EditorEvent::ImageTagsChanged(range) = event {
            let mut state = shared.borrow_mut();
            let SessionState {
                images,
                proxy,
                editor,
                ..
            } = &mut *state;
            proxy.refresh(images);
            editor.reload_image_tags_if_changed(images, *range)?;
        }
        Ok(())
    });

    let shared = state.clone();
    events.subscribe(EditorEvent::TAGS_ADDITION_REQUESTED, move |event, outbox| {
        if let EditorEvent::TagsAdditionRequested(request) = event {
            let range = shared
                .borrow_mut()
                .images
                .add_tags(&request.tags, &request.image_indices)?;
            if let Some(range) = range {
                outbox.emit(EditorEvent::ImageTagsChanged(range));
            }
        }
        Ok(())
    });

    let shared = state.clone();
    events.subscribe(EditorEvent::COMPLETER_ACTIVATED, move |event, outbox| {
        if let EditorEvent::CompleterActivated(completion) = event {
            let decision = shared
                .borrow_mut()
                .edit_input(|editor, selected, confirm, images| {
                    editor.completer_activated(completion, selected, confirm, images)
                })?;
            if let AddTagDecision::Bulk(request) = decision {
                outbox.emit(EditorEvent::TagsAdditionRequested(request));
            }
            let deferred = shared.clone();
            outbox.post(move |_| {
                deferred.borrow_mut().editor.clear_input();
                Ok(())
            });
        }
        Ok(())
    });

    let shared = state.clone();
    events.subscribe(EditorEvent::CAPTION_READY, move |event, outbox| {
        if let EditorEvent::CaptionReady {
            source_row,
            caption,
        } = event
        {
            let mut state = shared.borrow_mut();
            let position = state.caption_position;
            if let Some(range) = state.images.apply_caption(*source_row, caption, position)? {
                outbox.emit(EditorEvent::ImageTagsChanged(range));
            }
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::testing::WordTokenizer;
    use crate::types::Key;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn session_with(confirm: impl Confirm + 'static) -> TaggingSession {
        let images = vec![
            Image::new("0.png", tags(&["sky", "cloud"])),
            Image::new("1.png", tags(&["sea"])),
            Image::new("2.png", tags(&["sky", "sand"])),
        ];
        let tokenizer = Arc::new(WordTokenizer::new(&["sky", "cloud", "sea", "sand", ","]));
        TaggingSession::new(images, tokenizer, &Config::default(), confirm)
    }

    fn session() -> TaggingSession {
        session_with(|_: &str, _: &str| true)
    }

    #[test]
    fn test_select_image_loads_tags() {
        let mut session = session();
        session.select_image(0).unwrap();
        let state = session.state();
        assert_eq!(state.editor.image_index(), Some(0));
        assert_eq!(state.editor.tags(), tags(&["sky", "cloud"]).as_slice());
        assert_eq!(state.editor.token_label(), "3 / 75 Tokens");
        assert_eq!(state.selected_images, vec![0]);
    }

    #[test]
    fn test_bulk_addition_reloads_active_image() {
        let mut session = session();
        session.select_image(0).unwrap();
        session.set_selected_images(vec![0, 1]);

        let decision = session.submit_input("sun, warm").unwrap();
        assert!(matches!(decision, AddTagDecision::Bulk(_)));

        let state = session.state();
        assert_eq!(
            state.editor.tags(),
            tags(&["sky", "cloud", "sun", "warm"]).as_slice()
        );
        assert_eq!(state.images.get(1).unwrap().tags, tags(&["sea", "sun", "warm"]));
        assert_eq!(state.images.get(2).unwrap().tags, tags(&["sky", "sand"]));
    }

    #[test]
    fn test_declined_confirmation_changes_nothing() {
        let mut session = session_with(|_: &str, _: &str| false);
        let requested = Rc::new(RefCell::new(0));
        let counter = requested.clone();
        session.subscribe(EditorEvent::TAGS_ADDITION_REQUESTED, move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        session.select_image(0).unwrap();
        session.set_selected_images(vec![0, 2]);

        let decision = session.submit_input("sun").unwrap();
        assert_eq!(decision, AddTagDecision::Declined);
        session.activate_completion("sea").unwrap();

        assert_eq!(*requested.borrow(), 0);
        assert_eq!(session.images()[0].tags, tags(&["sky", "cloud"]));
        assert_eq!(session.images()[2].tags, tags(&["sky", "sand"]));
    }

    #[test]
    fn test_rename_everywhere_announces_range() {
        let mut session = session();
        session.select_image(1).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        session.subscribe(EditorEvent::IMAGE_TAGS_CHANGED, move |event, _| {
            log.borrow_mut().push(event.clone());
            Ok(())
        });

        let range = session.rename_tag_everywhere("sky", "heaven").unwrap();
        assert_eq!(range, Some(RowRange::new(0, 2)));
        assert_eq!(*seen.borrow(), vec![EditorEvent::ImageTagsChanged(RowRange::new(0, 2))]);
        assert_eq!(session.images()[2].tags, tags(&["heaven", "sand"]));
        assert_eq!(session.state().editor.tags(), tags(&["sea"]).as_slice());
    }

    #[test]
    fn test_delete_everywhere_reloads_active_image() {
        let mut session = session();
        session.select_image(2).unwrap();
        session.delete_tag_everywhere("sky").unwrap();
        assert_eq!(session.state().editor.tags(), tags(&["sand"]).as_slice());
        assert_eq!(session.delete_tag_everywhere("sky").unwrap(), None);
    }

    #[test]
    fn test_completion_clears_input_after_insert() {
        let mut session = session();
        session.select_image(1).unwrap();
        session.state_mut().editor.input_mut().set_text("cl");

        let order = Rc::new(RefCell::new(Vec::new()));
        let log = order.clone();
        let shared = session.state.clone();
        session.subscribe(EditorEvent::IMAGE_TAGS_CHANGED, move |_, _| {
            log.borrow_mut()
                .push(shared.borrow().editor.input().text().to_string());
            Ok(())
        });

        session.set_selected_images(vec![1, 2]);
        session.activate_completion("cloud").unwrap();

        // the bulk event saw the text still in the box; the deferred clear ran after
        assert_eq!(*order.borrow(), vec!["cl".to_string()]);
        let state = session.state();
        assert_eq!(state.editor.input().text(), "");
        assert_eq!(state.editor.tags(), tags(&["sea", "cloud"]).as_slice());
        assert_eq!(state.images.get(2).unwrap().tags, tags(&["sky", "sand", "cloud"]));
    }

    #[test]
    fn test_local_edits_write_back_without_bulk_event() {
        let mut session = session();
        session.select_image(0).unwrap();
        let fired = Rc::new(RefCell::new(0));
        let counter = fired.clone();
        session.subscribe(EditorEvent::IMAGE_TAGS_CHANGED, move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        session.click_tag(0, Modifiers::NONE);
        session.list_key(&KeyEvent::plain(Key::Delete)).unwrap();
        session.edit_tag(0, "storm").unwrap();
        session.submit_input("rain").unwrap();

        assert_eq!(*fired.borrow(), 0);
        assert_eq!(session.images()[0].tags, tags(&["storm", "rain"]));
    }

    #[test]
    fn test_caption_ready_applies_position() {
        let mut session = session();
        session.select_image(1).unwrap();
        session.apply_caption(1, "a calm sea").unwrap();
        assert_eq!(
            session.state().editor.tags(),
            tags(&["sea", "a calm sea"]).as_slice()
        );
    }

    #[test]
    fn test_filter_changes_proxy_rows() {
        let mut session = session();
        session.set_filter(Some("sea".to_string()));
        session.select_image(0).unwrap();
        assert_eq!(session.state().editor.image_index(), Some(1));
    }

    #[test]
    fn test_unload_clears_editor() {
        let mut session = session();
        session.select_image(0).unwrap();
        session.unload_image().unwrap();
        let state = session.state();
        assert_eq!(state.editor.image_index(), None);
        assert!(state.editor.tags().is_empty());
        assert_eq!(state.images.get(0).unwrap().tags, tags(&["sky", "cloud"]));
    }

    #[test]
    fn test_local_edits_refresh_filtered_view() {
        let mut session = session();
        session.set_filter(Some("sky".to_string()));
        assert_eq!(session.state().proxy.row_count(), 2);
        session.select_image(0).unwrap();

        session.click_tag(0, Modifiers::NONE);
        session.list_key(&KeyEvent::plain(Key::Delete)).unwrap();

        let state = session.state();
        assert_eq!(state.images.get(0).unwrap().tags, tags(&["cloud"]));
        assert_eq!(state.proxy.row_count(), 1);
        assert_eq!(state.proxy.map_to_source(0), Some(2));
    }

    #[test]
    fn test_single_insert_refreshes_filtered_view() {
        let mut session = session();
        session.select_image(1).unwrap();
        session.set_filter(Some("sun".to_string()));
        assert_eq!(session.state().proxy.row_count(), 0);

        session.submit_input("sun").unwrap();

        let state = session.state();
        assert_eq!(state.proxy.row_count(), 1);
        assert_eq!(state.proxy.map_to_source(0), Some(1));
    }
}
