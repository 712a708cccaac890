//! Menu-driven editing loop.
//!
//! Each menu action maps onto a [`TaggingSession`] operation; the screen is
//! redrawn from session state after every action.

use std::cell::RefCell;
use std::rc::Rc;

use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select, Sort};
use tagdock_core::editor::TagInputBox;
use tagdock_core::model::CompleterTagFilter;
use tagdock_core::{AddTagDecision, EditorEvent, Key, KeyEvent, Modifiers, TaggingSession};

use super::completion::TagCompletion;
use super::theme::{tagdock_theme, token_label_style};
use crate::cli::handle_interrupt;

/// How the user left the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Save,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    AddTags,
    QuickAdd,
    PickSuggestion,
    SelectTags,
    DeleteSelected,
    EditTag,
    Reorder,
    NextImage,
    PreviousImage,
    GoToImage,
    SelectImages,
    Filter,
    RenameEverywhere,
    DeleteEverywhere,
    SaveAndQuit,
    Quit,
}

impl Action {
    const ALL: [Action; 16] = [
        Action::AddTags,
        Action::QuickAdd,
        Action::PickSuggestion,
        Action::SelectTags,
        Action::DeleteSelected,
        Action::EditTag,
        Action::Reorder,
        Action::NextImage,
        Action::PreviousImage,
        Action::GoToImage,
        Action::SelectImages,
        Action::Filter,
        Action::RenameEverywhere,
        Action::DeleteEverywhere,
        Action::SaveAndQuit,
        Action::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            Action::AddTags => "Add tags",
            Action::QuickAdd => "Add top suggestion for a prefix",
            Action::PickSuggestion => "Pick from suggestions",
            Action::SelectTags => "Select tags",
            Action::DeleteSelected => "Delete selected tags",
            Action::EditTag => "Edit a tag",
            Action::Reorder => "Reorder tags",
            Action::NextImage => "Next image",
            Action::PreviousImage => "Previous image",
            Action::GoToImage => "Go to image",
            Action::SelectImages => "Select images for batch edits",
            Action::Filter => "Filter images by tag",
            Action::RenameEverywhere => "Rename a tag on every image",
            Action::DeleteEverywhere => "Delete a tag from every image",
            Action::SaveAndQuit => "Save and quit",
            Action::Quit => "Quit without saving",
        }
    }
}

/// Run the editor until the user quits.
pub fn run(session: &mut TaggingSession, filter: Option<String>) -> anyhow::Result<Exit> {
    let notes = Rc::new(RefCell::new(Vec::new()));
    let sink = notes.clone();
    session.subscribe(EditorEvent::IMAGE_TAGS_CHANGED, move |event, _| {
        if let EditorEvent::ImageTagsChanged(range) = event {
            sink.borrow_mut()
                .push(describe_range(range.first, range.last));
        }
        Ok(())
    });
    session.state_mut().editor.list_mut().set_focus(true);

    let mut editor = Editor {
        session,
        theme: tagdock_theme(),
        proxy_row: 0,
        notes,
    };
    editor.apply_filter(filter)?;

    let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();
    loop {
        editor.render();
        let selection = Select::with_theme(&editor.theme)
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .max_length(10)
            .interact_opt()?;

        let Some(action) = selection.and_then(|i| Action::ALL.get(i).copied()) else {
            // Esc / Ctrl+C
            return editor.ask_save();
        };
        match editor.perform(action) {
            Ok(Some(exit)) => return Ok(exit),
            Ok(None) => {}
            Err(e) => {
                let red = Style::new().for_stderr().red();
                eprintln!("  {}", red.apply_to(format!("✗ {e}")));
            }
        }
    }
}

struct Editor<'a> {
    session: &'a mut TaggingSession,
    theme: ColorfulTheme,
    proxy_row: usize,
    notes: Rc<RefCell<Vec<String>>>,
}

impl Editor<'_> {
    fn perform(&mut self, action: Action) -> anyhow::Result<Option<Exit>> {
        match action {
            Action::AddTags => self.add_tags()?,
            Action::QuickAdd => self.quick_add()?,
            Action::PickSuggestion => self.pick_suggestion()?,
            Action::SelectTags => self.select_tags()?,
            Action::DeleteSelected => self.delete_selected()?,
            Action::EditTag => self.edit_tag()?,
            Action::Reorder => self.reorder()?,
            Action::NextImage => self.step(1)?,
            Action::PreviousImage => self.step(-1)?,
            Action::GoToImage => self.go_to_image()?,
            Action::SelectImages => self.select_images()?,
            Action::Filter => self.filter()?,
            Action::RenameEverywhere => self.rename_everywhere()?,
            Action::DeleteEverywhere => self.delete_everywhere()?,
            Action::SaveAndQuit => return Ok(Some(Exit::Save)),
            Action::Quit => {
                if self.confirm("Discard all changes?", false)? {
                    return Ok(Some(Exit::Discard));
                }
            }
        }
        Ok(None)
    }

    fn render(&self) {
        let state = self.session.state();
        let bold = Style::new().for_stderr().bold();
        let dim = Style::new().for_stderr().dim();
        let cyan = Style::new().for_stderr().cyan();

        eprintln!();
        for note in self.notes.borrow_mut().drain(..) {
            eprintln!("  {}", dim.apply_to(note));
        }

        let Some(source_row) = state.editor.image_index() else {
            eprintln!("  {}", dim.apply_to("No image matches the current filter"));
            return;
        };
        let name = state
            .images
            .get(source_row)
            .map(|image| image.display_name())
            .unwrap_or_default();
        // a local edit can drop the active image out of the filter
        let position = match state.proxy.map_from_source(source_row) {
            Some(row) => format!("[{}/{}]", row + 1, state.proxy.row_count()),
            None => "[hidden by filter]".to_string(),
        };
        eprintln!("  {} {}", bold.apply_to(name), dim.apply_to(position));
        if let Some(filter) = state.proxy.filter() {
            eprintln!("  {}", dim.apply_to(format!("filter: {filter}")));
        }

        let list = state.editor.list();
        let tags = state.editor.tags();
        if tags.is_empty() {
            eprintln!("     {}", dim.apply_to("(no tags)"));
        }
        for (row, tag) in tags.iter().enumerate() {
            let cursor = if list.current_row() == Some(row) { "▸" } else { " " };
            let marker = if list.is_selected(row) { "■" } else { "□" };
            eprintln!("  {} {} {}", cyan.apply_to(cursor), marker, tag);
        }
        eprintln!(
            "  {}",
            token_label_style(state.editor.label_style()).apply_to(state.editor.token_label())
        );

        let selected = state.selected_images.len();
        if selected > 1 {
            eprintln!("  {}", cyan.apply_to(format!("{selected} images selected")));
        }
    }

    fn add_tags(&mut self) -> anyhow::Result<()> {
        let completion = self.tag_completion();
        let Some(text) = self.prompt_with(TagInputBox::PLACEHOLDER, &completion)? else {
            return Ok(());
        };
        let decision = self.session.submit_input(&text)?;
        self.report(&decision);
        Ok(())
    }

    /// Type a prefix into the input box and take its first completion.
    fn quick_add(&mut self) -> anyhow::Result<()> {
        let Some(prefix) = self.prompt("Tag prefix")? else {
            return Ok(());
        };
        self.session.state_mut().editor.clear_input();
        for c in prefix.chars() {
            self.session.input_key(&KeyEvent::plain(Key::Char(c)))?;
        }
        if !self.session.state().editor.input().is_popup_visible() {
            self.note(format!("No suggestion for \"{prefix}\""));
            self.session.state_mut().editor.clear_input();
            return Ok(());
        }
        let decision = self
            .session
            .input_key(&KeyEvent::new(Key::Return, Modifiers::CTRL))?;
        self.report(&decision);
        Ok(())
    }

    fn pick_suggestion(&mut self) -> anyhow::Result<()> {
        let Some(prefix) = self.prompt("Tag prefix")? else {
            return Ok(());
        };
        let completions: Vec<String> = {
            let state = self.session.state();
            let completions = state
                .editor
                .input()
                .completer()
                .completions(&prefix)
                .into_iter()
                .map(str::to_string)
                .collect();
            completions
        };
        if completions.is_empty() {
            self.note(format!("No suggestion for \"{prefix}\""));
            return Ok(());
        }
        let choice = Select::with_theme(&self.theme)
            .with_prompt("Suggestions")
            .items(&completions)
            .default(0)
            .max_length(10)
            .interact_opt()?;
        if let Some(completion) = choice.and_then(|i| completions.get(i)) {
            self.session.activate_completion(completion)?;
        }
        Ok(())
    }

    fn select_tags(&mut self) -> anyhow::Result<()> {
        let (tags, defaults) = {
            let state = self.session.state();
            let tags = state.editor.tags().to_vec();
            let defaults: Vec<bool> = (0..tags.len())
                .map(|row| state.editor.list().is_selected(row))
                .collect();
            (tags, defaults)
        };
        if tags.is_empty() {
            return Ok(());
        }
        let rows = MultiSelect::with_theme(&self.theme)
            .with_prompt("Select tags (space to toggle)")
            .items(&tags)
            .defaults(&defaults)
            .interact_opt()?;
        if let Some(rows) = rows {
            self.session.select_tags(rows);
        }
        Ok(())
    }

    fn delete_selected(&mut self) -> anyhow::Result<()> {
        if self.session.state().editor.list().selected_rows().is_empty() {
            self.note("No tags selected".to_string());
            return Ok(());
        }
        self.session.list_key(&KeyEvent::plain(Key::Delete))?;
        Ok(())
    }

    fn edit_tag(&mut self) -> anyhow::Result<()> {
        let Some((row, tag)) = self.choose_tag("Tag to edit")? else {
            return Ok(());
        };
        let text = handle_interrupt(
            Input::<String>::with_theme(&self.theme)
                .with_prompt("New text")
                .with_initial_text(tag)
                .interact_text(),
        )?;
        if let Some(text) = text {
            self.session.edit_tag(row, &text)?;
        }
        Ok(())
    }

    fn reorder(&mut self) -> anyhow::Result<()> {
        let tags = self.session.state().editor.tags().to_vec();
        if tags.len() < 2 {
            return Ok(());
        }
        let order = Sort::with_theme(&self.theme)
            .with_prompt("Reorder tags (space to pick up, enter to finish)")
            .items(&tags)
            .interact_opt()?;
        if let Some(order) = order {
            for (row, destination) in sort_moves(&order) {
                self.session.move_tags(&[row], destination)?;
            }
        }
        Ok(())
    }

    fn step(&mut self, delta: isize) -> anyhow::Result<()> {
        let row_count = self.session.state().proxy.row_count();
        let target = self.proxy_row.checked_add_signed(delta).filter(|&r| r < row_count);
        match target {
            Some(row) => self.select(row),
            None => {
                self.note("No more images in that direction".to_string());
                Ok(())
            }
        }
    }

    fn go_to_image(&mut self) -> anyhow::Result<()> {
        let names = self.proxy_names();
        if names.is_empty() {
            return Ok(());
        }
        let choice = Select::with_theme(&self.theme)
            .with_prompt("Image")
            .items(&names)
            .default(self.proxy_row.min(names.len() - 1))
            .max_length(15)
            .interact_opt()?;
        if let Some(row) = choice {
            self.select(row)?;
        }
        Ok(())
    }

    fn select_images(&mut self) -> anyhow::Result<()> {
        let (names, defaults, active) = {
            let state = self.session.state();
            let images = state.images.images();
            let names: Vec<String> = images.iter().map(|image| image.display_name()).collect();
            let defaults: Vec<bool> = (0..images.len())
                .map(|row| state.selected_images.contains(&row))
                .collect();
            (names, defaults, state.editor.image_index())
        };
        let rows = MultiSelect::with_theme(&self.theme)
            .with_prompt("Images that batch edits apply to")
            .items(&names)
            .defaults(&defaults)
            .max_length(15)
            .interact_opt()?;
        let Some(mut rows) = rows else {
            return Ok(());
        };
        if rows.is_empty() {
            rows.extend(active);
        }
        self.session.set_selected_images(rows);
        Ok(())
    }

    fn filter(&mut self) -> anyhow::Result<()> {
        let completion = self.global_completion();
        let Some(tag) = self.prompt_with("Show images tagged (empty for all)", &completion)? else {
            return Ok(());
        };
        let tag = tag.trim();
        self.apply_filter((!tag.is_empty()).then(|| tag.to_string()))
    }

    fn rename_everywhere(&mut self) -> anyhow::Result<()> {
        let completion = self.global_completion();
        let Some(old) = self.prompt_with("Tag to rename", &completion)? else {
            return Ok(());
        };
        let Some(new) = self.prompt("Rename to")? else {
            return Ok(());
        };
        if old.is_empty() || new.is_empty() {
            return Ok(());
        }
        if self.session.rename_tag_everywhere(&old, &new)?.is_none() {
            self.note(format!("No image is tagged \"{old}\""));
        }
        self.clamp_proxy_row()
    }

    fn delete_everywhere(&mut self) -> anyhow::Result<()> {
        let completion = self.global_completion();
        let Some(tag) = self.prompt_with("Tag to delete", &completion)? else {
            return Ok(());
        };
        if tag.is_empty() || !self.confirm(&format!("Delete \"{tag}\" from every image?"), false)? {
            return Ok(());
        }
        if self.session.delete_tag_everywhere(&tag)?.is_none() {
            self.note(format!("No image is tagged \"{tag}\""));
        }
        self.clamp_proxy_row()
    }

    fn ask_save(&self) -> anyhow::Result<Exit> {
        let save = handle_interrupt(
            Confirm::with_theme(&self.theme)
                .with_prompt("Save changes before quitting?")
                .default(true)
                .interact(),
        )?;
        Ok(match save {
            Some(true) => Exit::Save,
            _ => Exit::Discard,
        })
    }

    fn select(&mut self, proxy_row: usize) -> anyhow::Result<()> {
        self.proxy_row = proxy_row;
        self.session.select_image(proxy_row)?;
        Ok(())
    }

    fn apply_filter(&mut self, filter: Option<String>) -> anyhow::Result<()> {
        self.session.set_filter(filter);
        if self.session.state().proxy.row_count() > 0 {
            self.select(0)
        } else {
            self.proxy_row = 0;
            self.session.unload_image()?;
            Ok(())
        }
    }

    /// Keep the cursor on a valid row after bulk edits shrink a filtered view.
    fn clamp_proxy_row(&mut self) -> anyhow::Result<()> {
        let row_count = self.session.state().proxy.row_count();
        if row_count == 0 {
            self.proxy_row = 0;
            self.session.unload_image()?;
        } else if self.proxy_row >= row_count {
            self.select(row_count - 1)?;
        }
        Ok(())
    }

    fn proxy_names(&self) -> Vec<String> {
        let state = self.session.state();
        (0..state.proxy.row_count())
            .filter_map(|row| state.proxy.map_to_source(row))
            .filter_map(|source| state.images.get(source))
            .map(|image| image.display_name())
            .collect()
    }

    fn choose_tag(&self, prompt: &str) -> anyhow::Result<Option<(usize, String)>> {
        let (tags, current) = {
            let state = self.session.state();
            (
                state.editor.tags().to_vec(),
                state.editor.list().current_row().unwrap_or(0),
            )
        };
        if tags.is_empty() {
            return Ok(None);
        }
        let row = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&tags)
            .default(current.min(tags.len() - 1))
            .max_length(15)
            .interact_opt()?;
        Ok(row.and_then(|row| tags.get(row).map(|tag| (row, tag.clone()))))
    }

    /// Completion from tags not yet on the active image.
    fn tag_completion(&self) -> TagCompletion {
        let state = self.session.state();
        TagCompletion::new(
            state.editor.input().completer().clone(),
            state.editor.separator(),
        )
    }

    /// Completion from every tag in the session.
    fn global_completion(&self) -> TagCompletion {
        let state = self.session.state();
        TagCompletion::new(
            CompleterTagFilter::new(state.images.tag_counter(), &[]),
            state.editor.separator(),
        )
    }

    fn prompt(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        handle_interrupt(
            Input::<String>::with_theme(&self.theme)
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text(),
        )
    }

    fn prompt_with(
        &self,
        prompt: &str,
        completion: &TagCompletion,
    ) -> anyhow::Result<Option<String>> {
        handle_interrupt(
            Input::<String>::with_theme(&self.theme)
                .with_prompt(prompt)
                .completion_with(completion)
                .allow_empty(true)
                .interact_text(),
        )
    }

    fn confirm(&self, question: &str, default: bool) -> anyhow::Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(default)
            .interact_opt()?;
        Ok(answer.unwrap_or(false))
    }

    fn note(&self, message: String) {
        self.notes.borrow_mut().push(message);
    }

    fn report(&self, decision: &AddTagDecision) {
        match decision {
            AddTagDecision::Declined => self.note("Nothing added".to_string()),
            AddTagDecision::Bulk(request) => self.note(format!(
                "Added {} tag(s) to {} image(s)",
                request.tags.len(),
                request.image_indices.len()
            )),
            AddTagDecision::Ignored | AddTagDecision::InsertSingle(_) => {}
        }
    }
}

fn describe_range(first: usize, last: usize) -> String {
    if first == last {
        format!("Tags changed on image {}", first + 1)
    } else {
        format!("Tags changed on images {}-{}", first + 1, last + 1)
    }
}

/// Single-row moves that turn the current order into `order`.
///
/// `order[i]` is the original row that should end up at row `i`, as
/// returned by [`Sort`].
fn sort_moves(order: &[usize]) -> Vec<(usize, usize)> {
    let mut current: Vec<usize> = (0..order.len()).collect();
    let mut moves = Vec::new();
    for (target, original) in order.iter().enumerate() {
        let Some(row) = current.iter().position(|o| o == original) else {
            continue;
        };
        if row != target {
            let item = current.remove(row);
            current.insert(target, item);
            moves.push((row, target));
        }
    }
    moves
}
