//! Selection and navigation state for the tag list view.
//!
//! The rows themselves live in [`TagListModel`](crate::model::TagListModel);
//! this tracks which rows are selected and reacts to model notifications the
//! way a list view does.

use std::collections::BTreeSet;

use crate::model::ListChange;
use crate::types::{Key, KeyEvent, Modifiers};

/// What a key press in the list asks the editor to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction {
    None,
    /// Remove these rows from the model
    DeleteRows(Vec<usize>),
}

/// Extended-selection list state.
#[derive(Debug, Clone, Default)]
pub struct ImageTagsList {
    selection: BTreeSet<usize>,
    current: Option<usize>,
    anchor: Option<usize>,
    scroll_to_bottom: bool,
    has_focus: bool,
}

impl ImageTagsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn set_focus(&mut self, focus: bool) {
        self.has_focus = focus;
    }

    pub fn current_row(&self) -> Option<usize> {
        self.current
    }

    /// Selected rows in ascending order.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.selection.contains(&row)
    }

    /// Returns and resets the pending scroll-to-bottom request.
    pub fn take_scroll_to_bottom(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }

    /// Make `row` current and the only selected row.
    pub fn select_only(&mut self, row: usize) {
        self.selection.clear();
        self.selection.insert(row);
        self.current = Some(row);
        self.anchor = Some(row);
    }

    /// Replace the selection wholesale, e.g. from a multi-select prompt.
    pub fn set_selection(&mut self, rows: impl IntoIterator<Item = usize>, row_count: usize) {
        self.selection = rows.into_iter().filter(|&r| r < row_count).collect();
        self.current = self.selection.iter().next().copied();
        self.anchor = self.current;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.current = None;
        self.anchor = None;
    }

    /// Mouse click with extended-selection semantics.
    ///
    /// Plain click selects one row, Ctrl toggles, Shift selects the range
    /// from the anchor to `row`.
    pub fn click(&mut self, row: usize, modifiers: Modifiers, row_count: usize) {
        if row >= row_count {
            return;
        }
        if modifiers.shift {
            let anchor = self.anchor.unwrap_or(row);
            self.selection = (anchor.min(row)..=anchor.max(row)).collect();
            self.current = Some(row);
        } else if modifiers.ctrl {
            if !self.selection.remove(&row) {
                self.selection.insert(row);
            }
            self.current = Some(row);
            self.anchor = Some(row);
        } else {
            self.select_only(row);
        }
    }

    /// Keep selection consistent with a model notification.
    pub fn on_change(&mut self, change: &ListChange) {
        match *change {
            ListChange::Reset => self.clear_selection(),
            ListChange::RowsInserted { last, .. } => {
                self.select_only(last);
                self.scroll_to_bottom = true;
            }
            ListChange::DataChanged { .. } => {}
            ListChange::RowsMoved { first, last } => {
                self.selection = (first..=last).collect();
                self.current = Some(first);
                self.anchor = Some(first);
            }
        }
    }

    /// Handle a key press while the list has focus.
    pub fn key_press(&mut self, event: &KeyEvent, row_count: usize) -> ListAction {
        if row_count == 0 {
            return ListAction::None;
        }
        let last = row_count - 1;
        let target = match event.key {
            Key::Delete if !self.selection.is_empty() => {
                return ListAction::DeleteRows(self.selected_rows());
            }
            Key::Up => self.current.map_or(0, |r| r.saturating_sub(1)),
            Key::Down => self.current.map_or(0, |r| (r + 1).min(last)),
            Key::Home => 0,
            Key::End => last,
            _ => return ListAction::None,
        };
        if event.modifiers.shift {
            self.click(target, Modifiers::SHIFT, row_count);
        } else {
            self.select_only(target);
        }
        ListAction::None
    }
}
