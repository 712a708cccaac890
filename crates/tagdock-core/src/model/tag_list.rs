//! Ordered string list holding the active image's tags.
//!
//! Every mutation returns a [`ListChange`] describing what happened, which the
//! editor uses the way a list view would use model notifications.

use crate::error::EditorError;

/// Notification produced by a [`TagListModel`] mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    /// The whole list was replaced
    Reset,
    /// Rows `first..=last` were inserted (with empty text)
    RowsInserted { first: usize, last: usize },
    /// The text of `row` changed
    DataChanged { row: usize },
    /// Rows were moved; they now occupy `first..=last` in their original relative order
    RowsMoved { first: usize, last: usize },
}

/// The tags of the active image, in storage order.
#[derive(Debug, Clone, Default)]
pub struct TagListModel {
    tags: Vec<String>,
}

impl TagListModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string_list(&self) -> &[String] {
        &self.tags
    }

    pub fn row_count(&self) -> usize {
        self.tags.len()
    }

    pub fn data(&self, row: usize) -> Option<&str> {
        self.tags.get(row).map(String::as_str)
    }

    /// Replace the whole list.
    pub fn set_string_list(&mut self, tags: Vec<String>) -> ListChange {
        self.tags = tags;
        ListChange::Reset
    }

    /// Insert an empty row before `row` (`row == row_count()` appends).
    pub fn insert_row(&mut self, row: usize) -> Result<ListChange, EditorError> {
        if row > self.tags.len() {
            return Err(EditorError::RowOutOfRange {
                row,
                len: self.tags.len(),
            });
        }
        self.tags.insert(row, String::new());
        Ok(ListChange::RowsInserted {
            first: row,
            last: row,
        })
    }

    /// Set the text of an existing row.
    pub fn set_data(&mut self, row: usize, value: &str) -> Result<ListChange, EditorError> {
        let len = self.tags.len();
        let slot = self
            .tags
            .get_mut(row)
            .ok_or(EditorError::RowOutOfRange { row, len })?;
        *slot = value.to_string();
        Ok(ListChange::DataChanged { row })
    }

    /// Drop the given rows, keeping the rest in their relative order.
    pub fn remove_rows(&mut self, rows: &[usize]) -> Result<ListChange, EditorError> {
        self.check_rows(rows)?;
        let remaining = self
            .tags
            .iter()
            .enumerate()
            .filter(|(i, _)| !rows.contains(i))
            .map(|(_, tag)| tag.clone())
            .collect();
        Ok(self.set_string_list(remaining))
    }

    /// Move `rows` so they sit just before `destination`.
    ///
    /// `destination` is a row index in the list as it was before the move
    /// (`row_count()` means "to the end"). The moved rows keep their relative
    /// order, as do the rows that stay put. Moving no rows changes nothing
    /// and returns `None`.
    pub fn move_rows(
        &mut self,
        rows: &[usize],
        destination: usize,
    ) -> Result<Option<ListChange>, EditorError> {
        self.check_rows(rows)?;
        if destination > self.tags.len() {
            return Err(EditorError::RowOutOfRange {
                row: destination,
                len: self.tags.len(),
            });
        }
        if rows.is_empty() {
            return Ok(None);
        }
        let mut sorted = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut moved = Vec::with_capacity(sorted.len());
        let mut kept = Vec::with_capacity(self.tags.len() - sorted.len());
        for (i, tag) in self.tags.drain(..).enumerate() {
            if sorted.binary_search(&i).is_ok() {
                moved.push(tag);
            } else {
                kept.push(tag);
            }
        }

        let insert_at = destination - sorted.iter().filter(|&&r| r < destination).count();
        let count = moved.len();
        kept.splice(insert_at..insert_at, moved);
        self.tags = kept;

        Ok(Some(ListChange::RowsMoved {
            first: insert_at,
            last: insert_at + count - 1,
        }))
    }

    fn check_rows(&self, rows: &[usize]) -> Result<(), EditorError> {
        match rows.iter().find(|&&r| r >= self.tags.len()) {
            Some(&row) => Err(EditorError::RowOutOfRange {
                row,
                len: self.tags.len(),
            }),
            None => Ok(()),
        }
    }
}
