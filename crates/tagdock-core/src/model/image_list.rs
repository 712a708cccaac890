//! The authoritative image collection and its filtered proxy view.
//!
//! Rows in [`ImageCollection`] are "source rows". [`ProxyImageList`] exposes a
//! filtered subset with its own "proxy rows" and maps between the two.

use crate::config::CaptionPosition;
use crate::error::EditorError;
use crate::types::Image;

use super::tag_counter::TagCounter;

/// Inclusive range of source rows touched by a bulk mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub first: usize,
    pub last: usize,
}

impl RowRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn single(row: usize) -> Self {
        Self::new(row, row)
    }

    pub fn contains(&self, row: usize) -> bool {
        self.first <= row && row <= self.last
    }

    /// Smallest range covering every row in `rows`.
    pub fn covering(rows: impl IntoIterator<Item = usize>) -> Option<Self> {
        rows.into_iter().fold(None, |acc, row| match acc {
            None => Some(Self::single(row)),
            Some(r) => Some(Self::new(r.first.min(row), r.last.max(row))),
        })
    }
}

/// Every image with its tags, plus the tag frequency table derived from them.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    images: Vec<Image>,
    tag_counter: TagCounter,
}

impl ImageCollection {
    pub fn new(images: Vec<Image>) -> Self {
        let tag_counter = TagCounter::from_images(&images);
        Self {
            images,
            tag_counter,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Image> {
        self.images.get(row)
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn tag_counter(&self) -> &TagCounter {
        &self.tag_counter
    }

    /// Write back the tag list of one image after a local edit.
    ///
    /// This is the per-row path used by the tag editor and does not count as a
    /// bulk mutation.
    pub fn update_tags(&mut self, row: usize, tags: &[String]) -> Result<(), EditorError> {
        self.image_mut(row)?.tags = tags.to_vec();
        self.recount();
        Ok(())
    }

    /// Append `tags` to every image in `rows`.
    ///
    /// Returns the range of rows touched, or `None` if `rows` is empty.
    pub fn add_tags(&mut self, tags: &[String], rows: &[usize]) -> Result<Option<RowRange>, EditorError> {
        for &row in rows {
            self.check_row(row)?;
        }
        for &row in rows {
            self.images[row].tags.extend(tags.iter().cloned());
        }
        self.recount();
        tracing::debug!("Added {} tag(s) to {} image(s)", tags.len(), rows.len());
        Ok(RowRange::covering(rows.iter().copied()))
    }

    /// Remove `tag` from every image that carries it.
    pub fn delete_tag(&mut self, tag: &str) -> Option<RowRange> {
        self.modify_matching(tag, |tags| tags.retain(|t| t != tag))
    }

    /// Rename `old` to `new` in every image that carries it.
    pub fn rename_tag(&mut self, old: &str, new: &str) -> Option<RowRange> {
        self.modify_matching(old, |tags| {
            for t in tags.iter_mut().filter(|t| t.as_str() == old) {
                *t = new.to_string();
            }
        })
    }

    /// Place a generated caption into an image's tags.
    ///
    /// Returns the touched range, or `None` when `position` leaves the tags alone.
    pub fn apply_caption(
        &mut self,
        row: usize,
        caption: &str,
        position: CaptionPosition,
    ) -> Result<Option<RowRange>, EditorError> {
        let tags = &mut self.image_mut(row)?.tags;
        match position {
            CaptionPosition::BeforeFirstTag => tags.insert(0, caption.to_string()),
            CaptionPosition::AfterLastTag => tags.push(caption.to_string()),
            CaptionPosition::OverwriteFirstTag => match tags.first_mut() {
                Some(first) => *first = caption.to_string(),
                None => tags.push(caption.to_string()),
            },
            CaptionPosition::OverwriteAllTags => *tags = vec![caption.to_string()],
            CaptionPosition::DoNotAdd => return Ok(None),
        }
        self.recount();
        Ok(Some(RowRange::single(row)))
    }

    fn modify_matching(&mut self, tag: &str, mut edit: impl FnMut(&mut Vec<String>)) -> Option<RowRange> {
        let mut touched = Vec::new();
        for (row, image) in self.images.iter_mut().enumerate() {
            if image.tags.iter().any(|t| t == tag) {
                edit(&mut image.tags);
                touched.push(row);
            }
        }
        if touched.is_empty() {
            return None;
        }
        self.recount();
        tracing::debug!("Bulk edit of {tag:?} touched {} image(s)", touched.len());
        RowRange::covering(touched)
    }

    fn image_mut(&mut self, row: usize) -> Result<&mut Image, EditorError> {
        self.check_row(row)?;
        Ok(&mut self.images[row])
    }

    fn check_row(&self, row: usize) -> Result<(), EditorError> {
        if row >= self.images.len() {
            return Err(EditorError::ImageOutOfRange {
                row,
                len: self.images.len(),
            });
        }
        Ok(())
    }

    fn recount(&mut self) {
        self.tag_counter = TagCounter::from_images(&self.images);
    }
}

/// Filtered view over an [`ImageCollection`].
///
/// With no filter every source row is visible, in order. With a filter only
/// images carrying that exact tag are visible.
#[derive(Debug, Clone, Default)]
pub struct ProxyImageList {
    filter: Option<String>,
    rows: Vec<usize>,
}

impl ProxyImageList {
    pub fn new(images: &ImageCollection) -> Self {
        let mut proxy = Self::default();
        proxy.refresh(images);
        proxy
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Change the filter and recompute visible rows.
    pub fn set_filter(&mut self, filter: Option<String>, images: &ImageCollection) {
        self.filter = filter.filter(|f| !f.is_empty());
        self.refresh(images);
    }

    /// Recompute visible rows after the collection changed.
    pub fn refresh(&mut self, images: &ImageCollection) {
        self.rows = images
            .images()
            .iter()
            .enumerate()
            .filter(|(_, image)| match &self.filter {
                Some(tag) => image.tags.iter().any(|t| t == tag),
                None => true,
            })
            .map(|(row, _)| row)
            .collect();
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn map_to_source(&self, proxy_row: usize) -> Option<usize> {
        self.rows.get(proxy_row).copied()
    }

    pub fn map_from_source(&self, source_row: usize) -> Option<usize> {
        self.rows.iter().position(|&r| r == source_row)
    }
}
