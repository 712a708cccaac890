//! Data models behind the tag editor.
//!
//! These hold state only; the editor components in [`crate::editor`] decide
//! when to mutate them.

pub mod completer_filter;
pub mod image_list;
pub mod tag_counter;
pub mod tag_list;

pub use completer_filter::CompleterTagFilter;
pub use image_list::{ImageCollection, ProxyImageList, RowRange};
pub use tag_counter::TagCounter;
pub use tag_list::{ListChange, TagListModel};
