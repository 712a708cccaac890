//! Core data types shared by the editor, the image collection and captioning.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An image and its ordered tags.
///
/// Tag order is display order; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Path to the image file
    pub path: PathBuf,

    /// Tags in storage order
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Image {
    pub fn new(path: impl Into<PathBuf>, tags: Vec<String>) -> Self {
        Self {
            path: path.into(),
            tags,
        }
    }

    /// File name for display, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Split user input into tags on `separator`.
///
/// Pieces are kept verbatim, so a tag containing the separator cannot
/// survive a join/split round trip.
pub fn split_tags(text: &str, separator: &str) -> Vec<String> {
    text.split(separator).map(str::to_string).collect()
}

/// Join tags into a single caption string.
pub fn join_tags(tags: &[String], separator: &str) -> String {
    tags.join(separator)
}

/// Keyboard keys the editor reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Return,
    Delete,
    Backspace,
    Up,
    Down,
    Home,
    End,
    Escape,
    Char(char),
}

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
    };
    pub const CTRL: Self = Self {
        ctrl: true,
        shift: false,
    };
    pub const SHIFT: Self = Self {
        ctrl: false,
        shift: true,
    };
}

/// A key press translated from whatever front end is driving the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}
