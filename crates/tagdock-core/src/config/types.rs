//! Configuration section types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag editor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Delimiter used to split input into tags and to join tags into a caption
    pub separator: String,

    /// Token budget shown in the editor label
    pub max_token_count: usize,

    /// Tokens the tokenizer adds around every caption (start/end markers)
    pub token_overhead: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            separator: ", ".to_string(),
            max_token_count: 75,
            token_overhead: 2,
        }
    }
}

/// Tokenizer settings for the token budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Path to a HuggingFace `tokenizer.json` (CLIP tokenizer by default)
    pub path: PathBuf,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.tagdock/models/clip-vit-large-patch14/tokenizer.json"),
        }
    }
}

/// Where a generated caption goes in an image's tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptionPosition {
    /// Insert the caption as the new first tag
    BeforeFirstTag,
    /// Append the caption after the last tag
    #[default]
    AfterLastTag,
    /// Replace the first tag (or insert if there are none)
    OverwriteFirstTag,
    /// Replace every tag with the caption
    OverwriteAllTags,
    /// Report the caption without touching the tags
    DoNotAdd,
}

/// Auto-captioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptioningConfig {
    /// Directory holding `model.onnx` and `tokenizer.json` for the captioner
    pub model_dir: PathBuf,

    /// Prompt sent with every image; empty means the model's default prompt
    pub prompt: String,

    /// Text the caption is forced to start with
    pub caption_start: String,

    /// Upper bound on generated tokens per caption
    pub max_new_tokens: usize,

    /// Request 4-bit quantized loading
    pub load_in_4_bit: bool,

    /// Inference device ("cpu" or "cuda")
    pub device: String,

    /// Square input size the vision tower expects
    pub image_size: u32,

    /// How captions are applied to the image's tags
    pub caption_position: CaptionPosition,

    /// Strip the tag separator out of generated captions
    pub remove_tag_separators: bool,
}

impl Default for CaptioningConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.tagdock/models/joycaption"),
            prompt: String::new(),
            caption_start: String::new(),
            max_new_tokens: 100,
            load_in_4_bit: false,
            device: "cpu".to_string(),
            image_size: 384,
            caption_position: CaptionPosition::default(),
            remove_tag_separators: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
