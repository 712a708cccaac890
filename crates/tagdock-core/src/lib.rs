//! tagdock core - headless image tag editor.
//!
//! Models a tag editor for an image collection: the active image's tag list,
//! an input box with filtered autocomplete, a token budget for the joined
//! caption, and bulk edits across many images. Captions can be generated
//! with a vision-language model running on a background worker.
//!
//! ```text
//! select image → load tags → edit / add / reorder → write back → recount tokens
//!                                   ↑
//!          bulk edits and captions ─┘ (reload when the active image is hit)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tagdock_core::{load_tokenizer, Config, Image, TaggingSession};
//!
//! let config = Config::load()?;
//! let tokenizer = load_tokenizer(&config.tokenizer_path())?;
//! let images = vec![Image::new("beach.jpg", vec!["sky".into(), "sea".into()])];
//! let mut session = TaggingSession::new(images, tokenizer, &config, |_: &str, _: &str| true);
//!
//! session.select_image(0)?;
//! session.submit_input("sand")?;
//! println!("{}", session.state().editor.token_label());
//! ```

pub mod caption;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod model;
pub mod output;
pub mod session;
pub mod tokens;
pub mod types;

pub use caption::{CaptionOptions, CaptionOutcome, CaptionWorker, Captioner, JoyCaption};
pub use config::{CaptionPosition, Config};
pub use editor::{AddTagDecision, Confirm, ImageTagsEditor};
pub use error::{
    CaptionError, CaptionResult, ConfigError, EditorError, Result, TagdockError, TokenizerError,
};
pub use output::{CaptionRecord, OutputFormat, OutputWriter};
pub use session::{EditorEvent, TaggingSession};
pub use tokens::{load_tokenizer, LabelStyle, TextTokenizer, TokenBudget};
pub use types::{Image, Key, KeyEvent, Modifiers};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
