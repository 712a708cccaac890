//! Auto-captioning with a vision-language model.
//!
//! [`JoyCaption`] adapts a LLaVA-style captioner: it builds the chat prompt,
//! prepares token ids and pixels, and trims the echoed prompt from the
//! generated sequence. Token generation itself sits behind [`TokenGenerator`]
//! so the ONNX runtime can be swapped out in tests. [`CaptionWorker`] runs
//! captioning on the blocking pool.

pub mod generator;
pub mod joycaption;
pub mod preprocess;
pub mod worker;

pub use generator::OnnxGenerator;
pub use joycaption::JoyCaption;
pub use worker::{CaptionOptions, CaptionOutcome, CaptionWorker};

use std::path::Path;

use ndarray::Array4;

use crate::error::CaptionResult;

/// Everything one generation call needs.
///
/// `input_length` is the number of prompt tokens; the generator echoes them
/// back ahead of the new tokens.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    pub input_ids: Vec<u32>,
    pub pixel_values: Array4<f32>,
    pub input_length: usize,
}

/// Autoregressive token generation.
pub trait TokenGenerator: Send + Sync {
    /// Return the prompt ids followed by up to `max_new_tokens` new ids,
    /// stopping after the first id in `eos_ids`.
    fn generate(
        &self,
        inputs: &ModelInputs,
        max_new_tokens: usize,
        eos_ids: &[u32],
    ) -> CaptionResult<Vec<u32>>;
}

/// Produces one caption per image file.
pub trait Captioner: Send + Sync {
    fn caption_file(&self, path: &Path) -> CaptionResult<String>;
}
