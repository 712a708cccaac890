//! JoyCaption: a LLaVA captioner with a Llama 3 chat prompt.
//!
//! The model echoes the whole prompt ahead of its answer, so the prompt
//! length is recorded with the inputs and that many tokens are dropped from
//! the generated sequence before decoding.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;

use crate::config::CaptioningConfig;
use crate::error::{CaptionError, CaptionResult};
use crate::tokens::{load_tokenizer, TextTokenizer};

use super::preprocess::{load_image, pixel_values};
use super::{Captioner, ModelInputs, OnnxGenerator, TokenGenerator};

const SYSTEM_PROMPT: &str = "You are a helpful image captioner.";
const DEFAULT_PROMPT: &str = "Write a stable diffusion prompt for this image.";
const IMAGE_TOKEN: &str = "<image>";
const END_OF_SEQUENCE: [&str; 2] = ["<|eot_id|>", "<|end_of_text|>"];

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct JoyCaption {
    tokenizer: Arc<dyn TextTokenizer>,
    generator: Box<dyn TokenGenerator>,
    settings: CaptioningConfig,
    separator: String,
    eos_ids: Vec<u32>,
}

impl JoyCaption {
    /// Message for settings this model cannot honor.
    pub fn additional_error_message(settings: &CaptioningConfig) -> Option<&'static str> {
        settings
            .load_in_4_bit
            .then_some("This model cannot be loaded in 4-bit.")
    }

    pub fn default_prompt() -> &'static str {
        DEFAULT_PROMPT
    }

    /// Load the model and tokenizer from `model_dir`.
    ///
    /// Unsupported settings are rejected before any file is opened.
    pub fn load(settings: &CaptioningConfig, model_dir: &Path, separator: &str) -> CaptionResult<Self> {
        check_settings(settings)?;

        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                return Err(CaptionError::Model {
                    message: format!(
                        "{:?} not found. Set captioning.model_dir in the config file.",
                        path
                    ),
                });
            }
        }

        tracing::info!(
            "Loading JoyCaption from {:?} on {} ({})",
            model_dir,
            settings.device,
            dtype(&settings.device)
        );
        let tokenizer = load_tokenizer(&tokenizer_path)?;
        let generator = OnnxGenerator::load(&model_path, &settings.device)?;
        Self::with_parts(tokenizer, Box::new(generator), settings, separator)
    }

    /// Assemble from an already loaded tokenizer and generator.
    pub fn with_parts(
        tokenizer: Arc<dyn TextTokenizer>,
        generator: Box<dyn TokenGenerator>,
        settings: &CaptioningConfig,
        separator: &str,
    ) -> CaptionResult<Self> {
        check_settings(settings)?;
        let eos_ids = END_OF_SEQUENCE
            .iter()
            .filter_map(|token| tokenizer.token_id(token))
            .collect();
        Ok(Self {
            tokenizer,
            generator,
            settings: settings.clone(),
            separator: separator.to_string(),
            eos_ids,
        })
    }

    /// Weight dtype the model runs with on the configured device.
    pub fn dtype(&self) -> &'static str {
        dtype(&self.settings.device)
    }

    /// The configured prompt, or the default when none is set.
    pub fn prompt(&self) -> &str {
        match self.settings.prompt.trim() {
            "" => DEFAULT_PROMPT,
            prompt => prompt,
        }
    }

    /// Render the system/user conversation with the generation prompt.
    pub fn format_prompt(&self, prompt: &str) -> String {
        let conversation = [
            ("system", SYSTEM_PROMPT.to_string()),
            ("user", format!("{IMAGE_TOKEN}{prompt}")),
        ];
        let mut rendered = String::from("<|begin_of_text|>");
        for (role, content) in conversation {
            rendered.push_str(&format!(
                "<|start_header_id|>{role}<|end_header_id|>\n\n{content}<|eot_id|>"
            ));
        }
        rendered.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
        rendered
    }

    /// Prompt text actually fed to the model.
    pub fn input_text(&self, image_prompt: &str) -> String {
        format!("{image_prompt}{}", self.settings.caption_start)
    }

    pub fn model_inputs(&self, image_prompt: &str, image: &DynamicImage) -> CaptionResult<ModelInputs> {
        // the rendered template already carries the begin-of-text marker
        let input_ids = self.tokenizer.encode(&self.input_text(image_prompt), false)?;
        let input_length = input_ids.len();
        Ok(ModelInputs {
            input_ids,
            pixel_values: pixel_values(image, self.settings.image_size),
            input_length,
        })
    }

    /// Decode the tokens generated after the prompt into a caption.
    pub fn caption_from_generated_tokens(
        &self,
        generated_token_ids: &[u32],
        inputs: &ModelInputs,
    ) -> CaptionResult<String> {
        let answer = generated_token_ids
            .get(inputs.input_length..)
            .unwrap_or_default();
        let decoded = self.tokenizer.decode(answer, true)?;
        let caption = format!("{} {}", self.settings.caption_start.trim(), decoded.trim());
        let mut caption = caption.trim().to_string();
        if self.settings.remove_tag_separators {
            caption = caption.replace(&self.separator, " ");
        }
        Ok(caption)
    }

    pub fn caption_image(&self, image: &DynamicImage) -> CaptionResult<String> {
        let image_prompt = self.format_prompt(self.prompt());
        let inputs = self.model_inputs(&image_prompt, image)?;
        let generated = self
            .generator
            .generate(&inputs, self.settings.max_new_tokens, &self.eos_ids)?;
        let caption = self.caption_from_generated_tokens(&generated, &inputs)?;
        tracing::debug!(
            "Generated {} tokens",
            generated.len().saturating_sub(inputs.input_length)
        );
        Ok(caption)
    }
}

impl Captioner for JoyCaption {
    fn caption_file(&self, path: &Path) -> CaptionResult<String> {
        let image = load_image(path)?;
        self.caption_image(&image)
    }
}

fn check_settings(settings: &CaptioningConfig) -> CaptionResult<()> {
    match JoyCaption::additional_error_message(settings) {
        Some(message) => Err(CaptionError::Configuration(message.to_string())),
        None => Ok(()),
    }
}

fn dtype(device: &str) -> &'static str {
    if device == "cuda" {
        "bfloat16"
    } else {
        "float32"
    }
}
