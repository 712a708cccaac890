//! Greedy decoding over an exported captioning model.
//!
//! The ONNX graph takes `input_ids` (i64, `[1, seq]`) and `pixel_values`
//! (f32, `[1, 3, H, W]`) and returns `logits` (`[1, seq, vocab]`). Each step
//! reruns the full sequence and appends the argmax of the last position.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::{CaptionError, CaptionResult};

use super::{ModelInputs, TokenGenerator};

/// ONNX Runtime session for the captioning model.
///
/// `Session::run` needs `&mut self`, hence the `Mutex`.
pub struct OnnxGenerator {
    session: Mutex<Session>,
}

impl OnnxGenerator {
    pub fn load(model_path: &Path, device: &str) -> CaptionResult<Self> {
        if device == "cuda" {
            tracing::warn!("CUDA execution provider is not built in, running on CPU");
        }
        let session = Session::builder()
            .map_err(|e| CaptionError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| CaptionError::Model {
                message: format!("Failed to load captioning model {:?}: {e}", model_path),
            })?;

        tracing::debug!(
            "Loaded captioning model from {:?} (inputs: {:?}, outputs: {:?})",
            model_path,
            session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl TokenGenerator for OnnxGenerator {
    fn generate(
        &self,
        inputs: &ModelInputs,
        max_new_tokens: usize,
        eos_ids: &[u32],
    ) -> CaptionResult<Vec<u32>> {
        let pixel_shape: Vec<i64> = inputs.pixel_values.shape().iter().map(|&d| d as i64).collect();
        let pixel_data: Vec<f32> = inputs.pixel_values.iter().copied().collect();
        let mut ids = inputs.input_ids.clone();

        let mut session = self.session.lock().map_err(|e| CaptionError::Inference {
            message: format!("Session lock poisoned: {e}"),
        })?;

        for _ in 0..max_new_tokens {
            let input_ids: Vec<i64> = ids.iter().map(|&id| i64::from(id)).collect();
            let input_ids = Value::from_array((vec![1, input_ids.len() as i64], input_ids))
                .map_err(|e| inference(format!("Failed to create input_ids tensor: {e}")))?;
            let pixels = Value::from_array((pixel_shape.clone(), pixel_data.clone()))
                .map_err(|e| inference(format!("Failed to create pixel tensor: {e}")))?;

            let outputs = session
                .run(ort::inputs!["input_ids" => input_ids, "pixel_values" => pixels])
                .map_err(|e| inference(format!("ONNX inference failed: {e}")))?;

            let logits = outputs
                .iter()
                .find(|(name, _)| *name == "logits")
                .ok_or_else(|| inference("Model did not produce logits".to_string()))?;
            let (shape, data) = logits
                .1
                .try_extract_tensor::<f32>()
                .map_err(|e| inference(format!("Failed to extract logits: {e}")))?;

            let next = next_token(shape, data)?;
            ids.push(next);
            if eos_ids.contains(&next) {
                break;
            }
        }

        Ok(ids)
    }
}

fn inference(message: String) -> CaptionError {
    CaptionError::Inference { message }
}

/// Argmax over the vocabulary at the last sequence position.
fn next_token(shape: &[i64], data: &[f32]) -> CaptionResult<u32> {
    let [_, seq, vocab] = shape else {
        return Err(inference(format!("Unexpected logits shape: {:?}", shape)));
    };
    let (seq, vocab) = (*seq as usize, *vocab as usize);
    let last = seq
        .checked_sub(1)
        .and_then(|row| data.get(row * vocab..seq * vocab))
        .filter(|row| !row.is_empty())
        .ok_or_else(|| inference(format!("Logits too short for shape {:?}", shape)))?;

    let (best, _) = last
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        });
    Ok(best as u32)
}
