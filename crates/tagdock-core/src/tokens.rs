//! Tokenizer abstraction and the token budget label.
//!
//! The budget label is advisory: it reflects how many tokens the joined tag
//! string costs a text encoder, and never blocks an edit.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use crate::error::TokenizerError;
use crate::types::join_tags;

/// Text ↔ token id conversion.
///
/// Implemented for HuggingFace `tokenizers::Tokenizer`; tests use small fakes.
pub trait TextTokenizer: Send + Sync {
    /// Encode `text` to ids, optionally adding start/end markers.
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, TokenizerError>;

    /// Decode ids back to text.
    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, TokenizerError>;

    /// Id of a single token, if it is in the vocabulary.
    fn token_id(&self, token: &str) -> Option<u32>;
}

// `Tokenizer` derefs to `TokenizerImpl`, which owns the inherent methods.
impl TextTokenizer for tokenizers::Tokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, TokenizerError> {
        Deref::deref(self)
            .encode(text, add_special_tokens)
            .map(|encoding| encoding.get_ids().to_vec())
            .map_err(|e| TokenizerError(format!("Tokenization failed: {e}")))
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, TokenizerError> {
        Deref::deref(self)
            .decode(ids, skip_special_tokens)
            .map_err(|e| TokenizerError(format!("Decoding failed: {e}")))
    }

    fn token_id(&self, token: &str) -> Option<u32> {
        Deref::deref(self).token_to_id(token)
    }
}

/// Load a `tokenizer.json` from disk.
pub fn load_tokenizer(path: &Path) -> Result<Arc<dyn TextTokenizer>, TokenizerError> {
    if !path.exists() {
        return Err(TokenizerError(format!(
            "Tokenizer not found at {:?}. Set tokenizer.path in the config file.",
            path
        )));
    }
    let tokenizer = tokenizers::Tokenizer::from_file(path)
        .map_err(|e| TokenizerError(format!("Failed to load tokenizer {:?}: {e}", path)))?;
    tracing::debug!("Loaded tokenizer from {:?}", path);
    Ok(Arc::new(tokenizer))
}

/// Styling the front end should apply to the budget label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Normal,
    Warning,
}

/// Token count of the active caption against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub count: usize,
    pub limit: usize,
}

impl TokenBudget {
    /// Count tokens for `tags` joined with `separator`.
    ///
    /// `overhead` ids (the start/end markers) are subtracted from the raw
    /// tokenizer output, saturating at zero.
    pub fn measure(
        tokenizer: &dyn TextTokenizer,
        tags: &[String],
        separator: &str,
        overhead: usize,
        limit: usize,
    ) -> Result<Self, TokenizerError> {
        let caption = join_tags(tags, separator);
        let ids = tokenizer.encode(&caption, true)?;
        Ok(Self {
            count: ids.len().saturating_sub(overhead),
            limit,
        })
    }

    pub fn is_over(&self) -> bool {
        self.count > self.limit
    }

    pub fn style(&self) -> LabelStyle {
        if self.is_over() {
            LabelStyle::Warning
        } else {
            LabelStyle::Normal
        }
    }

    /// Label text, e.g. `"12 / 75 Tokens"`.
    pub fn label(&self) -> String {
        format!("{} / {} Tokens", self.count, self.limit)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Splits on whitespace and commas, wraps with BOS/EOS.
    ///
    /// Ids are assigned from a fixed vocabulary; unknown words map to 1.
    /// Ids below 4 and `<|...|>` words count as special tokens.
    pub struct WordTokenizer {
        vocab: Vec<String>,
    }

    pub const BOS: u32 = 2;
    pub const EOS: u32 = 3;

    impl WordTokenizer {
        pub fn new(words: &[&str]) -> Self {
            let mut vocab: Vec<String> = ["<pad>", "<unk>", "<s>", "</s>"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            vocab.extend(words.iter().map(|s| s.to_string()));
            Self { vocab }
        }

        fn pieces(text: &str) -> Vec<String> {
            let mut out = Vec::new();
            for word in text.split_whitespace() {
                let mut rest = word;
                while let Some(i) = rest.find(',') {
                    if i > 0 {
                        out.push(rest[..i].to_string());
                    }
                    out.push(",".to_string());
                    rest = &rest[i + 1..];
                }
                if !rest.is_empty() {
                    out.push(rest.to_string());
                }
            }
            out
        }
    }

    impl TextTokenizer for WordTokenizer {
        fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, TokenizerError> {
            let mut ids: Vec<u32> = Self::pieces(text)
                .iter()
                .map(|p| self.token_id(p).unwrap_or(1))
                .collect();
            if add_special_tokens {
                ids.insert(0, BOS);
                ids.push(EOS);
            }
            Ok(ids)
        }

        fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String, TokenizerError> {
            let mut words = Vec::with_capacity(ids.len());
            for &id in ids {
                let word = self
                    .vocab
                    .get(id as usize)
                    .ok_or_else(|| TokenizerError(format!("unknown id {id}")))?;
                let special = id < 4 || (word.starts_with("<|") && word.ends_with("|>"));
                if !(skip_special_tokens && special) {
                    words.push(word.as_str());
                }
            }
            Ok(words.join(" "))
        }

        fn token_id(&self, token: &str) -> Option<u32> {
            self.vocab.iter().position(|w| w == token).map(|i| i as u32)
        }
    }
}
