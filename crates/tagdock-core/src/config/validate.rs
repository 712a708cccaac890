//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.editor.separator.is_empty() {
            return Err(ConfigError::ValidationError(
                "editor.separator must not be empty".into(),
            ));
        }
        if self.editor.max_token_count == 0 {
            return Err(ConfigError::ValidationError(
                "editor.max_token_count must be > 0".into(),
            ));
        }
        if self.captioning.max_new_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "captioning.max_new_tokens must be > 0".into(),
            ));
        }
        if self.captioning.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "captioning.image_size must be > 0".into(),
            ));
        }
        if !matches!(self.captioning.device.as_str(), "cpu" | "cuda") {
            return Err(ConfigError::ValidationError(format!(
                "captioning.device must be \"cpu\" or \"cuda\", got {:?}",
                self.captioning.device
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_separator() {
        let mut config = Config::default();
        config.editor.separator.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("editor.separator"));
    }

    #[test]
    fn test_validate_rejects_zero_token_budget() {
        let mut config = Config::default();
        config.editor.max_token_count = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_token_count"));
    }

    #[test]
    fn test_validate_rejects_unknown_device() {
        let mut config = Config::default();
        config.captioning.device = "metal".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("captioning.device"));
    }

    #[test]
    fn test_validate_rejects_zero_new_tokens() {
        let mut config = Config::default();
        config.captioning.max_new_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_new_tokens"));
    }
}
