//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.busy_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "store.busy_timeout_ms must be > 0".into(),
            ));
        }
        if self.store.operation_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "store.operation_timeout_ms must be > 0".into(),
            ));
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_connections must be > 0".into(),
            ));
        }
        if self.store.max_id_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_id_attempts must be > 0".into(),
            ));
        }
        if self.limits.max_upload_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_upload_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.encode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.encode_timeout_ms must be > 0".into(),
            ));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "upload.allowed_extensions must not be empty".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
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
    fn test_validate_rejects_zero_id_attempts() {
        let mut config = Config::default();
        config.store.max_id_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_id_attempts"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.store.operation_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("operation_timeout_ms"));

        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_empty_extensions() {
        let mut config = Config::default();
        config.upload.allowed_extensions.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("allowed_extensions"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
