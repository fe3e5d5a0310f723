// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;

use tracing::warn;

use crate::error::ForwarderError;
use crate::severity::Severity;

/// Canonical logs intake host.
pub const DEFAULT_INTAKE_URL: &str = "https://http-intake.logs.datadoghq.com";

/// Configuration for the forwarding pipeline.
///
/// Values are resolved by the entry point (environment, in deployment) and
/// consumed here as already-validated configuration.
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Datadog API key for the logs intake. Required.
    pub api_key: String,
    /// Intake base URL, without trailing slash.
    pub api_url: String,
    /// Minimum severity a record must reach to be delivered.
    pub threshold: Severity,
    /// Dead-letter queue URL for records that could not be classified or
    /// delivered.
    pub dead_letter_queue_url: Option<String>,
}

impl ForwarderConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ForwarderError> {
        let api_key = env::var("DD_API_KEY").unwrap_or_default();
        let api_url = env::var("DD_URL").unwrap_or_else(|_| DEFAULT_INTAKE_URL.to_string());
        let threshold = env::var("DD_LOG_LEVEL")
            .map(|value| parse_threshold(&value))
            .unwrap_or(Severity::Info);
        let dead_letter_queue_url = env::var("DD_DLQ_URL").ok();

        let config = Self {
            api_key,
            api_url,
            threshold,
            dead_letter_queue_url,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ForwarderError> {
        if self.api_key.trim().is_empty() {
            return Err(ForwarderError::Configuration(
                "DD_API_KEY is not set".to_string(),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(ForwarderError::Configuration(
                "DD_URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses the configured severity threshold, falling back to `INFO` for an
/// unrecognized value.
pub fn parse_threshold(value: &str) -> Severity {
    match Severity::parse(value) {
        Some(threshold) => threshold,
        None => {
            warn!(
                "Unrecognized severity threshold '{}', falling back to INFO",
                value
            );
            Severity::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ForwarderConfig {
        ForwarderConfig {
            api_key: "test-key".to_string(),
            api_url: DEFAULT_INTAKE_URL.to_string(),
            threshold: Severity::Info,
            dead_letter_queue_url: None,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let config = ForwarderConfig {
            api_key: "   ".to_string(),
            ..config()
        };
        let error = config.validate().unwrap_err();
        assert!(matches!(error, ForwarderError::Configuration(_)));
        assert!(error.to_string().contains("DD_API_KEY"));
    }

    #[test]
    fn empty_api_url_is_rejected() {
        let config = ForwarderConfig {
            api_url: String::new(),
            ..config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_parsing_falls_back_to_info() {
        assert_eq!(parse_threshold("warn"), Severity::Warn);
        assert_eq!(parse_threshold("WARN"), Severity::Warn);
        assert_eq!(parse_threshold("bogus"), Severity::Info);
        assert_eq!(parse_threshold(""), Severity::Info);
    }
}
