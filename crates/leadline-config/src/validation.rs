// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-zero intervals, bounded percentiles, and a bindable host.

use crate::diagnostic::ConfigError;
use crate::model::LeadlineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.llm.base_url.trim().is_empty() {
        fail("llm.base_url must not be empty".to_string());
    }
    if config.llm.model_name.trim().is_empty() {
        fail("llm.model_name must not be empty".to_string());
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        fail(format!(
            "llm.temperature must be between 0.0 and 2.0, got {}",
            config.llm.temperature
        ));
    }
    if config.llm.max_tokens == 0 {
        fail("llm.max_tokens must be at least 1".to_string());
    }
    if config.llm.timeout_secs == 0 {
        fail("llm.timeout_secs must be at least 1".to_string());
    }

    if config.session.ttl_secs == 0 {
        fail("session.ttl_secs must be at least 1".to_string());
    }
    if config.session.store_timeout_secs == 0 {
        fail("session.store_timeout_secs must be at least 1".to_string());
    }

    if config.retrieval.top_k == 0 {
        fail("retrieval.top_k must be at least 1".to_string());
    }
    if config.retrieval.timeout_secs == 0 {
        fail("retrieval.timeout_secs must be at least 1".to_string());
    }

    let percentile = config.ingest.breakpoint_percentile;
    if !(percentile > 0.0 && percentile <= 100.0) {
        fail(format!(
            "ingest.breakpoint_percentile must be in (0, 100], got {percentile}"
        ));
    }
    if config.ingest.max_chunk_chars < 100 {
        fail(format!(
            "ingest.max_chunk_chars must be at least 100, got {}",
            config.ingest.max_chunk_chars
        ));
    }

    if config.monitor.poll_interval_secs == 0 {
        fail("monitor.poll_interval_secs must be at least 1".to_string());
    }
    if config.monitor.inactivity_threshold_mins == 0 {
        fail("monitor.inactivity_threshold_mins must be at least 1".to_string());
    }
    if config.monitor.call_timeout_secs == 0 {
        fail("monitor.call_timeout_secs must be at least 1".to_string());
    }

    let host = config.whatsapp.host.trim();
    if host.is_empty() {
        fail("whatsapp.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "whatsapp.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }
    if !config.whatsapp.webhook_path.starts_with('/') {
        fail(format!(
            "whatsapp.webhook_path must start with `/`, got `{}`",
            config.whatsapp.webhook_path
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&LeadlineConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = LeadlineConfig::default();
        config.retrieval.top_k = 0;
        config.monitor.poll_interval_secs = 0;
        config.ingest.breakpoint_percentile = 150.0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_bad_host_and_path() {
        let mut config = LeadlineConfig::default();
        config.whatsapp.host = "not a host!".into();
        config.whatsapp.webhook_path = "whatsapp".into();

        let errors = validate_config(&config).unwrap_err();
        let text: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(text.iter().any(|t| t.contains("whatsapp.host")));
        assert!(text.iter().any(|t| t.contains("webhook_path")));
    }
}
