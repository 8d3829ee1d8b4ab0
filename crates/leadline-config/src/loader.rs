// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./leadline.toml` > `~/.config/leadline/leadline.toml` > `/etc/leadline/leadline.toml`
//! with environment variable overrides via `LEADLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LeadlineConfig;

/// Config sections that environment variables may address.
const ENV_SECTIONS: &[&str] = &[
    "agent",
    "llm",
    "storage",
    "session",
    "retrieval",
    "ingest",
    "monitor",
    "whatsapp",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/leadline/leadline.toml` (system-wide)
/// 3. `~/.config/leadline/leadline.toml` (user XDG config)
/// 4. `./leadline.toml` (local directory)
/// 5. `LEADLINE_*` environment variables
pub fn load_config() -> Result<LeadlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LeadlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LeadlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LeadlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the XDG hierarchy.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LeadlineConfig::default()))
        .merge(Toml::file("/etc/leadline/leadline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("leadline/leadline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("leadline.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `LEADLINE_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")`: key names contain
/// underscores, so `LEADLINE_MONITOR_POLL_INTERVAL_SECS` must become
/// `monitor.poll_interval_secs`.
fn env_provider() -> Env {
    Env::prefixed("LEADLINE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env var name, in any case, to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("llm_api_key"), "llm.api_key");
        assert_eq!(
            map_env_key("monitor_poll_interval_secs"),
            "monitor.poll_interval_secs"
        );
        assert_eq!(map_env_key("whatsapp_port"), "whatsapp.port");
    }

    #[test]
    fn env_keys_are_matched_in_original_case() {
        assert_eq!(map_env_key("WHATSAPP_PORT"), "whatsapp.port");
        assert_eq!(map_env_key("Llm_Api_Key"), "llm.api_key");
    }

    #[test]
    fn unknown_section_passes_through() {
        assert_eq!(map_env_key("nonsense_key"), "nonsense_key");
        // A section name must be followed by an underscore to match.
        assert_eq!(map_env_key("llmx"), "llmx");
    }
}
