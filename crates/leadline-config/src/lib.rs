// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Leadline lead-capture bot.
//!
//! TOML files are merged over compiled defaults with `deny_unknown_fields`,
//! `LEADLINE_*` environment variables override them, and every problem is
//! reported as a miette diagnostic.
//!
//! ```no_run
//! use leadline_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("model: {}", config.llm.model_name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::{Path, PathBuf};

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::LeadlineConfig;

/// Loads configuration from the XDG hierarchy and validates it.
pub fn load_and_validate() -> Result<LeadlineConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Loads configuration from a TOML string and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<LeadlineConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Loads configuration from an explicit file (plus env overrides) and validates it.
pub fn load_and_validate_path(path: &Path) -> Result<LeadlineConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path.to_path_buf()).into_iter().collect()
    })
}

fn finish(
    loaded: Result<LeadlineConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<LeadlineConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: PathBuf) -> Option<(String, String)> {
    let content = std::fs::read_to_string(&path).ok()?;
    let path = if path.is_relative() {
        std::env::current_dir()
            .map(|d| d.join(&path))
            .unwrap_or(path)
    } else {
        path
    };
    Some((path.display().to_string(), content))
}

/// Contents of every config file the hierarchy would read, for span lookup.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![PathBuf::from("leadline.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("leadline/leadline.toml"));
    }
    candidates.push(PathBuf::from("/etc/leadline/leadline.toml"));

    candidates.into_iter().filter_map(read_source).collect()
}
