//! RON configuration for the `omni` binary.
//!
//! A missing file yields the defaults. A file that exists but does not parse
//! is an error, so a typo never silently resets pricing or endpoints.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use omni_core::CreditPolicy;
use omni_engine::ProfileSettings;
use omni_logging::{omni_debug, omni_info};
use serde::{Deserialize, Serialize};

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILENAME: &str = "omni.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the guest credit store.
    pub state_dir: PathBuf,
    /// Directory receiving converted artifacts.
    pub output_dir: PathBuf,
    pub log_destination: LogDestination,
    /// Multiplier applied to simulated stage delays. Zero runs instantly.
    pub delay_scale: f32,
    pub pricing: PricingConfig,
    pub profile: Option<ProfileConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".omni"),
            output_dir: PathBuf::from("output"),
            log_destination: LogDestination::default(),
            delay_scale: 1.0,
            pricing: PricingConfig::default(),
            profile: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub conversion_rate: u64,
    pub transcription_rate: u64,
    pub initial_allotment: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let policy = CreditPolicy::default();
        Self {
            conversion_rate: policy.conversion_rate,
            transcription_rate: policy.transcription_rate,
            initial_allotment: policy.initial_allotment,
        }
    }
}

impl From<PricingConfig> for CreditPolicy {
    fn from(pricing: PricingConfig) -> Self {
        CreditPolicy {
            conversion_rate: pricing.conversion_rate,
            transcription_rate: pricing.transcription_rate,
            initial_allotment: pricing.initial_allotment,
        }
    }
}

/// Remote profile backend used for signed-in identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_table() -> String {
    "profiles".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ProfileConfig {
    pub fn settings(&self) -> ProfileSettings {
        ProfileSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            access_token: self.access_token.clone(),
            table: self.table.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ProfileSettings::default()
        }
    }
}

/// Loads the configuration at `path`, or `./omni.ron` when no path is given.
///
/// An explicitly requested file must exist.
pub fn load(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
    };

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
            omni_debug!("No config at {:?}; using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };

    let config = parse(&content).with_context(|| format!("invalid config {}", path.display()))?;
    omni_info!("Loaded config from {:?}", path);
    Ok(config)
}

pub fn parse(content: &str) -> anyhow::Result<AppConfig> {
    let config: AppConfig = ron::from_str(content)?;
    if !config.delay_scale.is_finite() || config.delay_scale < 0.0 {
        anyhow::bail!("delay_scale must be a non-negative number");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_struct_yields_defaults() {
        let config = parse("()").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(CreditPolicy::from(config.pricing), CreditPolicy::default());
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let config = parse(
            r#"(
                output_dir: "converted",
                delay_scale: 0.0,
                pricing: (transcription_rate: 7),
            )"#,
        )
        .expect("parse");

        assert_eq!(config.output_dir, PathBuf::from("converted"));
        assert_eq!(config.delay_scale, 0.0);
        assert_eq!(config.pricing.transcription_rate, 7);
        assert_eq!(config.pricing.conversion_rate, 1);
        assert_eq!(config.pricing.initial_allotment, 50);
        assert_eq!(config.state_dir, PathBuf::from(".omni"));
    }

    #[test]
    fn profile_section_maps_to_settings() {
        let config = parse(
            r#"(
                log_destination: Both,
                profile: Some((
                    base_url: "https://db.example.com",
                    api_key: "anon",
                    access_token: Some("jwt"),
                    request_timeout_secs: 5,
                )),
            )"#,
        )
        .expect("parse");

        assert_eq!(config.log_destination, LogDestination::Both);
        let settings = config.profile.expect("profile").settings();
        assert_eq!(settings.base_url, "https://db.example.com");
        assert_eq!(settings.api_key, "anon");
        assert_eq!(settings.access_token.as_deref(), Some("jwt"));
        assert_eq!(settings.table, "profiles");
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn negative_delay_scale_is_rejected() {
        assert!(parse("(delay_scale: -1.0)").is_err());
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        assert!(parse("(state_dir: 3)").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("absent.ron");
        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("omni.ron");
        fs::write(&path, r#"(state_dir: "state")"#).expect("write");

        let config = load(Some(&path)).expect("load");
        assert_eq!(config.state_dir, PathBuf::from("state"));
    }
}
