use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "labeler";
const ENV_PREFIX: &str = "LABELER";

/// Runtime settings: defaults, then `labeler.toml` (or `--config`), then `LABELER_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub questioner_name: String,
    pub responder_name: String,
    /// Characters after which the fallback grouper closes a block.
    pub group_threshold: usize,
    pub max_depth: usize,
    pub min_container_chars: usize,
    pub min_raw_text_chars: usize,
    pub fetch_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub share_url_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            questioner_name: "User".to_string(),
            responder_name: "Assistant".to_string(),
            group_threshold: 100,
            max_depth: 64,
            min_container_chars: 10,
            min_raw_text_chars: 100,
            fetch_timeout_secs: 10,
            max_retries: 3,
            retry_backoff_ms: 2000,
            share_url_marker: "/share/".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        Ok(settings)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.questioner_name, "User");
        assert_eq!(s.responder_name, "Assistant");
        assert_eq!(s.group_threshold, 100);
        assert_eq!(s.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "questioner_name = \"Darko\"\nresponder_name = \"Claude\"",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.questioner_name, "Darko");
        assert_eq!(settings.responder_name, "Claude");
        assert_eq!(settings.max_depth, 64);
    }

    // Only test that sets LABELER_* variables.
    #[test]
    fn env_overrides_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("labeler-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "questioner_name = \"FromFile\"\ngroup_threshold = 7\nmax_depth = 12\n",
        )
        .unwrap();
        std::env::set_var("LABELER_QUESTIONER_NAME", "Darko");
        std::env::set_var("LABELER_GROUP_THRESHOLD", "42");

        let loaded = Settings::load(Some(&path));
        let missing = Settings::load(Some(Path::new("/nonexistent/labeler.toml")));

        std::env::remove_var("LABELER_QUESTIONER_NAME");
        std::env::remove_var("LABELER_GROUP_THRESHOLD");
        std::fs::remove_file(&path).unwrap();

        let settings = loaded.unwrap();
        assert_eq!(settings.questioner_name, "Darko");
        assert_eq!(settings.group_threshold, 42);
        assert_eq!(settings.max_depth, 12);
        assert_eq!(settings.responder_name, "Assistant");
        assert!(missing.is_err());
    }
}
