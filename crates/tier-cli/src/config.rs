use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tier.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub local_dir: PathBuf,
    pub origin_dir: Option<PathBuf>,
    pub hash_on_read: bool,
    pub log_filter: String,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from(".tier/blocks"),
            origin_dir: None,
            hash_on_read: false,
            log_filter: "info".into(),
        }
    }
}

impl TierConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or fall
    /// back to defaults. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Command-line flags win over file values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(local) = &cli.local {
            self.local_dir = local.clone();
        }
        if let Some(origin) = &cli.origin {
            self.origin_dir = Some(origin.clone());
        }
        if cli.hash_on_read {
            self.hash_on_read = true;
        }
        if cli.verbose {
            self.log_filter = "debug".into();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn default_config() {
        let c = TierConfig::default();
        assert_eq!(c.local_dir, PathBuf::from(".tier/blocks"));
        assert!(c.origin_dir.is_none());
        assert!(!c.hash_on_read);
        assert_eq!(c.log_filter, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = TierConfig::from_toml("origin_dir = \"/mnt/mirror\"\n").unwrap();
        assert_eq!(c.origin_dir, Some(PathBuf::from("/mnt/mirror")));
        assert_eq!(c.local_dir, TierConfig::default().local_dir);
    }

    #[test]
    fn toml_roundtrip() {
        let c = TierConfig {
            local_dir: "/var/tier".into(),
            origin_dir: Some("/mnt/mirror".into()),
            hash_on_read: true,
            log_filter: "tier_store=debug".into(),
        };
        let text = toml::to_string(&c).unwrap();
        assert_eq!(TierConfig::from_toml(&text).unwrap(), c);
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "hash_on_read = true\n").unwrap();
        let c = TierConfig::load(Some(path.as_path())).unwrap();
        assert!(c.hash_on_read);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TierConfig::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }

    #[test]
    fn invalid_toml_fails() {
        assert!(TierConfig::from_toml("hash_on_read = \"yes\"").is_err());
    }

    #[test]
    fn flags_override_file() {
        let cli = Cli::try_parse_from([
            "tier", "ls", "--local", "/tmp/local", "--origin", "/tmp/origin", "--hash-on-read", "-v",
        ])
        .unwrap();
        let c = TierConfig::default().with_overrides(&cli);
        assert_eq!(c.local_dir, PathBuf::from("/tmp/local"));
        assert_eq!(c.origin_dir, Some(PathBuf::from("/tmp/origin")));
        assert!(c.hash_on_read);
        assert_eq!(c.log_filter, "debug");
    }
}
