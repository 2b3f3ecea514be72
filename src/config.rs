//! Tracker configuration
//!
//! One TOML file lists every tool (one per audience segment). Each tool gets
//! its own port and its own prospect file under `data_dir`.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::models::Segment;
use crate::store::BackupPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding prospect, template and activity files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Address every tool binds to
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// Backups kept per data file
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Activity log entries kept per tool
    #[serde(default = "default_max_activity")]
    pub max_activity: usize,

    /// Served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    #[serde(default = "default_segments")]
    pub segments: Vec<SegmentConfig>,
}

/// A single prospecting tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Short identifier, used in file names and on the command line
    pub key: String,

    /// Human-readable name shown on the dashboard
    pub label: String,

    pub port: u16,

    /// Prospect file, relative to `data_dir` (default `<key>-prospects.json`)
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Segment assigned to imports that don't name one
    #[serde(default)]
    pub audience: Segment,
}

impl SegmentConfig {
    pub fn data_path(&self, data_dir: &Path) -> PathBuf {
        match &self.data_file {
            Some(file) => data_dir.join(file),
            None => data_dir.join(format!("{}-prospects.json", self.key)),
        }
    }

    pub fn templates_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}-templates.json", self.key))
    }

    pub fn activity_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}-activity.json", self.key))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind: default_bind(),
            max_backups: default_max_backups(),
            max_activity: default_max_activity(),
            static_dir: default_static_dir(),
            segments: default_segments(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_max_backups() -> usize {
    10
}

fn default_max_activity() -> usize {
    500
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_segments() -> Vec<SegmentConfig> {
    vec![
        SegmentConfig {
            key: "b2b".to_string(),
            label: "B2B 1st Connections".to_string(),
            port: 3851,
            data_file: None,
            audience: Segment::Cyber,
        },
        SegmentConfig {
            key: "cyber".to_string(),
            label: "Cyber 1st Connections".to_string(),
            port: 3852,
            data_file: None,
            audience: Segment::CyberCmo,
        },
    ]
}

impl Config {
    /// Reads `path` if it exists, otherwise falls back to the built-in tools.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: Config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.segments.is_empty() {
            bail!("at least one [[segments]] entry is required");
        }
        if self.max_backups == 0 {
            bail!("max_backups must be at least 1");
        }

        let mut keys = HashSet::new();
        let mut ports = HashSet::new();
        for segment in &self.segments {
            if segment.key.trim().is_empty() {
                bail!("segment key cannot be empty");
            }
            if !keys.insert(segment.key.as_str()) {
                bail!("duplicate segment key {:?}", segment.key);
            }
            if !ports.insert(segment.port) {
                bail!("port {} is used by more than one segment", segment.port);
            }
        }
        Ok(())
    }

    pub fn backup_policy(&self) -> BackupPolicy {
        BackupPolicy {
            dir: self.data_dir.join("backups"),
            keep: self.max_backups,
        }
    }

    /// Looks up a tool by key, or the first configured tool when `key` is `None`.
    pub fn segment(&self, key: Option<&str>) -> anyhow::Result<&SegmentConfig> {
        match key {
            Some(key) => self
                .segments
                .iter()
                .find(|s| s.key == key)
                .with_context(|| format!("no segment named {key:?} in config")),
            None => self.segments.first().context("no segments configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_b2b_and_cyber_tools() {
        let config = Config::default();
        assert_eq!(config.segments.len(), 2);
        assert_eq!(config.segments[0].port, 3851);
        assert_eq!(config.segments[1].port, 3852);
        assert_eq!(config.max_backups, 10);
        assert!(config.bind.is_loopback());
        config.validate().unwrap();
    }

    #[test]
    fn parses_segment_list() {
        let config: Config = toml::from_str(
            r#"
data_dir = "/var/lib/prospects"
max_backups = 5

[[segments]]
key = "referral"
label = "Referral Partners"
port = 3855
audience = "referral_partner"

[[segments]]
key = "podcast"
label = "Podcast Guests"
port = 3857
data_file = "podcast.json"
audience = "not_a_segment"
"#,
        )
        .unwrap();

        assert_eq!(config.max_backups, 5);
        assert_eq!(config.max_activity, 500);
        let referral = config.segment(Some("referral")).unwrap();
        assert_eq!(referral.audience, Segment::ReferralPartner);
        assert_eq!(
            referral.data_path(&config.data_dir),
            PathBuf::from("/var/lib/prospects/referral-prospects.json")
        );
        let podcast = config.segment(Some("podcast")).unwrap();
        assert_eq!(podcast.audience, Segment::Cyber);
        assert_eq!(
            podcast.data_path(&config.data_dir),
            PathBuf::from("/var/lib/prospects/podcast.json")
        );
        assert_eq!(config.segment(None).unwrap().key, "referral");
        assert!(config.segment(Some("missing")).is_err());
    }

    #[test]
    fn rejects_duplicate_ports() {
        let mut config = Config::default();
        config.segments[1].port = config.segments[0].port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("tracker.toml")).unwrap();
        assert_eq!(config.segments[0].key, "b2b");
    }
}
