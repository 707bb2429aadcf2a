//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::routing::AudioMatch;

const DEFAULT_DRM_ROOT: &str = "/sys/class/drm";
const DEFAULT_POLL_SECS: u64 = 5;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Persisted preference store
    pub prefs_path: PathBuf,

    /// sysfs directory holding the DRM connectors
    pub drm_root: PathBuf,

    /// Interval of the connector hotplug poll
    pub topology_poll: Duration,

    pub audio_match: AudioMatch,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Self::from_lookup(&home, |key| std::env::var(key).ok())
    }

    /// Build the configuration from a home directory and a variable lookup
    fn from_lookup<F>(home: &str, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("monitor-control");

        let socket_path = var("MONITOR_CONTROL_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));
        let prefs_path = var("MONITOR_CONTROL_PREFS")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("prefs.json"));
        let drm_root = var("MONITOR_CONTROL_DRM_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DRM_ROOT));

        let poll_secs = match var("MONITOR_CONTROL_POLL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid MONITOR_CONTROL_POLL_SECS '{raw}'"))?,
            None => DEFAULT_POLL_SECS,
        };
        if poll_secs == 0 {
            bail!("MONITOR_CONTROL_POLL_SECS must be at least 1");
        }

        let audio_match = match var("MONITOR_CONTROL_AUDIO_MATCH") {
            Some(raw) => raw.parse::<AudioMatch>().map_err(anyhow::Error::msg)?,
            None => AudioMatch::default(),
        };

        Ok(Self {
            socket_path,
            data_dir,
            prefs_path,
            drm_root,
            topology_poll: Duration::from_secs(poll_secs),
            audio_match,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup("/home/user", |key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/user/.local/share/monitor-control/daemon.sock")
        );
        assert_eq!(
            config.prefs_path,
            PathBuf::from("/home/user/.local/share/monitor-control/prefs.json")
        );
        assert_eq!(config.drm_root, PathBuf::from("/sys/class/drm"));
        assert_eq!(config.topology_poll, Duration::from_secs(5));
        assert_eq!(config.audio_match, AudioMatch::All);
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("MONITOR_CONTROL_SOCKET", "/run/user/1000/mc.sock"),
            ("MONITOR_CONTROL_DRM_ROOT", "/tmp/drm"),
            ("MONITOR_CONTROL_POLL_SECS", "2"),
            ("MONITOR_CONTROL_AUDIO_MATCH", "any"),
        ])
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/run/user/1000/mc.sock"));
        assert_eq!(config.drm_root, PathBuf::from("/tmp/drm"));
        assert_eq!(config.topology_poll, Duration::from_secs(2));
        assert_eq!(config.audio_match, AudioMatch::Any);
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        assert!(load(&[("MONITOR_CONTROL_POLL_SECS", "0")]).is_err());
        assert!(load(&[("MONITOR_CONTROL_POLL_SECS", "soon")]).is_err());
        assert!(load(&[("MONITOR_CONTROL_AUDIO_MATCH", "most")]).is_err());
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load(&[]).unwrap();
        config.data_dir = dir.path().join("nested").join("monitor-control");

        config.ensure_dirs().unwrap();
        assert!(config.data_dir.is_dir());
    }
}
