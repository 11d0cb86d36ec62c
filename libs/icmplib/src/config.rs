// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Probe configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IcmpError, Result};
use crate::packet::DEFAULT_TTL;
use crate::raw::DEFAULT_RECV_BUFFER;
use crate::reply::MIN_REPLY_LEN;

pub trait ConfigFile: Sized + Default + for<'de> Deserialize<'de> + Serialize {
    fn config_path() -> PathBuf;

    fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| IcmpError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to read: {}", e),
        })?;

        serde_json::from_str(&content).map_err(|e| IcmpError::Config {
            path: path.to_path_buf(),
            reason: format!("failed to parse: {}", e),
        })
    }

    fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let config_err = |reason: String| IcmpError::Config {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| config_err(format!("failed to create config dir: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| config_err(format!("failed to serialize: {}", e)))?;

        std::fs::write(path, content).map_err(|e| config_err(format!("failed to write: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Echo requests sent by a ping run.
    pub count: u16,
    /// Per-probe wait for a reply.
    pub timeout_secs: u64,
    /// Hop limit for ping probes.
    pub ttl: u8,
    /// Pause between traceroute probes.
    pub hop_delay_ms: u64,
    /// Highest TTL a traceroute probes before giving up.
    pub max_hops: u8,
    pub recv_buffer: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            count: 4,
            timeout_secs: 30,
            ttl: DEFAULT_TTL,
            hop_delay_ms: 2000,
            max_hops: 30,
            recv_buffer: DEFAULT_RECV_BUFFER,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn hop_delay(&self) -> Duration {
        Duration::from_millis(self.hop_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(IcmpError::InvalidConfig("count must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(IcmpError::InvalidConfig("timeout must be at least 1 second".to_string()));
        }
        if self.ttl == 0 || self.max_hops == 0 {
            return Err(IcmpError::InvalidConfig("ttl and max_hops must be at least 1".to_string()));
        }
        if self.recv_buffer < MIN_REPLY_LEN {
            return Err(IcmpError::InvalidConfig(format!(
                "recv_buffer must hold at least {} bytes",
                MIN_REPLY_LEN
            )));
        }
        Ok(())
    }
}

impl ConfigFile for ProbeConfig {
    fn config_path() -> PathBuf {
        PathBuf::from("/etc/rustux/icmp.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("icmplib-{}-{}", std::process::id(), name))
            .join("icmp.json")
    }

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::default();
        assert_eq!(config.count, 4);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.hop_delay(), Duration::from_secs(2));
        assert_eq!(config.ttl, 255);
        assert_eq!(config.max_hops, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = ProbeConfig::load_from(&scratch("missing")).unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let config: ProbeConfig = serde_json::from_str(r#"{"count": 10, "max_hops": 64}"#).unwrap();
        assert_eq!(config.count, 10);
        assert_eq!(config.max_hops, 64);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("roundtrip");
        let config = ProbeConfig {
            timeout_secs: 5,
            hop_delay_ms: 0,
            ..ProbeConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(ProbeConfig::load_from(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_bad_json() {
        let path = scratch("bad");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        let err = ProbeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, IcmpError::Config { .. }));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_validate_rejects_zero_count() {
        let config = ProbeConfig {
            count: 0,
            ..ProbeConfig::default()
        };
        assert!(matches!(config.validate(), Err(IcmpError::InvalidConfig(_))));
    }
}
