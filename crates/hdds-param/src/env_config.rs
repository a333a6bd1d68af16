// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for hdds-param.
//!
//! - `HDDS_DOMAIN_ID`: domain ID (default: 0, or ROS_DOMAIN_ID if set)
//! - `HDDS_LOG_LEVEL`: tracing filter (default: "warn")
//! - `HDDS_PARAM_CONFIG`: path to a collector tuning file (TOML)
//! - `HDDS_PARAM_GRAPH`: path to a loopback graph fixture (TOML)
//!
//! # Example
//!
//! ```bash
//! export HDDS_DOMAIN_ID=42
//! export HDDS_PARAM_GRAPH=/etc/hdds/graph.toml
//! hdds-param list --param-type
//! ```

use crate::helpers;
use std::env;
use std::path::PathBuf;

/// Environment variable names
pub const ENV_DOMAIN_ID: &str = "HDDS_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = "HDDS_LOG_LEVEL";
pub const ENV_CONFIG_FILE: &str = "HDDS_PARAM_CONFIG";
pub const ENV_GRAPH_FILE: &str = "HDDS_PARAM_GRAPH";

/// Runtime configuration from environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Domain ID (0-232)
    pub domain_id: u32,

    /// Logging filter, `None` when unset
    pub log_level: Option<String>,

    /// Collector tuning file
    pub config_file: Option<PathBuf>,

    /// Loopback graph fixture
    pub graph_file: Option<PathBuf>,
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. HDDS_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    #[must_use]
    pub fn from_env() -> Self {
        let domain_id = non_empty(ENV_DOMAIN_ID)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or_else(helpers::ros_domain_id);

        Self {
            domain_id,
            log_level: non_empty(ENV_LOG_LEVEL),
            config_file: non_empty(ENV_CONFIG_FILE).map(PathBuf::from),
            graph_file: non_empty(ENV_GRAPH_FILE).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::ENV_ROS_DOMAIN_ID;

    const VARS: &[&str] = &[
        ENV_DOMAIN_ID,
        ENV_ROS_DOMAIN_ID,
        ENV_LOG_LEVEL,
        ENV_CONFIG_FILE,
        ENV_GRAPH_FILE,
    ];

    /// Run `f` with the given variables set and every other known one
    /// cleared, then restore the previous environment.
    fn with_env(vars: &[(&str, &str)], f: impl FnOnce()) {
        let _guard = crate::ENV_LOCK.lock();
        let saved: Vec<_> = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        for key in VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        f();

        for (key, value) in saved {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_default_config() {
        with_env(&[], || {
            assert_eq!(EnvConfig::from_env(), EnvConfig::default());
        });
    }

    #[test]
    fn test_hdds_domain_id_takes_priority() {
        with_env(&[(ENV_DOMAIN_ID, "42"), (ENV_ROS_DOMAIN_ID, "99")], || {
            assert_eq!(EnvConfig::from_env().domain_id, 42);
        });
    }

    #[test]
    fn test_fallback_to_ros_domain_id() {
        with_env(&[(ENV_ROS_DOMAIN_ID, "77")], || {
            assert_eq!(EnvConfig::from_env().domain_id, 77);
        });
        with_env(&[(ENV_DOMAIN_ID, "not-a-number"), (ENV_ROS_DOMAIN_ID, "5")], || {
            assert_eq!(EnvConfig::from_env().domain_id, 5);
        });
    }

    #[test]
    fn test_paths_and_log_level() {
        with_env(
            &[
                (ENV_LOG_LEVEL, "debug"),
                (ENV_CONFIG_FILE, "/etc/hdds/param.toml"),
                (ENV_GRAPH_FILE, ""),
            ],
            || {
                let config = EnvConfig::from_env();
                assert_eq!(config.log_level.as_deref(), Some("debug"));
                assert_eq!(
                    config.config_file,
                    Some(PathBuf::from("/etc/hdds/param.toml"))
                );
                assert!(config.graph_file.is_none());
            },
        );
    }
}
