// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Collector tuning for the `list` verb.
//!
//! ```toml
//! call_timeout_ms = 2000
//! dispatch_deadline_ms = 10000
//!
//! [on_timeout]
//! policy = "retry"
//! attempts = 2
//! ```

use crate::collector::{CollectorConfig, TimeoutPolicy};
use crate::helpers::Timeout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `list` verb configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListConfig {
    /// Longest wait for graph events between dispatch rounds.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Per-call reply timeout.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Give up on services that never become ready (absent: wait forever).
    #[serde(default)]
    pub dispatch_deadline_ms: Option<u64>,

    /// First readiness re-check delay.
    #[serde(default = "default_readiness_backoff_ms")]
    pub readiness_backoff_ms: u64,

    /// How long `--param-type` waits for `describe_parameters`.
    #[serde(default = "default_describe_wait_ms")]
    pub describe_wait_ms: u64,

    /// Reply timeout of the `--param-type` lookup (absent: wait forever).
    #[serde(default)]
    pub describe_timeout_ms: Option<u64>,

    /// Policy for calls without a reply.
    #[serde(default)]
    pub on_timeout: TimeoutPolicy,

    /// Log level.
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

fn default_call_timeout_ms() -> u64 {
    1000
}

fn default_readiness_backoff_ms() -> u64 {
    50
}

fn default_describe_wait_ms() -> u64 {
    5000
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            dispatch_deadline_ms: None,
            readiness_backoff_ms: default_readiness_backoff_ms(),
            describe_wait_ms: default_describe_wait_ms(),
            describe_timeout_ms: None,
            on_timeout: TimeoutPolicy::default(),
            log_level: None,
        }
    }
}

impl ListConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeouts = [
            ("poll_timeout_ms", self.poll_timeout_ms),
            ("call_timeout_ms", self.call_timeout_ms),
            ("readiness_backoff_ms", self.readiness_backoff_ms),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", field)));
            }
        }

        let unbounded = [
            ("dispatch_deadline_ms", self.dispatch_deadline_ms),
            ("describe_timeout_ms", self.describe_timeout_ms),
        ];
        for (field, value) in unbounded {
            if value == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive (omit it to wait forever)",
                    field
                )));
            }
        }

        if let TimeoutPolicy::Retry { attempts: 0 } = self.on_timeout {
            return Err(ConfigError::Invalid(
                "Retry policy needs at least one attempt".into(),
            ));
        }

        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn describe_wait(&self) -> Duration {
        Duration::from_millis(self.describe_wait_ms)
    }

    pub fn describe_timeout(&self) -> Timeout {
        self.describe_timeout_ms
            .map_or(Timeout::Infinite, |ms| Timeout::After(Duration::from_millis(ms)))
    }

    /// Collector settings derived from this configuration.
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            call_timeout: self.call_timeout(),
            dispatch_deadline: self.dispatch_deadline_ms.map(Duration::from_millis),
            readiness_backoff: Duration::from_millis(self.readiness_backoff_ms),
            on_timeout: self.on_timeout,
        }
    }
}
