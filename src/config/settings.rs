// Configuration structs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_NREPL_URL, DEFAULT_POLL_INTERVAL_MS, GREETING_EXPR,
};
use crate::nrepl::ConnectOptions;

/// Console message filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Color exception/error lines like stderr output
    #[serde(default = "default_true")]
    pub error_highlighting: bool,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            error_highlighting: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_url() -> String {
    DEFAULT_NREPL_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_greeting() -> String {
    GREETING_EXPR.to_string()
}

/// Settings for REPL sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplConfig {
    /// nREPL server, e.g. "nrepl://localhost:54050"
    #[serde(default = "default_url")]
    pub url: String,

    /// TCP connect timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Reply read timeout in seconds (0 = wait for the server indefinitely)
    #[serde(default)]
    pub read_timeout_secs: u64,

    /// Probe the server with a `describe` op after connecting
    #[serde(default = "default_true")]
    pub handshake: bool,

    /// Evaluate `greeting` when a session opens and show its result
    #[serde(default = "default_true")]
    pub greeting_enabled: bool,

    /// Banner expression
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Idle poll interval of the process handler's reader thread
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound for write_to_current_repl (0 = no limit)
    #[serde(default)]
    pub sync_timeout_secs: u64,

    /// Enable debug logging for troubleshooting
    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default)]
    pub filters: FiltersConfig,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_secs: 0,
            handshake: true,
            greeting_enabled: true,
            greeting: default_greeting(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            sync_timeout_secs: 0,
            debug_logging: false,
            filters: FiltersConfig::default(),
        }
    }
}

impl ReplConfig {
    /// Defaults pointed at a specific server.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!(
                "nREPL url is empty\n\n\
                 Set it in ~/.nrepl-bridge/config.toml:\n  \
                 url = \"nrepl://localhost:54050\""
            );
        }
        if self.connect_timeout_ms == 0 {
            anyhow::bail!("connect_timeout_ms must be greater than zero");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.greeting_enabled && self.greeting.trim().is_empty() {
            anyhow::bail!("greeting is enabled but the greeting expression is empty");
        }
        Ok(())
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: non_zero_secs(self.read_timeout_secs),
            handshake: self.handshake,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn sync_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.sync_timeout_secs)
    }

    /// Greeting expression, if enabled.
    pub fn greeting_expr(&self) -> Option<&str> {
        self.greeting_enabled.then_some(self.greeting.as_str())
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
