//! Configuration for the broker daemon.

use std::net::SocketAddr;
use std::path::Path;

use beanq_core::{DEFAULT_LISTEN_ADDR, DEFAULT_MAX_JOB_SIZE, DEFAULT_MAX_LINE_LEN, Limits};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Input limits applied to every connection.
    pub limits: LimitsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP address to accept clients on.
    pub listen: SocketAddr,
}

/// Per-connection input limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest job body a `put` may declare, in bytes.
    pub max_job_size: u32,
    /// Longest command line, terminator included.
    pub max_line_len: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3333))),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_job_size: DEFAULT_MAX_JOB_SIZE,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Convert the limits section into the core's [`Limits`].
    pub fn to_limits(&self) -> Limits {
        Limits {
            max_job_size: self.limits.max_job_size,
            // A cap below "quit\r\n" would reject every command.
            max_line_len: self.limits.max_line_len.max(8),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
