//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file. Every
//! field has a default so an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::embedded::MEMORY_DATA_DIR;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Which front-end intercepts the negotiation request.
    pub mode: Mode,

    /// Listener configuration (host, port, limits).
    pub listener: ListenerConfig,

    /// Engine settings.
    pub engine: EngineConfig,

    /// Preamble shim settings.
    pub preamble: PreambleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Front-end selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Inspect the first bytes of each socket before the session starts.
    #[default]
    Socket,
    /// Intercept the request at the engine's raw-message entry point.
    Call,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Socket => write!(f, "socket"),
            Mode::Call => write!(f, "call"),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// TCP port (0 picks an ephemeral port).
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// How long shutdown waits for open connections.
    pub drain_timeout_secs: u64,
}

impl ListenerConfig {
    /// `host:port` as accepted by `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            max_connections: 1_000,
            drain_timeout_secs: 10,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `memory://` or a data directory path.
    pub data_dir: String,

    /// Log every raw message the engine executes.
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: MEMORY_DATA_DIR.to_string(),
            debug: false,
        }
    }
}

/// Preamble shim configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PreambleConfig {
    /// Close connections that do not deliver the first 8 bytes in time.
    /// Unset means wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl PreambleConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9187".to_string(),
        }
    }
}
