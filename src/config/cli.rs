//! Command-line flags.
//!
//! Flags override values from the configuration file, which override defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{Mode, ServerConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "pgsocket-server")]
#[command(version, about = "Serve an embedded SQL engine over the PostgreSQL wire protocol", long_about = None)]
pub struct Cli {
    /// Database location: memory:// or a data directory [default: memory://]
    #[arg(short = 'd', long = "db", value_name = "DATABASE")]
    pub db: Option<String>,

    /// Port to listen on [default: 5432]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind [default: 127.0.0.1]
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Debug logging and engine message tracing
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where the encryption request is intercepted [default: socket]
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,
}

impl Cli {
    /// Build the effective configuration: defaults, then file, then flags.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(db) = &self.db {
            config.engine.data_dir = db.clone();
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(host) = &self.host {
            config.listener.host = host.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.verbose {
            config.observability.log_level = "debug".to_string();
            config.engine.debug = true;
        }
    }
}
