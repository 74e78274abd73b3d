//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (ServerConfig::default)
//!     → loader.rs (optional TOML file)
//!     → cli.rs (command-line overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::EngineConfig;
pub use schema::ListenerConfig;
pub use schema::Mode;
pub use schema::ServerConfig;
