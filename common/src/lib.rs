pub mod bootstrap;
pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, ServerConfig};
pub use error::{Result, TelemetryError};
pub use types::*;
