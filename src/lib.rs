//! Host for the federated search aggregator: TOML configuration,
//! command-line arguments and result rendering for the `fedsearch` binary.

pub mod cli;
pub mod config;
pub mod error;
pub mod render;

pub use config::AppConfig;
pub use error::{AppError, Result};
