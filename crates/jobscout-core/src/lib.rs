//! Shared foundation for the jobscout workspace.
//!
//! Defines the error taxonomy, TOML configuration, and the domain types
//! exchanged between the listings client, the completion service, the
//! storage layer, and the chat engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::JobscoutConfig;
pub use error::{JobscoutError, Result};
