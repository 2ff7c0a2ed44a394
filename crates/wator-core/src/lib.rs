//! Core types and configuration for the tiled Wa-Tor predator-prey engine.

pub mod types;
pub mod config;
pub mod error;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
