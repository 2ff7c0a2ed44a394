//! Error types for the engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Invalid value for option {key}: {value}")]
    InvalidOption { key: String, value: f64 },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Population of {requested} entities does not fit in {cells} cells")]
    Overpopulated { requested: usize, cells: usize },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
