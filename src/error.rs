//! Error types for the registration node.
//!
//! Core sweep processing never fails — malformed points are policy-dropped —
//! so these variants cover only the node's edges: bag I/O and configuration.

use thiserror::Error;

/// Registration node error type.
#[derive(Error, Debug)]
pub enum MeghaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bag format error: {0}")]
    BagFormat(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<postcard::Error> for MeghaError {
    fn from(e: postcard::Error) -> Self {
        MeghaError::BagFormat(e.to_string())
    }
}

impl From<toml::de::Error> for MeghaError {
    fn from(e: toml::de::Error) -> Self {
        MeghaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MeghaError>;
