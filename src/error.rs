//! Error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulsecamError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("diagnostic log error: {0}")]
    DiagIo(#[from] std::io::Error),
}
