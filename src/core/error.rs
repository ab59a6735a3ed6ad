use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Execution failure: {0}")]
    ExecutionFailure(String),

    #[error("Benchmark cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl BenchError {
    /// Returns `true` if the run was stopped on request rather than by a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BenchError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
