use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sample source error: {0}")]
    Source(String),

    #[error("Capture error: {0}")]
    Capture(#[from] std::io::Error),

    #[error("Block length mismatch: expected {expected} samples, got {actual}")]
    BlockLength { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
