use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),
    #[error("operation mismatch: expected {expected}, got {found:?}")]
    OperationMismatch { expected: &'static str, found: String },
    #[error("cookie value is required")]
    EmptyCookie,
    #[error("invalid qty parameter: {0:?}")]
    InvalidQty(String),
}
