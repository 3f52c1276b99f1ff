use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host cannot provide the capability at all
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
