use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrobbleError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Remote API error: {0}")]
    RemoteApi(String),

    #[error("Failed to parse response: {0}")]
    JsonParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl From<core_runtime::Error> for ScrobbleError {
    fn from(err: core_runtime::Error) -> Self {
        ScrobbleError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScrobbleError>;
