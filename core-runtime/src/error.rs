use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing setting: {key} must be set in the environment or .env file")]
    MissingSetting { key: String },
}

pub type Result<T> = std::result::Result<T, Error>;
