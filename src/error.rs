//! Error types for Quizdesk

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'quizdesk init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Message extracted from the server response, shown to the user as-is
    #[error("{0}")]
    LoginFailed(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Not authenticated. Run 'quizdesk login' first.")]
    NotAuthenticated,

    /// Message extracted from a failed resource request
    #[error("{0}")]
    Request(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
