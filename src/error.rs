use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Rewriter error: {0}")]
    Rewriter(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Mail error: {0}")]
    Mail(String),
}

impl AppError {
    /// A required setting is absent from both the config file and the environment.
    pub fn not_configured(key: &str) -> Self {
        AppError::Config(format!("{} is not configured", key))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
