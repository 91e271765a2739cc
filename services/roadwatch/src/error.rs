//! Error types for the roadwatch console

/// Errors that can occur in the roadwatch console
#[derive(Debug, thiserror::Error)]
pub enum RoadwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Feed connection failed: {0}")]
    FeedConnection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for roadwatch operations
pub type Result<T> = std::result::Result<T, RoadwatchError>;
