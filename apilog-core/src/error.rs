use thiserror::Error;

/// Unified error type for apilog.
#[derive(Error, Debug)]
pub enum ApilogError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ApilogError {
    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            ApilogError::ConfigError(_) => 2,
            ApilogError::InvalidInput(_) => 3,
            ApilogError::Io(_) => 4,
            ApilogError::Serde(_) => 3,
        }
    }
}
