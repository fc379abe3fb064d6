use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("No commits found")]
    NoCommitsFound,

    #[error("Invalid time window: start must be before end")]
    InvalidWindow,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown locale: {0}")]
    InvalidLocale(String),

    #[error("Git error: {0}")]
    GitError(#[from] git2::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Config error: {0}")]
    ConfigError(String),
}
