use thiserror::Error;

pub type Result<T> = std::result::Result<T, IafsError>;

#[derive(Error, Debug)]
pub enum IafsError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("FUSE error: {0}")]
    Fuse(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),
}

impl From<serde_json::Error> for IafsError {
    fn from(err: serde_json::Error) -> Self {
        IafsError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for IafsError {
    fn from(err: reqwest::Error) -> Self {
        IafsError::Http(err.to_string())
    }
}

impl From<csv::Error> for IafsError {
    fn from(err: csv::Error) -> Self {
        IafsError::Csv(err.to_string())
    }
}
