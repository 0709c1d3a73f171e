use std::io;

use inquire::InquireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Diagnosis(#[from] ctdiag::Error),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Prompt(#[from] InquireError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Failed to start the async runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("Server failed: {0}")]
    Launch(String),
}

pub type CliResult<T> = Result<T, CliError>;
