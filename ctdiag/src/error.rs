use thiserror::Error;

use crate::{
    ModelId,
    config::ConfigError,
    parameters::{HeaderLoadingError, ParameterLoaderError},
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),
    #[error("Unknown model \"{0}\", expected one of: kidney, chest")]
    UnknownModel(String),
    #[error("Unable to load model \"{model}\": {source}")]
    ModelLoad {
        model: ModelId,
        #[source]
        source: NetworkLoadError,
    },
    #[error("Shape mismatch: network expects {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Box<[usize]>,
        actual: Box<[usize]>,
    },
    #[error("Invalid prediction vector: {0}")]
    InvalidPredictionVector(#[from] PredictionVectorError),
}

/// Reasons a persisted network could not be turned into a usable handle.
#[derive(Debug, Error)]
pub enum NetworkLoadError {
    #[error("Weight file {0} not found")]
    WeightsNotFound(String),
    #[error("Failed to read weight file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid safetensors header: {0}")]
    Header(#[from] HeaderLoadingError),
    #[error("Weight file has no \"network_config\" metadata entry")]
    MissingNetworkConfig,
    #[error("Invalid network config: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid parameters: {0}")]
    Parameter(#[from] ParameterLoaderError),
    #[error(
        "Parameter \"{name}\" has shape {actual:?}, layer expects {expected:?}"
    )]
    ParameterShape {
        name: String,
        expected: Box<[usize]>,
        actual: Box<[usize]>,
    },
    #[error(
        "Network produces {actual} outputs but the label set has {expected}"
    )]
    LabelCountMismatch {
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictionVectorError {
    #[error("expected {expected} probabilities, got {actual}")]
    LengthMismatch {
        expected: usize,
        actual: usize,
    },
    #[error("probability at index {index} is not finite")]
    NonFinite {
        index: usize,
    },
}
