#[cfg(test)]
#[macro_use]
extern crate is_close;

pub mod config;

pub mod data_type;
pub use data_type::DataType;

pub mod error;
pub use error::{Error, NetworkLoadError, PredictionVectorError, Result};

pub mod inference;
pub use inference::infer;

pub mod model;
pub use model::ModelId;

pub mod network;
pub use network::{Network, SequentialNetwork};

pub mod parameters;

pub mod prediction;
pub use prediction::{
    Prediction, PredictionOutput, PredictionPipeline, PredictionStats, parse,
};

pub mod preprocessing;
pub use preprocessing::ImagePreprocessor;

pub mod resolver;
pub use resolver::ModelResolver;

pub mod storage;
