use thiserror::Error;

use super::NetworkSection;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to parse network config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Network has no layers")]
    NoLayers,
    #[error("Invalid input shape {0:?}")]
    InvalidInputShape([usize; 3]),
    #[error("Invalid {section} layer {index}: {reason}")]
    InvalidLayer {
        section: NetworkSection,
        index: usize,
        reason: String,
    },
    #[error(
        "{section} layer {index} rescales by 1/255, inputs are already \
        normalized"
    )]
    EmbeddedNormalization {
        section: NetworkSection,
        index: usize,
    },
    #[error("Network must end in a dense layer with softmax activation")]
    MissingSoftmaxOutput,
}
