use serde::Serialize;

use crate::ModelId;

/// Diagnosis chosen for a single image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub model: ModelId,
    pub diagnosis: &'static str,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutput {
    pub prediction: Prediction,
    /// Every class of the model's label set with its probability, in label
    /// set order.
    pub probabilities: Vec<(&'static str, f32)>,
    pub stats: PredictionStats,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PredictionStats {
    // Seconds
    pub preprocessing_duration: f64,
    pub resolve_duration: f64,
    pub forward_pass_duration: f64,
    pub postprocessing_duration: f64,
    pub total_duration: f64,
}
