use crate::{ModelId, PredictionVectorError, Result};

use super::Prediction;

/// Picks the most probable class of `model`'s label set.
///
/// Ties resolve to the lowest index.
pub fn parse(
    probabilities: &[f32],
    model: ModelId,
) -> Result<Prediction> {
    let labels = model.labels();
    if probabilities.len() != labels.len() {
        return Err(PredictionVectorError::LengthMismatch {
            expected: labels.len(),
            actual: probabilities.len(),
        }
        .into());
    }
    if let Some(index) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(PredictionVectorError::NonFinite {
            index,
        }
        .into());
    }

    let mut best = 0;
    for (index, &probability) in probabilities.iter().enumerate().skip(1) {
        if probability > probabilities[best] {
            best = index;
        }
    }

    Ok(Prediction {
        model,
        diagnosis: labels[best],
        confidence: probabilities[best],
    })
}
