use std::time::Duration;

use ctdiag::{ModelId, Prediction, PredictionPipeline};
use tokio::time::timeout;

use super::ApiError;

/// Shared by every request handler.
pub struct DiagnosisState {
    pub pipeline: PredictionPipeline,
    pub timeout: Duration,
}

impl DiagnosisState {
    pub fn new(
        pipeline: PredictionPipeline,
        timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            timeout,
        }
    }

    /// Runs the pipeline on tokio's blocking pool, bounded by `timeout`.
    ///
    /// On timeout the blocking task keeps running to completion; only the
    /// response is abandoned.
    pub async fn predict(
        &self,
        bytes: Vec<u8>,
        model: ModelId,
    ) -> Result<Prediction, ApiError> {
        let pipeline = self.pipeline.clone();
        let task = tokio::task::spawn_blocking(move || {
            pipeline.predict_bytes(&bytes, model)
        });
        match timeout(self.timeout, task).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(join_error)) => {
                Err(ApiError::internal(join_error.to_string()))
            },
            Err(_) => Err(ApiError::timeout(self.timeout)),
        }
    }
}
