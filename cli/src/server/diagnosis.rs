use std::time::Instant;

use base64::{Engine, engine::general_purpose::STANDARD};
use ctdiag::{ModelId, Prediction};
use rocket::{State, get, post, serde::json::Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{ApiError, DiagnosisState};

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    /// Base64 encoded image file. A `data:<mime>;base64,` prefix is accepted.
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    pub diagnosis: String,
    pub confidence: f32,
}

impl From<Prediction> for DiagnosisResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            diagnosis: prediction.diagnosis.to_string(),
            confidence: prediction.confidence,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: ModelId,
    pub weights: String,
    pub labels: Vec<String>,
    pub loaded: bool,
}

fn decode_payload(image: &str) -> Result<Vec<u8>, ApiError> {
    let payload = image.trim();
    let payload = payload
        .split_once(";base64,")
        .map_or(payload, |(_, data)| data);
    STANDARD
        .decode(payload)
        .map_err(|error| ApiError::invalid_base64(error.to_string()))
}

async fn diagnose(
    state: &DiagnosisState,
    model: ModelId,
    request: DiagnosisRequest,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    let id = Uuid::new_v4();
    info!(
        %id,
        %model,
        payload_len = request.image.len(),
        "Incoming diagnosis request"
    );

    let start_time = Instant::now();
    let result = match decode_payload(&request.image) {
        Ok(bytes) => state.predict(bytes, model).await,
        Err(error) => Err(error),
    };
    let processing_time = start_time.elapsed().as_secs_f64();

    match result {
        Ok(prediction) => {
            info!(
                %id,
                diagnosis = prediction.diagnosis,
                confidence = prediction.confidence,
                processing_time,
                "Sending diagnosis"
            );
            Ok(Json(prediction.into()))
        },
        Err(error) => {
            warn!(
                %id,
                status = error.status.code,
                kind = error.kind,
                message = %error.message,
                processing_time,
                "Diagnosis failed"
            );
            Err(error)
        },
    }
}

#[post("/kidney", data = "<request>")]
pub async fn handle_kidney(
    request: Json<DiagnosisRequest>,
    state: &State<DiagnosisState>,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    diagnose(state, ModelId::Kidney, request.into_inner()).await
}

#[post("/chest", data = "<request>")]
pub async fn handle_chest(
    request: Json<DiagnosisRequest>,
    state: &State<DiagnosisState>,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    diagnose(state, ModelId::Chest, request.into_inner()).await
}

/// Same contract as the fixed routes; `model` is a route name or weight stem.
#[post("/predict/<model>", data = "<request>")]
pub async fn handle_predict(
    model: &str,
    request: Json<DiagnosisRequest>,
    state: &State<DiagnosisState>,
) -> Result<Json<DiagnosisResponse>, ApiError> {
    let model: ModelId = model.parse().map_err(ApiError::from)?;
    diagnose(state, model, request.into_inner()).await
}

#[get("/models")]
pub fn handle_models(state: &State<DiagnosisState>) -> Json<Vec<ModelInfo>> {
    let resolver = state.pipeline.resolver();
    let models = ModelId::ALL
        .into_iter()
        .map(|model| ModelInfo {
            name: model,
            weights: model.weights_file_name(),
            labels: model
                .labels()
                .iter()
                .map(|label| label.to_string())
                .collect(),
            loaded: resolver.is_loaded(model),
        })
        .collect();
    Json(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload("iVBORw==").unwrap(), b"\x89PNG");
        assert_eq!(
            decode_payload(" data:image/png;base64,iVBORw==\n").unwrap(),
            b"\x89PNG"
        );
        let error = decode_payload("not base64!").unwrap_err();
        assert_eq!(error.kind, "invalid_base64");
    }
}
