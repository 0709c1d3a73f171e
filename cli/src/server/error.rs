use std::time::Duration;

use rocket::{
    Request,
    http::Status,
    response::{self, Responder},
    serde::json::Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Error response of the diagnosis endpoints: a status code plus
/// `{"error": kind, "message": text}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: Status,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(
        status: Status,
        kind: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_base64(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, "invalid_base64", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Status::InternalServerError, "internal", message)
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            Status::GatewayTimeout,
            "timeout",
            format!(
                "prediction did not finish within {:.1}s",
                limit.as_secs_f64()
            ),
        )
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind.to_string(),
            message: self.message.clone(),
        }
    }
}

impl From<ctdiag::Error> for ApiError {
    fn from(error: ctdiag::Error) -> Self {
        let (status, kind) = match &error {
            ctdiag::Error::UnsupportedImage(_) => {
                (Status::BadRequest, "unsupported_image")
            },
            ctdiag::Error::UnknownModel(_) => {
                (Status::NotFound, "unknown_model")
            },
            ctdiag::Error::ModelLoad {
                ..
            } => (Status::ServiceUnavailable, "model_load"),
            ctdiag::Error::ShapeMismatch {
                ..
            } => (Status::InternalServerError, "shape_mismatch"),
            ctdiag::Error::InvalidPredictionVector(_) => {
                (Status::InternalServerError, "invalid_prediction_vector")
            },
        };
        Self::new(status, kind, error.to_string())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(
        self,
        request: &'r Request<'_>,
    ) -> response::Result<'static> {
        (self.status, Json(self.body())).respond_to(request)
    }
}
