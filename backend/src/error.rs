use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use cropguard_shared::ApiFailure;

use crate::inference::InferenceError;

/// Failures surfaced to HTTP clients. The display text is exactly what the
/// client sees; internal causes are only logged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("File size must be under 10MB")]
    PayloadTooLarge,
    #[error("Model loading failed. Please try again.")]
    ModelUnavailable,
    #[error("Prediction failed. Please try again.")]
    Prediction(#[from] InferenceError),
    #[error("Prediction failed. Please try again.")]
    Blocking(#[from] BlockingError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelUnavailable | ApiError::Prediction(_) | ApiError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {:?}", self);
        } else {
            log::info!("Rejected request: {}", self);
        }

        let mut body = ApiFailure::new(self.to_string());
        if let ApiError::PayloadTooLarge = self {
            body = body.with_status(status.as_u16());
        }
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_causes_are_not_exposed() {
        let err = ApiError::from(InferenceError::Model("CUDA error: device-side assert".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Prediction failed. Please try again.");
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::validation("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            ApiError::ModelUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
