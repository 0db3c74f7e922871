// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NeuromarkError {
    #[error("Malformed image: {0}")]
    MalformedImage(String),

    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Analyzer failure: {0}")]
    AnalyzerFailure(String),

    #[error("Analyzer timed out after {}ms", .0.as_millis())]
    TimeoutExceeded(Duration),

    #[error("Inference service error: {0}")]
    Inference(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl NeuromarkError {
    fn category(&self) -> &'static str {
        match self {
            NeuromarkError::MalformedImage(_) => "Malformed image",
            NeuromarkError::CapabilityUnavailable(_) => "Capability unavailable",
            NeuromarkError::AnalyzerFailure(_) => "Analyzer failure",
            NeuromarkError::TimeoutExceeded(_) => "Analyzer timeout",
            NeuromarkError::Inference(_) => "Inference service error",
            NeuromarkError::ImageProcessing(_) => "Image processing error",
            NeuromarkError::Serialization(_) => "Data processing error",
            NeuromarkError::Validation(_) => "Validation error",
        }
    }
}

impl From<reqwest::Error> for NeuromarkError {
    fn from(e: reqwest::Error) -> Self {
        NeuromarkError::Inference(e.to_string())
    }
}

impl From<serde_json::Error> for NeuromarkError {
    fn from(e: serde_json::Error) -> Self {
        NeuromarkError::Serialization(e.to_string())
    }
}

impl ResponseError for NeuromarkError {
    fn status_code(&self) -> StatusCode {
        match self {
            NeuromarkError::MalformedImage(_) | NeuromarkError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            NeuromarkError::CapabilityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            NeuromarkError::AnalyzerFailure(_)
            | NeuromarkError::TimeoutExceeded(_)
            | NeuromarkError::Inference(_) => StatusCode::BAD_GATEWAY,
            NeuromarkError::ImageProcessing(_) | NeuromarkError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.category(),
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_image_is_a_client_error() {
        let err = NeuromarkError::MalformedImage("not a png".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Malformed image: not a png");
    }

    #[test]
    fn timeout_reports_budget_in_millis() {
        let err = NeuromarkError::TimeoutExceeded(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Analyzer timed out after 1500ms");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unavailable_capability_maps_to_503() {
        let err = NeuromarkError::CapabilityUnavailable("caption".into());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
