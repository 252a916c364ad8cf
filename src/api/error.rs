use super::dto::ErrorResponse;
use crate::rebalance::RebalanceError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn missing_parameters() -> Self {
        Self::bad_request("Missing required parameters.")
    }
}

impl From<RebalanceError> for ApiError {
    fn from(err: RebalanceError) -> Self {
        let detail = err.detail();
        let api = match &err {
            RebalanceError::InvalidRequest(_) | RebalanceError::PriceUnavailable { .. } => {
                ApiError::bad_request(err.to_string())
            }
            RebalanceError::Gateway(_) => ApiError::internal(err.to_string()),
            RebalanceError::ExecutionFailed { stage, .. } => {
                return ApiError::internal(err.to_string()).with_details(json!({
                    "stage": stage,
                    "funds_redeemed": err.funds_redeemed(),
                    "exchange": detail,
                }));
            }
        };
        match detail {
            Some(detail) => api.with_details(Value::String(detail)),
            None => api,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Malformed request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.message, self.details));
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}
