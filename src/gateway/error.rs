use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::{HighlightError, STATUS_HEADER};

/// Errors surfaced by the HTTP gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Highlight(#[from] HighlightError),

    #[error("no saved query for {hash}")]
    NotFound { hash: String },

    #[error("store error: {reason}")]
    Store { reason: String },
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, hilite_status) = match &self {
            GatewayError::Highlight(err) => match err {
                HighlightError::EmptyInput { .. } => (StatusCode::BAD_REQUEST, "empty_input"),
                HighlightError::InvalidCredentials { .. } => {
                    (StatusCode::UNAUTHORIZED, "invalid_credentials")
                }
                HighlightError::OracleRejected { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "oracle_rejected")
                }
                HighlightError::OracleUnavailable { .. } => {
                    (StatusCode::SERVICE_UNAVAILABLE, "oracle_unavailable")
                }
                HighlightError::Validation { .. } => (StatusCode::BAD_GATEWAY, "validation_error"),
                HighlightError::FlightAborted => (StatusCode::SERVICE_UNAVAILABLE, "flight_aborted"),
            },
            GatewayError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            GatewayError::Store { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            STATUS_HEADER,
            HeaderValue::from_str(hilite_status).unwrap_or(HeaderValue::from_static("error")),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
