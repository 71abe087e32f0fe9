//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::OrderLinesError;
use purchase::PurchaseError;
use serde::Serialize;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request body is not a usable order.
    BadRequest(String),
    /// The order could not be processed.
    Purchase(PurchaseError),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub critical_error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Purchase(err) => purchase_error_status(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Purchase(err) => {
                if status.is_server_error() {
                    tracing::error!(error = %err, kind = err.kind(), "purchase failed");
                }
                err.to_string()
            }
        };

        let body = ErrorReply {
            critical_error: message,
        };
        (status, Json(body)).into_response()
    }
}

fn purchase_error_status(err: &PurchaseError) -> StatusCode {
    match err {
        PurchaseError::Store(StoreError::NotFound(_)) => StatusCode::BAD_REQUEST,
        PurchaseError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        ApiError::Purchase(err)
    }
}

impl From<OrderLinesError> for ApiError {
    fn from(err: OrderLinesError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
