//! HTTP mapping for everything that can go wrong while serving a request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use event_store::EventStoreError;

/// Errors surfaced by route handlers.
///
/// Every variant renders as a `{"error": "..."}` JSON body with the status
/// chosen by [`status_and_message`](ApiError::status_and_message).
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Domain(DomainError),
    Internal(String),
}

impl ApiError {
    /// The status-code policy, in one place:
    ///
    /// * validation failures (bad quantities or prices, blank fields) are 400
    /// * unknown orders and absent line items are 404
    /// * state-machine violations, duplicate creates, and concurrency
    ///   conflicts that outlast the retry budget are 409
    /// * slot timeouts are 503, telling callers to back off and retry
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::Domain(err) => {
                let status = match &err {
                    DomainError::Order(order_err) => match order_err {
                        OrderError::InvalidQuantity { .. }
                        | OrderError::InvalidPrice { .. }
                        | OrderError::BlankTrackingNumber
                        | OrderError::BlankCancellationReason
                        | OrderError::BlankShippingAddress => StatusCode::BAD_REQUEST,
                        OrderError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
                        OrderError::InvalidStateTransition { .. }
                        | OrderError::NoItems
                        | OrderError::AlreadyCreated => StatusCode::CONFLICT,
                    },
                    DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                    DomainError::AlreadyExists { .. } => StatusCode::CONFLICT,
                    DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
                        StatusCode::CONFLICT
                    }
                    DomainError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
