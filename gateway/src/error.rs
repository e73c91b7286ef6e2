use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracechain_common::ProductError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Contract(#[from] ProductError),

    #[error("contract returned an unreadable payload: {0}")]
    Payload(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Contract(err) => match err {
                ProductError::MalformedInput(_)
                | ProductError::MissingField(_)
                | ProductError::UnknownTransaction(_)
                | ProductError::ArgumentCount { .. }
                | ProductError::ReadOnly(_) => StatusCode::BAD_REQUEST,
                ProductError::NotFound(_) => StatusCode::NOT_FOUND,
                ProductError::AlreadyExists(_) => StatusCode::CONFLICT,
                ProductError::CorruptRecord { .. }
                | ProductError::Encode(_)
                | ProductError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatewayError::Payload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
