use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use hongbao_engine::EngineError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Engine(e) => match e {
                EngineError::InvalidAmount { .. } | EngineError::InvalidSlots { .. } => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                EngineError::InsufficientBalance => {
                    (StatusCode::PAYMENT_REQUIRED, e.to_string())
                }
                EngineError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
                EngineError::Expired
                | EngineError::AlreadyClaimed
                | EngineError::FullyClaimed => (StatusCode::CONFLICT, e.to_string()),
                EngineError::Contended => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
                EngineError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
