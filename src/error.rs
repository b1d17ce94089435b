use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Chain read failed: {0}")]
    ChainRead(String),

    #[error("Detail read failed for service #{id}: {reason}")]
    DetailRead { id: u64, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndexerError {
    pub fn detail(id: u64, reason: impl ToString) -> Self {
        IndexerError::DetailRead {
            id,
            reason: reason.to_string(),
        }
    }

    /// Errors after which the process must not keep serving stale writes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IndexerError::Storage(_) | IndexerError::Serialization(_)
        )
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl IntoResponse for IndexerError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();

        let (status, error_code) = match &self {
            IndexerError::ChainRead(_) | IndexerError::DetailRead { .. } => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            IndexerError::Storage(_) | IndexerError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id,
        };

        tracing::error!(
            error = ?self,
            error_code = error_code,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}
