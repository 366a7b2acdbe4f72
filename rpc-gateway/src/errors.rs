use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use splitledger_core::Error as LedgerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Unhandled method: {0}")]
    UnknownMethod(String),

    #[error("Invalid params for {method}: {reason}")]
    InvalidParams { method: String, reason: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blocking task failed")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Ledger(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            GatewayError::Ledger(LedgerError::InvariantViolation(_)) => StatusCode::CONFLICT,
            GatewayError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::UnknownMethod(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidParams { .. } => StatusCode::BAD_REQUEST,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Blocking(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl GatewayError {
    fn error_type(&self) -> &str {
        match self {
            GatewayError::Ledger(err) if err.is_not_found() => "NOT_FOUND",
            GatewayError::Ledger(LedgerError::InvariantViolation(_)) => "INVARIANT_VIOLATION",
            GatewayError::Ledger(LedgerError::Persistence(_) | LedgerError::Io(_)) => {
                "PERSISTENCE_ERROR"
            }
            GatewayError::Ledger(_) => "LEDGER_ERROR",
            GatewayError::UnknownMethod(_) => "UNHANDLED_METHOD",
            GatewayError::InvalidParams { .. } => "JSON_UNMARSHAL_ERROR",
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::Serialization(_) => "SERIALIZATION_ERROR",
            GatewayError::Blocking(_) => "SERVICE_UNAVAILABLE",
        }
    }
}
