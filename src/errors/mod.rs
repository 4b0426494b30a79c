use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Caller's fault: bad mode, negative distance, malformed point,
    /// goal not reached yet. Never retried.
    Validation(String),
    /// Unknown user/challenge, or the user is not a member.
    NotFound(String),
    /// Duplicate join, already-completed challenge.
    Conflict(String),
    /// Storage-layer failure; the enclosing unit of work was aborted and
    /// the caller may retry.
    Persistence(String),
    /// A reference dataset is unavailable; classification degrades rather
    /// than failing the whole request.
    UpstreamUnavailable(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "Validation: {}", msg),
            EngineError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            EngineError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            EngineError::Persistence(msg) => write!(f, "Persistence: {}", msg),
            EngineError::UpstreamUnavailable(msg) => write!(f, "Upstream Unavailable: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Persistence(err.to_string())
    }
}

impl ResponseError for EngineError {
    fn error_response(&self) -> HttpResponse {
        match self {
            EngineError::Validation(msg) => HttpResponse::BadRequest().json(ErrorResponse { error: msg.clone() }),
            EngineError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse { error: msg.clone() }),
            EngineError::Conflict(msg) => HttpResponse::Conflict().json(ErrorResponse { error: msg.clone() }),
            EngineError::Persistence(msg) => HttpResponse::InternalServerError().json(ErrorResponse { error: msg.clone() }),
            EngineError::UpstreamUnavailable(msg) => HttpResponse::ServiceUnavailable().json(ErrorResponse { error: msg.clone() }),
        }
    }
}
