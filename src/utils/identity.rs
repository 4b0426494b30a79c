use actix_web::HttpRequest;
use uuid::Uuid;

use crate::errors::EngineError;

/// The host's auth middleware resolves the caller and forwards the user id
/// in this header; the engine never sees credentials.
pub const USER_ID_HEADER: &str = "X-User-Id";

pub fn user_id_from_request(req: &HttpRequest) -> Result<Uuid, EngineError> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| EngineError::Validation("Missing X-User-Id header".to_string()))?;

    Uuid::parse_str(raw).map_err(|_| EngineError::Validation("X-User-Id must be a UUID".to_string()))
}
