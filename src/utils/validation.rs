use validator::Validate;

use crate::errors::EngineError;

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), EngineError> {
    payload
        .validate()
        .map_err(|err| EngineError::Validation(err.to_string()))
}
