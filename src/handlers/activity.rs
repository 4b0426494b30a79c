use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::engine::{LogActivityInput, MobilityEngine};
use crate::errors::EngineError;
use crate::utils::identity::user_id_from_request;
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    mode: Option<String>,

    #[validate(range(min = 0.0, message = "Distance must be non-negative"))]
    distance_km: f64,

    start_point: Option<String>,
    end_point: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    description: String,
}

// POST /v1/activity
pub async fn log_activity(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
    payload: web::Json<ActivityRequest>,
) -> Result<HttpResponse, EngineError> {
    validate_payload(&*payload)?;
    let user_id = user_id_from_request(&req)?;

    let payload = payload.into_inner();
    let input = LogActivityInput {
        mode: payload.mode,
        distance_km: payload.distance_km,
        start_point: payload.start_point,
        end_point: payload.end_point,
        started_at: payload.started_at,
        ended_at: payload.ended_at,
        description: payload.description,
    };

    let log = engine.log_activity(user_id, input).await?;
    Ok(HttpResponse::Created().json(log))
}

// GET /v1/dashboard
pub async fn get_dashboard(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
) -> Result<HttpResponse, EngineError> {
    let user_id = user_id_from_request(&req)?;
    let snapshot = engine.get_dashboard(user_id).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}
