use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::engine::{MobilityEngine, NewChallenge};
use crate::errors::EngineError;
use crate::models::challenge::{ChallengeGoalType, ChallengeScope, CompletionPolicy};
use crate::models::mobility::TransportMode;
use crate::utils::identity::user_id_from_request;
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeCreateRequest {
    #[validate(length(min = 1, max = 120, message = "Title must be between 1 and 120 characters"))]
    title: String,

    #[serde(default)]
    description: String,

    scope: ChallengeScope,
    completion_policy: CompletionPolicy,
    target_mode: String,
    goal_type: ChallengeGoalType,

    #[validate(range(min = 0.000001, message = "Goal target value must be positive"))]
    goal_target_value: f64,

    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,

    #[serde(default)]
    reward: String,
}

// POST /v1/challenges
pub async fn create_challenge(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
    payload: web::Json<ChallengeCreateRequest>,
) -> Result<HttpResponse, EngineError> {
    validate_payload(&*payload)?;
    let user_id = user_id_from_request(&req)?;

    let payload = payload.into_inner();
    let target_mode = TransportMode::from_str(&payload.target_mode).map_err(EngineError::Validation)?;

    let challenge = engine
        .create_challenge(NewChallenge {
            title: payload.title,
            description: payload.description,
            scope: payload.scope,
            completion_policy: payload.completion_policy,
            target_mode,
            goal_type: payload.goal_type,
            goal_target_value: payload.goal_target_value,
            start_at: payload.start_at,
            end_at: payload.end_at,
            reward: payload.reward,
            created_by: Some(user_id),
        })
        .await?;
    Ok(HttpResponse::Created().json(challenge))
}

// GET /v1/challenges
pub async fn list_challenges(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
) -> Result<HttpResponse, EngineError> {
    let user_id = user_id_from_request(&req)?;
    let challenges = engine.list_challenges(user_id).await?;
    Ok(HttpResponse::Ok().json(challenges))
}

// POST /v1/challenges/{challengeId}/join
pub async fn join_challenge(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
    challenge_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let user_id = user_id_from_request(&req)?;
    let membership = engine.join_challenge(user_id, *challenge_id).await?;
    Ok(HttpResponse::Created().json(membership))
}

// POST /v1/challenges/{challengeId}/complete
pub async fn complete_challenge(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
    challenge_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let user_id = user_id_from_request(&req)?;
    let membership = engine.complete_challenge(user_id, *challenge_id).await?;
    Ok(HttpResponse::Ok().json(membership))
}

// GET /v1/challenges/{challengeId}/progress
pub async fn challenge_progress(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
    challenge_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let user_id = user_id_from_request(&req)?;
    let progress = engine.challenge_progress(user_id, *challenge_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "progress": progress })))
}

// GET /v1/achievements
pub async fn get_achievements(
    req: HttpRequest,
    engine: web::Data<MobilityEngine>,
) -> Result<HttpResponse, EngineError> {
    let user_id = user_id_from_request(&req)?;
    let achievements = engine.achievements(user_id).await?;
    Ok(HttpResponse::Ok().json(achievements))
}
