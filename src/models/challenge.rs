use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

use crate::models::mobility::TransportMode;

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "challenge_scope")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeScope {
    #[sqlx(rename = "PERSONAL")]
    Personal,
    #[sqlx(rename = "GROUP")]
    Group,
}

/// AUTO challenges flip to completed the moment progress crosses the goal;
/// MANUAL challenges wait for an explicit completion call.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "completion_policy")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionPolicy {
    #[sqlx(rename = "AUTO")]
    Auto,
    #[sqlx(rename = "MANUAL")]
    Manual,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "challenge_goal_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeGoalType {
    #[sqlx(rename = "CO2_SAVED")]
    Co2Saved,
    #[sqlx(rename = "DISTANCE_KM")]
    DistanceKm,
    #[sqlx(rename = "TRIP_COUNT")]
    TripCount,
}

/// A challenge definition. Immutable after creation; replaced wholesale on
/// re-seed rather than edited in place.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Challenge {
    pub challenge_id: Uuid,
    pub title: String,
    pub description: String,
    pub scope: ChallengeScope,
    pub completion_policy: CompletionPolicy,
    pub target_mode: TransportMode,
    pub goal_type: ChallengeGoalType,
    pub goal_target_value: f64,
    pub start_at: chrono::DateTime<Utc>,
    pub end_at: chrono::DateTime<Utc>,
    pub reward: String,
    pub created_by: Option<Uuid>,
    pub created_at: chrono::DateTime<Utc>,
}

impl Challenge {
    /// Active window is half-open: [start_at, end_at).
    pub fn is_active_at(&self, now: chrono::DateTime<Utc>) -> bool {
        self.start_at <= now && now < self.end_at
    }
}

/// One user's enrollment in one challenge. `progress` only ever grows and
/// `is_completed` transitions false -> true exactly once.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct ChallengeMembership {
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub progress: f64,
    pub is_completed: bool,
    pub joined_at: chrono::DateTime<Utc>,
}

/// Challenge list item as the UI and chatbot consume it: the definition
/// plus the requesting user's enrollment state.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeView {
    pub challenge_id: Uuid,
    pub title: String,
    pub description: String,
    pub scope: ChallengeScope,
    pub completion_policy: CompletionPolicy,
    pub target_mode: TransportMode,
    pub goal_type: ChallengeGoalType,
    pub goal_target_value: f64,
    pub reward: String,
    pub is_joined: bool,
    pub is_completed: bool,
    pub progress: f64,
}
