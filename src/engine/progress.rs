use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::challenge::{Challenge, ChallengeGoalType, ChallengeScope, CompletionPolicy};
use crate::models::mobility::TransportMode;
use crate::store::Store;

/// Collaborator receiving group-challenge contributions, keyed by total CO2
/// saved. Invoked once per qualifying event, independently of the personal
/// membership loop, so either side can be tested in isolation.
#[async_trait]
pub trait GroupProgress: Send + Sync {
    async fn record_co2_saved(&self, user_id: Uuid, co2_saved_g: f64) -> Result<(), EngineError>;
}

/// Default sink for deployments without group challenges.
pub struct NoopGroupProgress;

#[async_trait]
impl GroupProgress for NoopGroupProgress {
    async fn record_co2_saved(&self, _user_id: Uuid, _co2_saved_g: f64) -> Result<(), EngineError> {
        Ok(())
    }
}

/// The progress a single event contributes toward one challenge goal.
pub fn increment_for(goal_type: ChallengeGoalType, co2_saved_g: f64, distance_km: f64) -> f64 {
    match goal_type {
        ChallengeGoalType::Co2Saved => co2_saved_g,
        ChallengeGoalType::DistanceKm => distance_km,
        ChallengeGoalType::TripCount => 1.0,
    }
}

fn challenge_matches(challenge: &Challenge, mode: TransportMode, now: DateTime<Utc>) -> bool {
    if !challenge.is_active_at(now) {
        return false;
    }
    // Group challenges flow through the GroupProgress delegate, not the
    // personal membership counters.
    if challenge.scope == ChallengeScope::Group {
        return false;
    }
    challenge.target_mode == TransportMode::Any || challenge.target_mode == mode
}

/// Applies one qualifying mobility event to every open membership of the
/// user. Increments are monotone counters, not recomputed aggregates: this
/// must be called exactly once per event or progress double-counts. A
/// storage failure is surfaced to the caller as a retryable error, never
/// swallowed.
pub async fn apply_event(
    store: &dyn Store,
    user_id: Uuid,
    mode: TransportMode,
    distance_km: f64,
    co2_saved_g: f64,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let memberships = store.open_memberships(user_id).await?;

    for membership in memberships {
        let challenge = match store.get_challenge(membership.challenge_id).await? {
            Some(challenge) => challenge,
            None => continue,
        };

        if !challenge_matches(&challenge, mode, now) {
            continue;
        }

        let increment = increment_for(challenge.goal_type, co2_saved_g, distance_km);
        if increment <= 0.0 {
            continue;
        }

        // AUTO challenges complete inside the same store update that
        // crosses the goal; MANUAL ones never auto-flip.
        let complete_at = match challenge.completion_policy {
            CompletionPolicy::Auto => Some(challenge.goal_target_value),
            CompletionPolicy::Manual => None,
        };

        store
            .bump_membership_progress(user_id, membership.challenge_id, increment, complete_at)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_follow_goal_type() {
        assert_eq!(increment_for(ChallengeGoalType::Co2Saved, 850.0, 5.0), 850.0);
        assert_eq!(increment_for(ChallengeGoalType::DistanceKm, 850.0, 5.0), 5.0);
        assert_eq!(increment_for(ChallengeGoalType::TripCount, 850.0, 5.0), 1.0);
        // Trip count is flat even for a zero-distance event.
        assert_eq!(increment_for(ChallengeGoalType::TripCount, 0.0, 0.0), 1.0);
    }
}
