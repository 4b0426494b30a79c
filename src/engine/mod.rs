pub mod classifier;
pub mod dashboard;
pub mod emissions;
pub mod ledger;
pub mod progress;

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::geo::GeoLookup;
use crate::models::achievement::AchievementView;
use crate::models::challenge::{
    Challenge, ChallengeGoalType, ChallengeMembership, ChallengeScope, ChallengeView,
    CompletionPolicy,
};
use crate::models::mobility::{CreditLedgerEntry, CreditType, MobilityLog, TransportMode};
use crate::store::Store;

use dashboard::DashboardSnapshot;
use progress::GroupProgress;

/// Caller-supplied description of one trip. Mode is optional; when absent
/// the engine infers it from position and speed.
#[derive(Debug, Clone, Default)]
pub struct LogActivityInput {
    pub mode: Option<String>,
    pub distance_km: f64,
    pub start_point: Option<String>,
    pub end_point: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub description: String,
}

/// Parameters for challenge creation (seeding or AI-assisted generation).
#[derive(Debug, Clone)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub scope: ChallengeScope,
    pub completion_policy: CompletionPolicy,
    pub target_mode: TransportMode,
    pub goal_type: ChallengeGoalType,
    pub goal_target_value: f64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reward: String,
    pub created_by: Option<Uuid>,
}

/// The Mobility Ledger & Challenge Progress Engine: turns one raw movement
/// observation into a classified mode, an immutable ledger entry, and
/// exactly-once progress updates across the user's active challenges.
pub struct MobilityEngine {
    store: Arc<dyn Store>,
    geo: Arc<GeoLookup>,
    config: EngineConfig,
    group: Arc<dyn GroupProgress>,
}

impl MobilityEngine {
    pub fn new(
        store: Arc<dyn Store>,
        geo: Arc<GeoLookup>,
        config: EngineConfig,
        group: Arc<dyn GroupProgress>,
    ) -> Self {
        MobilityEngine { store, geo, config, group }
    }

    /// Logs one activity: resolves the mode, computes emissions, appends
    /// the log + credit entry atomically, then advances challenge progress.
    pub async fn log_activity(
        &self,
        user_id: Uuid,
        input: LogActivityInput,
    ) -> Result<MobilityLog, EngineError> {
        self.require_user(user_id).await?;

        if input.distance_km < 0.0 || !input.distance_km.is_finite() {
            return Err(EngineError::Validation("Distance must be a non-negative number".to_string()));
        }

        let mode = self.resolve_mode(&input)?;
        let outcome = emissions::compute(&self.config, mode, input.distance_km);
        let log = ledger::write(self.store.as_ref(), user_id, mode, &input, &outcome).await?;

        if outcome.co2_saved_g > 0.0 || input.distance_km > 0.0 {
            self.group.record_co2_saved(user_id, outcome.co2_saved_g).await?;
            progress::apply_event(
                self.store.as_ref(),
                user_id,
                mode,
                input.distance_km,
                outcome.co2_saved_g,
                Utc::now(),
            )
            .await?;
        }

        Ok(log)
    }

    /// Explicit (manual) completion. AUTO challenges can be checked this way
    /// too, but are rejected until their accumulated progress reaches the
    /// goal; they are never force-completed early.
    pub async fn complete_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<ChallengeMembership, EngineError> {
        let challenge = self
            .store
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Challenge not found".to_string()))?;

        let membership = self
            .store
            .get_membership(user_id, challenge_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User is not a member of this challenge".to_string()))?;

        if membership.is_completed {
            return Err(EngineError::Conflict("Challenge is already completed".to_string()));
        }

        if challenge.completion_policy == CompletionPolicy::Auto
            && membership.progress < challenge.goal_target_value
        {
            let percent = if challenge.goal_target_value > 0.0 {
                membership.progress / challenge.goal_target_value * 100.0
            } else {
                0.0
            };
            return Err(EngineError::Validation(format!(
                "Challenge not yet 100% completed. Current progress: {:.1}%",
                percent
            )));
        }

        // The achievement code is stable per challenge, so the grant stays
        // idempotent across users and repeat attempts.
        let code = format!("CHALLENGE_COMPLETE_{}", challenge.challenge_id);
        let title = format!("{} complete", challenge.title);
        let description = format!("Successfully completed the '{}' challenge!", challenge.title);

        // A reward string with no parsable point value is tolerated: the
        // completion stands, the credit is skipped.
        let credit = match reward_points(&challenge.reward) {
            Some(points) if points > 0 => Some(CreditLedgerEntry {
                entry_id: Uuid::new_v4(),
                user_id,
                ref_log_id: None,
                entry_type: CreditType::Earn,
                points,
                reason: format!("Challenge '{}' completion reward", challenge.title),
                created_at: Utc::now(),
            }),
            _ => {
                warn!(
                    "Could not parse reward points from '{}' for challenge {}",
                    challenge.reward, challenge.challenge_id
                );
                None
            }
        };

        // Flag flip, achievement grant and reward credit land in one store
        // unit of work; a storage failure leaves the membership claimable.
        self.store
            .finalize_completion(user_id, challenge_id, &code, &title, &description, credit)
            .await
    }

    pub async fn join_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<ChallengeMembership, EngineError> {
        self.require_user(user_id).await?;
        self.store
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Challenge not found".to_string()))?;

        let membership = ChallengeMembership {
            user_id,
            challenge_id,
            progress: 0.0,
            is_completed: false,
            joined_at: Utc::now(),
        };
        self.store.insert_membership(membership).await
    }

    pub async fn challenge_progress(&self, user_id: Uuid, challenge_id: Uuid) -> Result<f64, EngineError> {
        self.store
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("Challenge not found".to_string()))?;
        let membership = self
            .store
            .get_membership(user_id, challenge_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User is not a member of this challenge".to_string()))?;
        Ok(membership.progress)
    }

    pub async fn create_challenge(&self, new: NewChallenge) -> Result<Challenge, EngineError> {
        if new.title.trim().is_empty() {
            return Err(EngineError::Validation("Challenge title cannot be empty".to_string()));
        }
        if new.goal_target_value <= 0.0 || !new.goal_target_value.is_finite() {
            return Err(EngineError::Validation("Goal target value must be positive".to_string()));
        }
        if new.start_at >= new.end_at {
            return Err(EngineError::Validation("Challenge window must end after it starts".to_string()));
        }

        let challenge = Challenge {
            challenge_id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            scope: new.scope,
            completion_policy: new.completion_policy,
            target_mode: new.target_mode,
            goal_type: new.goal_type,
            goal_target_value: new.goal_target_value,
            start_at: new.start_at,
            end_at: new.end_at,
            reward: new.reward,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.store.insert_challenge(challenge).await
    }

    /// Challenge list with the requesting user's enrollment state per row.
    pub async fn list_challenges(&self, user_id: Uuid) -> Result<Vec<ChallengeView>, EngineError> {
        self.require_user(user_id).await?;
        let challenges = self.store.list_challenges().await?;

        let mut views = Vec::with_capacity(challenges.len());
        for challenge in challenges {
            let membership = self.store.get_membership(user_id, challenge.challenge_id).await?;
            let (is_joined, is_completed, progress) = match &membership {
                Some(m) => (true, m.is_completed, m.progress),
                None => (false, false, 0.0),
            };
            views.push(ChallengeView {
                challenge_id: challenge.challenge_id,
                title: challenge.title,
                description: challenge.description,
                scope: challenge.scope,
                completion_policy: challenge.completion_policy,
                target_mode: challenge.target_mode,
                goal_type: challenge.goal_type,
                goal_target_value: challenge.goal_target_value,
                reward: challenge.reward,
                is_joined,
                is_completed,
                progress,
            });
        }
        Ok(views)
    }

    pub async fn achievements(&self, user_id: Uuid) -> Result<Vec<AchievementView>, EngineError> {
        self.require_user(user_id).await?;
        let rows = self.store.achievements_with_grants(user_id).await?;
        Ok(rows
            .into_iter()
            .map(|(achievement, granted_at)| AchievementView {
                achievement_id: achievement.achievement_id,
                title: achievement.title,
                description: achievement.description,
                unlocked: granted_at.is_some(),
                granted_at,
            })
            .collect())
    }

    /// Read-side snapshot, recomputed from logs and ledger on every call.
    /// Never fails for a known user with zero history.
    pub async fn get_dashboard(&self, user_id: Uuid) -> Result<DashboardSnapshot, EngineError> {
        self.require_user(user_id).await?;
        let logs = self.store.logs_for_user(user_id).await?;
        let ledger = self.store.ledger_for_user(user_id).await?;
        Ok(dashboard::build_snapshot(user_id, &logs, &ledger, Utc::now()))
    }

    async fn require_user(&self, user_id: Uuid) -> Result<(), EngineError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("User not found".to_string()))?;
        Ok(())
    }

    /// Explicit caller mode always wins; otherwise classify from the start
    /// point and average speed; WALK when nothing resolves.
    fn resolve_mode(&self, input: &LogActivityInput) -> Result<TransportMode, EngineError> {
        if let Some(raw) = &input.mode {
            let mode = TransportMode::from_str(raw).map_err(EngineError::Validation)?;
            if mode == TransportMode::Any {
                return Err(EngineError::Validation(
                    "ANY is a challenge wildcard, not a loggable mode".to_string(),
                ));
            }
            return Ok(mode);
        }

        let detected = match (&input.start_point, input.started_at, input.ended_at) {
            (Some(point), Some(started_at), Some(ended_at)) => {
                let (latitude, longitude) = classifier::parse_point(point)?;
                let speed_kmh = classifier::speed_from_interval(input.distance_km, started_at, ended_at);
                classifier::detect_mode(&self.geo, latitude, longitude, speed_kmh)
            }
            _ => None,
        };

        Ok(detected.unwrap_or(TransportMode::Walk))
    }
}

/// Pulls a numeric point value out of a free-text reward descriptor, e.g.
/// "Eco credits 200P + badge" -> 200. All digit runs are concatenated, the
/// same tolerant rule the seeded reward strings were written against.
pub fn reward_points(reward: &str) -> Option<i64> {
    let digits: String = reward.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}
