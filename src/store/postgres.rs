use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::achievement::Achievement;
use crate::models::challenge::{Challenge, ChallengeMembership};
use crate::models::mobility::{CreditLedgerEntry, MobilityLog};
use crate::models::user::User;
use crate::store::Store;

const MEMBERSHIP_COLUMNS: &str = "user_id, challenge_id, progress, is_completed, joined_at";
const CHALLENGE_COLUMNS: &str = "challenge_id, title, description, scope, completion_policy, \
     target_mode, goal_type, goal_target_value, start_at, end_at, reward, created_by, created_at";

/// Postgres-backed store. Expects the tables users, mobility_logs,
/// credits_ledger, challenges, challenge_members, achievements and
/// user_achievements, with the enum columns using the Postgres types
/// declared on the model enums (transport_mode, credit_type, ...).
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, EngineError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, name, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn append_activity(
        &self,
        log: MobilityLog,
        credit: Option<CreditLedgerEntry>,
    ) -> Result<MobilityLog, EngineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO mobility_logs (log_id, user_id, mode, distance_km, started_at, ended_at, \
             start_point, end_point, co2_baseline_g, co2_actual_g, co2_saved_g, points_earned, \
             description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(log.log_id)
        .bind(log.user_id)
        .bind(log.mode)
        .bind(log.distance_km)
        .bind(log.started_at)
        .bind(log.ended_at)
        .bind(&log.start_point)
        .bind(&log.end_point)
        .bind(log.co2_baseline_g)
        .bind(log.co2_actual_g)
        .bind(log.co2_saved_g)
        .bind(log.points_earned)
        .bind(&log.description)
        .bind(log.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(entry) = credit {
            sqlx::query(
                "INSERT INTO credits_ledger (entry_id, user_id, ref_log_id, entry_type, points, \
                 reason, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(entry.entry_id)
            .bind(entry.user_id)
            .bind(entry.ref_log_id)
            .bind(entry.entry_type)
            .bind(entry.points)
            .bind(&entry.reason)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(log)
    }

    async fn logs_for_user(&self, user_id: Uuid) -> Result<Vec<MobilityLog>, EngineError> {
        let logs = sqlx::query_as::<_, MobilityLog>(
            "SELECT log_id, user_id, mode, distance_km, started_at, ended_at, start_point, \
             end_point, co2_baseline_g, co2_actual_g, co2_saved_g, points_earned, description, \
             created_at FROM mobility_logs WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn ledger_for_user(&self, user_id: Uuid) -> Result<Vec<CreditLedgerEntry>, EngineError> {
        let entries = sqlx::query_as::<_, CreditLedgerEntry>(
            "SELECT entry_id, user_id, ref_log_id, entry_type, points, reason, created_at \
             FROM credits_ledger WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn insert_challenge(&self, challenge: Challenge) -> Result<Challenge, EngineError> {
        sqlx::query(
            "INSERT INTO challenges (challenge_id, title, description, scope, completion_policy, \
             target_mode, goal_type, goal_target_value, start_at, end_at, reward, created_by, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(challenge.challenge_id)
        .bind(&challenge.title)
        .bind(&challenge.description)
        .bind(challenge.scope)
        .bind(challenge.completion_policy)
        .bind(challenge.target_mode)
        .bind(challenge.goal_type)
        .bind(challenge.goal_target_value)
        .bind(challenge.start_at)
        .bind(challenge.end_at)
        .bind(&challenge.reward)
        .bind(challenge.created_by)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await?;
        Ok(challenge)
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> Result<Option<Challenge>, EngineError> {
        let challenge = sqlx::query_as::<_, Challenge>(&format!(
            "SELECT {} FROM challenges WHERE challenge_id = $1",
            CHALLENGE_COLUMNS
        ))
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(challenge)
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>, EngineError> {
        let challenges = sqlx::query_as::<_, Challenge>(&format!(
            "SELECT {} FROM challenges ORDER BY created_at, title",
            CHALLENGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(challenges)
    }

    async fn insert_membership(
        &self,
        membership: ChallengeMembership,
    ) -> Result<ChallengeMembership, EngineError> {
        let inserted = sqlx::query_as::<_, ChallengeMembership>(&format!(
            "INSERT INTO challenge_members (user_id, challenge_id, progress, is_completed, joined_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, challenge_id) DO NOTHING \
             RETURNING {}",
            MEMBERSHIP_COLUMNS
        ))
        .bind(membership.user_id)
        .bind(membership.challenge_id)
        .bind(membership.progress)
        .bind(membership.is_completed)
        .bind(membership.joined_at)
        .fetch_optional(&self.pool)
        .await?;

        inserted.ok_or_else(|| EngineError::Conflict("User already joined this challenge".to_string()))
    }

    async fn get_membership(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<ChallengeMembership>, EngineError> {
        let membership = sqlx::query_as::<_, ChallengeMembership>(&format!(
            "SELECT {} FROM challenge_members WHERE user_id = $1 AND challenge_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn open_memberships(&self, user_id: Uuid) -> Result<Vec<ChallengeMembership>, EngineError> {
        let memberships = sqlx::query_as::<_, ChallengeMembership>(&format!(
            "SELECT {} FROM challenge_members WHERE user_id = $1 AND is_completed = FALSE",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(memberships)
    }

    async fn bump_membership_progress(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        increment: f64,
        complete_at: Option<f64>,
    ) -> Result<ChallengeMembership, EngineError> {
        // Single-statement read-modify-write; row-level locking serializes
        // concurrent events for the same membership.
        let updated = sqlx::query_as::<_, ChallengeMembership>(&format!(
            "UPDATE challenge_members \
             SET progress = progress + $3, \
                 is_completed = CASE WHEN $4::float8 IS NOT NULL AND progress + $3 >= $4 \
                                     THEN TRUE ELSE is_completed END \
             WHERE user_id = $1 AND challenge_id = $2 AND is_completed = FALSE \
             RETURNING {}",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id)
        .bind(challenge_id)
        .bind(increment)
        .bind(complete_at)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(membership) => Ok(membership),
            // Completed concurrently, or never existed.
            None => self
                .get_membership(user_id, challenge_id)
                .await?
                .ok_or_else(|| EngineError::NotFound("Membership not found".to_string())),
        }
    }

    async fn finalize_completion(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        code: &str,
        title: &str,
        description: &str,
        credit: Option<CreditLedgerEntry>,
    ) -> Result<ChallengeMembership, EngineError> {
        // One transaction covers the flag flip, the achievement grant and
        // the reward credit; an abort leaves the membership open for retry.
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, ChallengeMembership>(&format!(
            "UPDATE challenge_members SET is_completed = TRUE \
             WHERE user_id = $1 AND challenge_id = $2 AND is_completed = FALSE \
             RETURNING {}",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(completed) = updated else {
            tx.rollback().await?;
            return match self.get_membership(user_id, challenge_id).await? {
                Some(_) => Err(EngineError::Conflict("Challenge is already completed".to_string())),
                None => Err(EngineError::NotFound("Membership not found".to_string())),
            };
        };

        sqlx::query(
            "INSERT INTO achievements (achievement_id, code, title, description) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (code) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(title)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        let achievement = sqlx::query_as::<_, Achievement>(
            "SELECT achievement_id, code, title, description FROM achievements WHERE code = $1",
        )
        .bind(code)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_achievements (user_id, achievement_id, granted_at) \
             VALUES ($1, $2, $3) ON CONFLICT (user_id, achievement_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(achievement.achievement_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if let Some(entry) = credit {
            sqlx::query(
                "INSERT INTO credits_ledger (entry_id, user_id, ref_log_id, entry_type, points, \
                 reason, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(entry.entry_id)
            .bind(entry.user_id)
            .bind(entry.ref_log_id)
            .bind(entry.entry_type)
            .bind(entry.points)
            .bind(&entry.reason)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(completed)
    }

    async fn achievements_with_grants(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Achievement, Option<DateTime<Utc>>)>, EngineError> {
        let rows = sqlx::query(
            "SELECT a.achievement_id, a.code, a.title, a.description, ua.granted_at \
             FROM achievements a \
             LEFT JOIN user_achievements ua \
               ON ua.achievement_id = a.achievement_id AND ua.user_id = $1 \
             ORDER BY a.code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let achievement = Achievement {
                achievement_id: row.try_get("achievement_id")?,
                code: row.try_get("code")?,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
            };
            let granted_at: Option<DateTime<Utc>> = row.try_get("granted_at")?;
            result.push((achievement, granted_at));
        }
        Ok(result)
    }
}
