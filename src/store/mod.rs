pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::achievement::Achievement;
use crate::models::challenge::{Challenge, ChallengeMembership};
use crate::models::mobility::{CreditLedgerEntry, MobilityLog};
use crate::models::user::User;

/// Persistence seam for the engine. Implementations serialize concurrent
/// writers themselves (row-level locking in Postgres, a mutex in the
/// in-memory store); the engine holds no locks of its own. All failures map
/// to `EngineError::Persistence` and abort the enclosing unit of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, EngineError>;

    /// Appends one mobility log and, when present, its credit entry as a
    /// single atomic unit: either both become visible or neither does.
    async fn append_activity(
        &self,
        log: MobilityLog,
        credit: Option<CreditLedgerEntry>,
    ) -> Result<MobilityLog, EngineError>;

    async fn logs_for_user(&self, user_id: Uuid) -> Result<Vec<MobilityLog>, EngineError>;

    async fn ledger_for_user(&self, user_id: Uuid) -> Result<Vec<CreditLedgerEntry>, EngineError>;

    async fn insert_challenge(&self, challenge: Challenge) -> Result<Challenge, EngineError>;

    async fn get_challenge(&self, challenge_id: Uuid) -> Result<Option<Challenge>, EngineError>;

    async fn list_challenges(&self) -> Result<Vec<Challenge>, EngineError>;

    /// Fails with `Conflict` when the user already joined this challenge.
    async fn insert_membership(
        &self,
        membership: ChallengeMembership,
    ) -> Result<ChallengeMembership, EngineError>;

    async fn get_membership(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<ChallengeMembership>, EngineError>;

    /// Memberships of the user that have not completed yet.
    async fn open_memberships(&self, user_id: Uuid) -> Result<Vec<ChallengeMembership>, EngineError>;

    /// Adds `increment` to the membership's progress counter in one atomic
    /// read-modify-write. When `complete_at` is set and the new progress
    /// reaches it, the membership completes in the same update. A
    /// membership that already completed is left untouched.
    async fn bump_membership_progress(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        increment: f64,
        complete_at: Option<f64>,
    ) -> Result<ChallengeMembership, EngineError>;

    /// Completes the membership and applies its side effects as one unit of
    /// work: the flag flips false -> true, the completion achievement is
    /// created by `code` if absent and granted to the user, and the reward
    /// credit (when present) is appended. `Conflict` when the membership
    /// already completed; on any failure nothing is applied, so the caller
    /// retries the whole completion.
    async fn finalize_completion(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        code: &str,
        title: &str,
        description: &str,
        credit: Option<CreditLedgerEntry>,
    ) -> Result<ChallengeMembership, EngineError>;

    /// Every achievement with the user's grant timestamp where unlocked.
    async fn achievements_with_grants(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Achievement, Option<DateTime<Utc>>)>, EngineError>;
}
