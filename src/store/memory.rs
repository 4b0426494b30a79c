use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::achievement::Achievement;
use crate::models::challenge::{Challenge, ChallengeMembership};
use crate::models::mobility::{CreditLedgerEntry, MobilityLog};
use crate::models::user::User;
use crate::store::Store;

#[derive(Default)]
struct MemInner {
    users: HashMap<Uuid, User>,
    logs: Vec<MobilityLog>,
    ledger: Vec<CreditLedgerEntry>,
    challenges: HashMap<Uuid, Challenge>,
    memberships: HashMap<(Uuid, Uuid), ChallengeMembership>,
    achievements: Vec<Achievement>,
    user_achievements: HashMap<(Uuid, Uuid), DateTime<Utc>>,
}

/// In-memory store for tests and local development. One mutex guards the
/// whole state, which makes every store call trivially atomic.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemInner>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    /// User provisioning is a host concern; tests use this directly.
    pub fn add_user(&self, name: &str) -> Result<User, EngineError> {
        let user = User {
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let mut inner = self.lock()?;
        inner.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemInner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Persistence("In-memory store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, EngineError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn append_activity(
        &self,
        log: MobilityLog,
        credit: Option<CreditLedgerEntry>,
    ) -> Result<MobilityLog, EngineError> {
        let mut inner = self.lock()?;
        inner.logs.push(log.clone());
        if let Some(entry) = credit {
            inner.ledger.push(entry);
        }
        Ok(log)
    }

    async fn logs_for_user(&self, user_id: Uuid) -> Result<Vec<MobilityLog>, EngineError> {
        Ok(self
            .lock()?
            .logs
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ledger_for_user(&self, user_id: Uuid) -> Result<Vec<CreditLedgerEntry>, EngineError> {
        Ok(self
            .lock()?
            .ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_challenge(&self, challenge: Challenge) -> Result<Challenge, EngineError> {
        let mut inner = self.lock()?;
        inner.challenges.insert(challenge.challenge_id, challenge.clone());
        Ok(challenge)
    }

    async fn get_challenge(&self, challenge_id: Uuid) -> Result<Option<Challenge>, EngineError> {
        Ok(self.lock()?.challenges.get(&challenge_id).cloned())
    }

    async fn list_challenges(&self) -> Result<Vec<Challenge>, EngineError> {
        let mut challenges: Vec<Challenge> = self.lock()?.challenges.values().cloned().collect();
        challenges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.title.cmp(&b.title)));
        Ok(challenges)
    }

    async fn insert_membership(
        &self,
        membership: ChallengeMembership,
    ) -> Result<ChallengeMembership, EngineError> {
        let mut inner = self.lock()?;
        let key = (membership.user_id, membership.challenge_id);
        if inner.memberships.contains_key(&key) {
            return Err(EngineError::Conflict("User already joined this challenge".to_string()));
        }
        inner.memberships.insert(key, membership.clone());
        Ok(membership)
    }

    async fn get_membership(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<ChallengeMembership>, EngineError> {
        Ok(self.lock()?.memberships.get(&(user_id, challenge_id)).cloned())
    }

    async fn open_memberships(&self, user_id: Uuid) -> Result<Vec<ChallengeMembership>, EngineError> {
        Ok(self
            .lock()?
            .memberships
            .values()
            .filter(|m| m.user_id == user_id && !m.is_completed)
            .cloned()
            .collect())
    }

    async fn bump_membership_progress(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        increment: f64,
        complete_at: Option<f64>,
    ) -> Result<ChallengeMembership, EngineError> {
        let mut inner = self.lock()?;
        let membership = inner
            .memberships
            .get_mut(&(user_id, challenge_id))
            .ok_or_else(|| EngineError::NotFound("Membership not found".to_string()))?;
        if !membership.is_completed {
            membership.progress += increment;
            if let Some(target) = complete_at {
                if membership.progress >= target {
                    membership.is_completed = true;
                }
            }
        }
        Ok(membership.clone())
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
        // Flag flip, achievement grant and reward credit all happen under
        // the one lock, so they land together or not at all.
        let mut inner = self.lock()?;
        let membership = inner
            .memberships
            .get_mut(&(user_id, challenge_id))
            .ok_or_else(|| EngineError::NotFound("Membership not found".to_string()))?;
        if membership.is_completed {
            return Err(EngineError::Conflict("Challenge is already completed".to_string()));
        }
        membership.is_completed = true;
        let completed = membership.clone();

        let achievement_id = match inner.achievements.iter().find(|a| a.code == code) {
            Some(existing) => existing.achievement_id,
            None => {
                let achievement = Achievement {
                    achievement_id: Uuid::new_v4(),
                    code: code.to_string(),
                    title: title.to_string(),
                    description: description.to_string(),
                };
                let achievement_id = achievement.achievement_id;
                inner.achievements.push(achievement);
                achievement_id
            }
        };
        inner
            .user_achievements
            .entry((user_id, achievement_id))
            .or_insert_with(Utc::now);

        if let Some(entry) = credit {
            inner.ledger.push(entry);
        }
        Ok(completed)
    }

    async fn achievements_with_grants(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Achievement, Option<DateTime<Utc>>)>, EngineError> {
        let inner = self.lock()?;
        let mut rows: Vec<(Achievement, Option<DateTime<Utc>>)> = inner
            .achievements
            .iter()
            .map(|a| {
                let granted_at = inner.user_achievements.get(&(user_id, a.achievement_id)).copied();
                (a.clone(), granted_at)
            })
            .collect();
        rows.sort_by(|a, b| a.0.code.cmp(&b.0.code));
        Ok(rows)
    }
}
