use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

/// An unlockable badge. `code` is the stable identity used for
/// create-if-absent lookups (e.g. "CHALLENGE_COMPLETE_<id>").
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Achievement {
    pub achievement_id: Uuid,
    pub code: String,
    pub title: String,
    pub description: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    pub achievement_id: Uuid,
    pub title: String,
    pub description: String,
    pub unlocked: bool,
    pub granted_at: Option<chrono::DateTime<Utc>>,
}
