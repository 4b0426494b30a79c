use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;

/// Minimal user record. Profile fields and credentials live in the host
/// application; the engine only needs a stable identity to key logs,
/// ledger entries and memberships.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<Utc>,
}
