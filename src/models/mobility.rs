use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;
use std::fmt;
use std::str::FromStr;

/// Transport mode for one trip. `Any` is a challenge wildcard only and is
/// rejected when logging an actual trip.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "transport_mode")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    #[sqlx(rename = "WALK")]
    Walk,
    #[sqlx(rename = "BIKE")]
    Bike,
    #[sqlx(rename = "SHARED_BIKE")]
    SharedBike,
    #[sqlx(rename = "BUS")]
    Bus,
    #[sqlx(rename = "SUBWAY")]
    Subway,
    #[sqlx(rename = "CAR")]
    Car,
    #[sqlx(rename = "ANY")]
    Any,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Walk => "WALK",
            TransportMode::Bike => "BIKE",
            TransportMode::SharedBike => "SHARED_BIKE",
            TransportMode::Bus => "BUS",
            TransportMode::Subway => "SUBWAY",
            TransportMode::Car => "CAR",
            TransportMode::Any => "ANY",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WALK" => Ok(TransportMode::Walk),
            "BIKE" => Ok(TransportMode::Bike),
            "SHARED_BIKE" => Ok(TransportMode::SharedBike),
            "BUS" => Ok(TransportMode::Bus),
            "SUBWAY" => Ok(TransportMode::Subway),
            "CAR" => Ok(TransportMode::Car),
            "ANY" => Ok(TransportMode::Any),
            other => Err(format!("Unknown transport mode: {}", other)),
        }
    }
}

/// One logged trip. Append-only: a row is written exactly once per logged
/// activity and never mutated afterwards.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct MobilityLog {
    pub log_id: Uuid,
    pub user_id: Uuid,
    pub mode: TransportMode,
    pub distance_km: f64,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub ended_at: Option<chrono::DateTime<Utc>>,
    pub start_point: Option<String>,
    pub end_point: Option<String>,
    pub co2_baseline_g: f64,
    pub co2_actual_g: f64,
    pub co2_saved_g: f64,
    pub points_earned: i64,
    pub description: String,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "credit_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditType {
    #[sqlx(rename = "EARN")]
    Earn,
    #[sqlx(rename = "SPEND")]
    Spend,
}

/// One immutable credit transaction. `points` is a signed delta (EARN
/// positive, SPEND negative); a user's balance is the sum over their
/// entries and is never stored anywhere.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct CreditLedgerEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub ref_log_id: Option<Uuid>,
    pub entry_type: CreditType,
    pub points: i64,
    pub reason: String,
    pub created_at: chrono::DateTime<Utc>,
}
