use chrono::Utc;
use uuid::Uuid;

use crate::engine::emissions::EmissionOutcome;
use crate::engine::LogActivityInput;
use crate::errors::EngineError;
use crate::models::mobility::{CreditLedgerEntry, CreditType, MobilityLog, TransportMode};
use crate::store::Store;

/// Persists the mobility log and, when the trip earned points, exactly one
/// EARN ledger entry referencing it. The two rows go through a single
/// atomic store call: either both become visible or neither does. Progress
/// tracking is deliberately NOT triggered here, so a tracker failure can
/// never roll back an already-valid activity record.
pub async fn write(
    store: &dyn Store,
    user_id: Uuid,
    mode: TransportMode,
    input: &LogActivityInput,
    outcome: &EmissionOutcome,
) -> Result<MobilityLog, EngineError> {
    let now = Utc::now();
    let log = MobilityLog {
        log_id: Uuid::new_v4(),
        user_id,
        mode,
        distance_km: input.distance_km,
        started_at: input.started_at,
        ended_at: input.ended_at,
        start_point: input.start_point.clone(),
        end_point: input.end_point.clone(),
        co2_baseline_g: outcome.co2_baseline_g,
        co2_actual_g: outcome.co2_actual_g,
        co2_saved_g: outcome.co2_saved_g,
        points_earned: outcome.points_earned,
        description: input.description.clone(),
        created_at: now,
    };

    let credit = if outcome.points_earned > 0 {
        Some(CreditLedgerEntry {
            entry_id: Uuid::new_v4(),
            user_id,
            ref_log_id: Some(log.log_id),
            entry_type: CreditType::Earn,
            points: outcome.points_earned,
            reason: format!("Mobility: {} for {:.2} km", mode, input.distance_km),
            created_at: now,
        })
    } else {
        None
    };

    store.append_activity(log, credit).await
}
