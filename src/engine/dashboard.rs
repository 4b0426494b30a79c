use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::mobility::{CreditLedgerEntry, MobilityLog, TransportMode};

/// One garden level per 100 g of cumulative saved CO2.
const GARDEN_LEVEL_STEP_G: f64 = 100.0;
const SERIES_DAYS: i64 = 7;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySaved {
    pub date: NaiveDate,
    pub saved_g: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModeSaved {
    pub mode: TransportMode,
    pub saved_g: f64,
}

/// Read-side projection over a user's logs and ledger. Every field is
/// recomputed from the rows on each call; there is no stored balance or
/// level that could drift from the source of truth.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub user_id: Uuid,
    pub co2_saved_today_g: f64,
    pub points_today: i64,
    pub total_saved_g: f64,
    pub total_saved_kg: f64,
    pub total_points: i64,
    pub credit_balance: i64,
    pub last7days: Vec<DailySaved>,
    pub mode_stats: Vec<ModeSaved>,
    pub garden_level: i64,
}

/// Folds the user's rows into a snapshot. `now` fixes the "today" boundary
/// (UTC calendar day) so the fold stays deterministic under test.
pub fn build_snapshot(
    user_id: Uuid,
    logs: &[MobilityLog],
    ledger: &[CreditLedgerEntry],
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let today = now.date_naive();

    let mut co2_saved_today_g = 0.0;
    let mut points_today = 0;
    let mut total_saved_g = 0.0;
    let mut total_points = 0;
    let mut by_day: HashMap<NaiveDate, f64> = HashMap::new();
    let mut by_mode: HashMap<TransportMode, f64> = HashMap::new();

    for log in logs {
        let day = log.created_at.date_naive();
        if day == today {
            co2_saved_today_g += log.co2_saved_g;
            points_today += log.points_earned;
        }
        total_saved_g += log.co2_saved_g;
        total_points += log.points_earned;
        *by_day.entry(day).or_insert(0.0) += log.co2_saved_g;
        *by_mode.entry(log.mode).or_insert(0.0) += log.co2_saved_g;
    }

    let credit_balance = ledger.iter().map(|entry| entry.points).sum();

    let last7days = (0..SERIES_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DailySaved { date, saved_g: by_day.get(&date).copied().unwrap_or(0.0) }
        })
        .collect();

    let mut mode_stats: Vec<ModeSaved> = by_mode
        .into_iter()
        .map(|(mode, saved_g)| ModeSaved { mode, saved_g })
        .collect();
    mode_stats.sort_by(|a, b| a.mode.as_str().cmp(b.mode.as_str()));

    let garden_level = (total_saved_g / GARDEN_LEVEL_STEP_G).floor() as i64;

    DashboardSnapshot {
        user_id,
        co2_saved_today_g,
        points_today,
        total_saved_g,
        total_saved_kg: total_saved_g / 1000.0,
        total_points,
        credit_balance,
        last7days,
        mode_stats,
        garden_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mobility::CreditType;

    fn log_at(user_id: Uuid, mode: TransportMode, saved_g: f64, points: i64, created_at: DateTime<Utc>) -> MobilityLog {
        MobilityLog {
            log_id: Uuid::new_v4(),
            user_id,
            mode,
            distance_km: 1.0,
            started_at: None,
            ended_at: None,
            start_point: None,
            end_point: None,
            co2_baseline_g: saved_g,
            co2_actual_g: 0.0,
            co2_saved_g: saved_g,
            points_earned: points,
            description: String::new(),
            created_at,
        }
    }

    #[test]
    fn zero_history_yields_zeroed_snapshot() {
        let user_id = Uuid::new_v4();
        let snapshot = build_snapshot(user_id, &[], &[], Utc::now());
        assert_eq!(snapshot.co2_saved_today_g, 0.0);
        assert_eq!(snapshot.total_saved_g, 0.0);
        assert_eq!(snapshot.total_points, 0);
        assert_eq!(snapshot.credit_balance, 0);
        assert_eq!(snapshot.garden_level, 0);
        assert_eq!(snapshot.last7days.len(), 7);
        assert!(snapshot.last7days.iter().all(|day| day.saved_g == 0.0));
        assert!(snapshot.mode_stats.is_empty());
    }

    #[test]
    fn snapshot_folds_logs_and_ledger() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let logs = vec![
            log_at(user_id, TransportMode::Walk, 850.0, 85, now),
            log_at(user_id, TransportMode::Bus, 700.0, 70, now - Duration::days(2)),
            // Older than the 7-day window; still counts toward totals.
            log_at(user_id, TransportMode::Walk, 170.0, 17, now - Duration::days(30)),
        ];
        let ledger = vec![
            CreditLedgerEntry {
                entry_id: Uuid::new_v4(),
                user_id,
                ref_log_id: None,
                entry_type: CreditType::Earn,
                points: 155,
                reason: "test".to_string(),
                created_at: now,
            },
            CreditLedgerEntry {
                entry_id: Uuid::new_v4(),
                user_id,
                ref_log_id: None,
                entry_type: CreditType::Spend,
                points: -55,
                reason: "shop".to_string(),
                created_at: now,
            },
        ];

        let snapshot = build_snapshot(user_id, &logs, &ledger, now);
        assert_eq!(snapshot.co2_saved_today_g, 850.0);
        assert_eq!(snapshot.points_today, 85);
        assert_eq!(snapshot.total_saved_g, 1720.0);
        assert_eq!(snapshot.total_saved_kg, 1.72);
        assert_eq!(snapshot.total_points, 172);
        assert_eq!(snapshot.credit_balance, 100);
        assert_eq!(snapshot.garden_level, 17);

        assert_eq!(snapshot.last7days.len(), 7);
        assert_eq!(snapshot.last7days[6].saved_g, 850.0);
        assert_eq!(snapshot.last7days[4].saved_g, 700.0);

        assert_eq!(snapshot.mode_stats.len(), 2);
        assert_eq!(snapshot.mode_stats[0].mode, TransportMode::Bus);
        assert_eq!(snapshot.mode_stats[0].saved_g, 700.0);
        assert_eq!(snapshot.mode_stats[1].mode, TransportMode::Walk);
        assert_eq!(snapshot.mode_stats[1].saved_g, 1020.0);
    }
}
