use crate::config::EngineConfig;
use crate::models::mobility::TransportMode;

/// The full emission breakdown for one trip. Only `co2_saved_g` is clamped
/// to zero; baseline and actual are reported as computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionOutcome {
    pub co2_baseline_g: f64,
    pub co2_actual_g: f64,
    pub co2_saved_g: f64,
    pub points_earned: i64,
}

impl EmissionOutcome {
    pub fn zero() -> Self {
        EmissionOutcome {
            co2_baseline_g: 0.0,
            co2_actual_g: 0.0,
            co2_saved_g: 0.0,
            points_earned: 0,
        }
    }
}

/// Maps (mode, distance) to avoided CO2 and reward points against the car
/// baseline. Pure and deterministic; points are a function of saved grams
/// and the configured rate, never of the mode directly.
pub fn compute(config: &EngineConfig, mode: TransportMode, distance_km: f64) -> EmissionOutcome {
    if distance_km == 0.0 {
        return EmissionOutcome::zero();
    }

    let co2_actual_g = config.factor(mode) * distance_km;
    let co2_baseline_g = config.car_baseline_factor() * distance_km;
    let co2_saved_g = (co2_baseline_g - co2_actual_g).max(0.0);
    let points_earned = (co2_saved_g * config.credit_per_g_co2).floor() as i64;

    EmissionOutcome { co2_baseline_g, co2_actual_g, co2_saved_g, points_earned }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_yields_all_zeros() {
        let config = EngineConfig::default();
        for mode in [TransportMode::Walk, TransportMode::Bus, TransportMode::Car] {
            let outcome = compute(&config, mode, 0.0);
            assert_eq!(outcome, EmissionOutcome::zero());
        }
    }

    #[test]
    fn bus_ten_km_scenario() {
        let outcome = compute(&EngineConfig::default(), TransportMode::Bus, 10.0);
        assert_eq!(outcome.co2_actual_g, 1000.0);
        assert_eq!(outcome.co2_baseline_g, 1700.0);
        assert_eq!(outcome.co2_saved_g, 700.0);
        assert_eq!(outcome.points_earned, 70);
    }

    #[test]
    fn walk_five_km_scenario() {
        let outcome = compute(&EngineConfig::default(), TransportMode::Walk, 5.0);
        assert_eq!(outcome.co2_actual_g, 0.0);
        assert_eq!(outcome.co2_baseline_g, 850.0);
        assert_eq!(outcome.co2_saved_g, 850.0);
        assert_eq!(outcome.points_earned, 85);
    }

    #[test]
    fn car_never_saves_regardless_of_distance() {
        let config = EngineConfig::default();
        for distance_km in [0.5, 10.0, 500.0] {
            let outcome = compute(&config, TransportMode::Car, distance_km);
            assert_eq!(outcome.co2_saved_g, 0.0);
            assert_eq!(outcome.points_earned, 0);
        }
    }

    #[test]
    fn factor_above_baseline_clamps_saved_to_zero() {
        let mut config = EngineConfig::default();
        config.emission_factors_g_per_km.insert(TransportMode::Bus, 500.0);
        let outcome = compute(&config, TransportMode::Bus, 3.0);
        // Baseline/actual stay unclamped; only saved is floored at zero.
        assert_eq!(outcome.co2_actual_g, 1500.0);
        assert_eq!(outcome.co2_baseline_g, 510.0);
        assert_eq!(outcome.co2_saved_g, 0.0);
        assert_eq!(outcome.points_earned, 0);
    }

    #[test]
    fn saved_grows_with_distance_for_green_modes() {
        let config = EngineConfig::default();
        let mut previous = -1.0;
        for distance_km in [0.0, 1.0, 2.5, 10.0, 42.0] {
            let outcome = compute(&config, TransportMode::Subway, distance_km);
            assert!(outcome.co2_saved_g >= previous);
            previous = outcome.co2_saved_g;
        }
    }
}
