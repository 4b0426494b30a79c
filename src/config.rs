use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use log::warn;

use crate::models::mobility::TransportMode;

const DEFAULT_CAR_FACTOR_G_PER_KM: f64 = 170.0;
const DEFAULT_CREDIT_PER_G_CO2: f64 = 0.1;

/// Engine configuration, constructed once at composition time and passed in
/// explicitly. Overridable via `CARBON_EMISSION_FACTORS_JSON` (a JSON object
/// of mode name -> grams per km) and `CREDIT_PER_G_CO2`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub emission_factors_g_per_km: HashMap<TransportMode, f64>,
    pub credit_per_g_co2: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut factors = HashMap::new();
        factors.insert(TransportMode::Walk, 0.0);
        factors.insert(TransportMode::Bike, 0.0);
        factors.insert(TransportMode::SharedBike, 0.0);
        factors.insert(TransportMode::Bus, 100.0);
        factors.insert(TransportMode::Subway, 50.0);
        factors.insert(TransportMode::Car, DEFAULT_CAR_FACTOR_G_PER_KM);
        EngineConfig {
            emission_factors_g_per_km: factors,
            credit_per_g_co2: DEFAULT_CREDIT_PER_G_CO2,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();

        if let Ok(raw) = env::var("CARBON_EMISSION_FACTORS_JSON") {
            match Self::parse_factors(&raw) {
                Ok(factors) => config.emission_factors_g_per_km = factors,
                Err(err) => warn!("Ignoring CARBON_EMISSION_FACTORS_JSON: {}", err),
            }
        }

        if let Ok(raw) = env::var("CREDIT_PER_G_CO2") {
            match raw.parse::<f64>() {
                Ok(rate) if rate >= 0.0 => config.credit_per_g_co2 = rate,
                _ => warn!("Ignoring CREDIT_PER_G_CO2: not a non-negative number"),
            }
        }

        config
    }

    pub fn parse_factors(raw: &str) -> Result<HashMap<TransportMode, f64>, String> {
        let by_name: HashMap<String, f64> =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))?;
        let mut factors = HashMap::new();
        for (name, factor) in by_name {
            let mode = TransportMode::from_str(&name)?;
            if factor < 0.0 {
                return Err(format!("negative factor for {}", mode));
            }
            factors.insert(mode, factor);
        }
        Ok(factors)
    }

    pub fn factor(&self, mode: TransportMode) -> f64 {
        self.emission_factors_g_per_km.get(&mode).copied().unwrap_or(0.0)
    }

    /// The car factor is the baseline every trip is compared against; a
    /// table that omits CAR falls back to the stock value.
    pub fn car_baseline_factor(&self) -> f64 {
        self.emission_factors_g_per_km
            .get(&TransportMode::Car)
            .copied()
            .unwrap_or(DEFAULT_CAR_FACTOR_G_PER_KM)
    }
}
