use chrono::{DateTime, Utc};

use crate::errors::EngineError;
use crate::geo::GeoLookup;
use crate::models::mobility::TransportMode;

/// A trip starting within 200 m of a stop/station is attributed to it.
const STATION_PROXIMITY_KM: f64 = 0.2;
const WALK_MAX_SPEED_KMH: f64 = 10.0;
const BIKE_MAX_SPEED_KMH: f64 = 25.0;

/// Best-effort mode inference from position and speed. This is a priority
/// cascade where the first matching rule wins: bus proximity beats subway
/// proximity beats speed-based inference. Returns `None` when undetermined;
/// an explicit caller-supplied mode always bypasses this entirely.
pub fn detect_mode(
    geo: &GeoLookup,
    latitude: f64,
    longitude: f64,
    speed_kmh: f64,
) -> Option<TransportMode> {
    let bus_distance = geo
        .nearest_bus_stop(latitude, longitude)
        .map_or(f64::INFINITY, |(_, d)| d);
    let subway_distance = geo
        .nearest_subway_station(latitude, longitude)
        .map_or(f64::INFINITY, |(_, d)| d);
    let bike_distance = geo
        .nearest_bike_station(latitude, longitude)
        .map_or(f64::INFINITY, |(_, d)| d);

    if bus_distance < STATION_PROXIMITY_KM {
        Some(TransportMode::Bus)
    } else if subway_distance < STATION_PROXIMITY_KM {
        Some(TransportMode::Subway)
    } else if speed_kmh < WALK_MAX_SPEED_KMH {
        Some(TransportMode::Walk)
    } else if speed_kmh <= BIKE_MAX_SPEED_KMH {
        if bike_distance < STATION_PROXIMITY_KM {
            Some(TransportMode::SharedBike)
        } else {
            Some(TransportMode::Bike)
        }
    } else {
        None
    }
}

/// Parses a "lat,lon" point string.
pub fn parse_point(point: &str) -> Result<(f64, f64), EngineError> {
    let invalid = || EngineError::Validation(format!("Invalid point string: {}", point));
    let mut parts = point.split(',');
    let latitude = parts.next().ok_or_else(invalid)?.trim().parse::<f64>().map_err(|_| invalid())?;
    let longitude = parts.next().ok_or_else(invalid)?.trim().parse::<f64>().map_err(|_| invalid())?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((latitude, longitude))
}

/// Average speed over the trip interval; a non-positive duration yields 0.
pub fn speed_from_interval(
    distance_km: f64,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
) -> f64 {
    let duration_hours = (ended_at - started_at).num_seconds() as f64 / 3600.0;
    if duration_hours > 0.0 {
        distance_km / duration_hours
    } else {
        0.0
    }
}
