use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// One row of a static reference dataset (bus stop, subway station or
/// bike-share station).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StationRef {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Great-circle distance in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin() * (d_lon / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Nearest-station lookup over static reference datasets. Datasets are
/// loaded once and never mutated; an empty dataset yields `None`, which
/// callers must treat as an infinite distance, never zero.
pub struct GeoLookup {
    bus_stops: Vec<StationRef>,
    subway_stations: Vec<StationRef>,
    bike_stations: Vec<StationRef>,
}

impl GeoLookup {
    pub fn new(
        bus_stops: Vec<StationRef>,
        subway_stations: Vec<StationRef>,
        bike_stations: Vec<StationRef>,
    ) -> Self {
        GeoLookup { bus_stops, subway_stations, bike_stations }
    }

    pub fn empty() -> Self {
        GeoLookup::new(Vec::new(), Vec::new(), Vec::new())
    }

    /// Loads each dataset from a JSON array of `StationRef`. A missing or
    /// unreadable file degrades to an empty dataset with a warning so the
    /// engine can still serve logs with speed-only classification.
    pub fn from_json_files(
        bus_stops_path: Option<&Path>,
        subway_stations_path: Option<&Path>,
        bike_stations_path: Option<&Path>,
    ) -> Self {
        GeoLookup::new(
            load_dataset("bus stops", bus_stops_path),
            load_dataset("subway stations", subway_stations_path),
            load_dataset("bike-share stations", bike_stations_path),
        )
    }

    pub fn nearest_bus_stop(&self, latitude: f64, longitude: f64) -> Option<(&StationRef, f64)> {
        nearest(&self.bus_stops, latitude, longitude)
    }

    pub fn nearest_subway_station(&self, latitude: f64, longitude: f64) -> Option<(&StationRef, f64)> {
        nearest(&self.subway_stations, latitude, longitude)
    }

    pub fn nearest_bike_station(&self, latitude: f64, longitude: f64) -> Option<(&StationRef, f64)> {
        nearest(&self.bike_stations, latitude, longitude)
    }
}

/// Candidate selection uses cheap planar squared distance; the distance the
/// caller thresholds against is the haversine one.
fn nearest<'a>(stations: &'a [StationRef], latitude: f64, longitude: f64) -> Option<(&'a StationRef, f64)> {
    let best = stations.iter().min_by(|a, b| {
        let da = planar_sq(a, latitude, longitude);
        let db = planar_sq(b, latitude, longitude);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let distance_km = haversine_km(latitude, longitude, best.latitude, best.longitude);
    Some((best, distance_km))
}

fn planar_sq(station: &StationRef, latitude: f64, longitude: f64) -> f64 {
    let d_lat = station.latitude - latitude;
    let d_lon = station.longitude - longitude;
    d_lat * d_lat + d_lon * d_lon
}

/// Reads one dataset file, a JSON array of `StationRef`. A missing or
/// malformed file is an `UpstreamUnavailable`.
pub fn read_dataset(path: &Path) -> Result<Vec<StationRef>, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        EngineError::UpstreamUnavailable(format!("Cannot read dataset {}: {}", path.display(), err))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        EngineError::UpstreamUnavailable(format!("Cannot parse dataset {}: {}", path.display(), err))
    })
}

fn load_dataset(label: &str, path: Option<&Path>) -> Vec<StationRef> {
    let Some(path) = path else {
        return Vec::new();
    };
    match read_dataset(path) {
        Ok(stations) => stations,
        Err(err) => {
            warn!("{} dataset degraded to empty: {}", label, err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, lat: f64, lon: f64) -> StationRef {
        StationRef { name: name.to_string(), latitude: lat, longitude: lon }
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Seoul City Hall to Gangnam Station, roughly 8.5 km.
        let d = haversine_km(37.5663, 126.9779, 37.4979, 127.0276);
        assert!(d > 8.0 && d < 9.5, "got {}", d);
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        assert_eq!(haversine_km(37.5, 127.0, 37.5, 127.0), 0.0);
    }

    #[test]
    fn nearest_picks_closest_station() {
        let geo = GeoLookup::new(
            vec![station("far", 37.60, 127.10), station("near", 37.5001, 127.0001)],
            Vec::new(),
            Vec::new(),
        );
        let (best, distance_km) = geo.nearest_bus_stop(37.5, 127.0).unwrap();
        assert_eq!(best.name, "near");
        assert!(distance_km < 0.2);
    }

    #[test]
    fn missing_dataset_file_is_upstream_unavailable_but_lookup_degrades() {
        let path = Path::new("/nonexistent/bus_stops.json");
        let err = read_dataset(path).unwrap_err();
        assert!(matches!(err, EngineError::UpstreamUnavailable(_)));

        // The lookup itself stays usable with the dataset empty.
        let geo = GeoLookup::from_json_files(Some(path), None, None);
        assert!(geo.nearest_bus_stop(37.5, 127.0).is_none());
    }

    #[test]
    fn empty_dataset_yields_none() {
        let geo = GeoLookup::empty();
        assert!(geo.nearest_bus_stop(37.5, 127.0).is_none());
        assert!(geo.nearest_subway_station(37.5, 127.0).is_none());
        assert!(geo.nearest_bike_station(37.5, 127.0).is_none());
    }
}
