//! Distância de círculo máximo e correção para estrada.

use crate::types::shipment::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Velocidade média assumida para estimar duração (km/h).
pub const AVERAGE_SPEED_KMH: f64 = 60.0;

/// Distância haversine entre dois pontos (km).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Fator de correção estrada/linha reta.
///
/// Trajetos curtos têm proporcionalmente mais desvios.
pub fn road_correction_factor(straight_km: f64) -> f64 {
    if straight_km < 50.0 {
        1.30
    } else if straight_km < 200.0 {
        1.25
    } else if straight_km < 500.0 {
        1.20
    } else {
        1.15
    }
}

/// Distância rodoviária estimada (km) e duração (min).
pub fn estimate_road(a: GeoPoint, b: GeoPoint) -> (f64, f64) {
    let straight = haversine_km(a, b);
    let road = straight * road_correction_factor(straight);
    (road, duration_for(road))
}

/// Duração em minutos à velocidade média.
pub fn duration_for(distance_km: f64) -> f64 {
    distance_km / AVERAGE_SPEED_KMH * 60.0
}
