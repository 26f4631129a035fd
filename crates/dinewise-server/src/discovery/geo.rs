use std::f64::consts::PI;

use dinewise_core::Coordinates;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let to_rad = |deg: f64| deg * PI / 180.0;

    let lat1 = to_rad(a.latitude);
    let lat2 = to_rad(b.latitude);
    let d_lat = lat2 - lat1;
    let d_lng = to_rad(b.longitude - a.longitude);

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}
