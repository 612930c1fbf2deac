//! Great-circle distance between WGS84 coordinates

use crate::types::LatLng;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two points, in kilometers.
///
/// Good to a fraction of a percent at the scales administrative regions
/// sit at, which is all the weights graph needs.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distance() {
        // Sana'a to Aden is roughly 320 km as the crow flies.
        let sanaa = LatLng::new(15.3694, 44.1910);
        let aden = LatLng::new(12.7855, 45.0187);
        let d = haversine_km(sanaa, aden);
        assert!((d - 300.0).abs() < 25.0, "got {} km", d);
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = LatLng::new(15.0, 44.0);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric() {
        let a = LatLng::new(13.5789, 44.0219);
        let b = LatLng::new(14.5433, 49.1242);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }
}
