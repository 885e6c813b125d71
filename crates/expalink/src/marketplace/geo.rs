use super::domain::GeoPoint;

/// Mean Earth radius used by the great-circle formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres. Inputs are not range-checked.
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Latitude within ±90 and longitude within ±180. NaN is never in range.
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_distance_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MADRID: (f64, f64) = (40.4168, -3.7038);
    const BARCELONA: (f64, f64) = (41.3851, 2.1734);

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(
            haversine_distance_km(MADRID.0, MADRID.1, MADRID.0, MADRID.1),
            0.0
        );
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (MADRID, BARCELONA),
            ((39.4699, -0.3763), (28.1235, -15.4363)),
            ((-33.86, 151.21), (51.5074, -0.1278)),
        ];
        for (a, b) in pairs {
            let forward = haversine_distance_km(a.0, a.1, b.0, b.1);
            let backward = haversine_distance_km(b.0, b.1, a.0, a.1);
            assert!((forward - backward).abs() < 1e-9, "{forward} vs {backward}");
        }
    }

    #[test]
    fn madrid_to_barcelona_is_about_505_km() {
        let km = haversine_distance_km(MADRID.0, MADRID.1, BARCELONA.0, BARCELONA.1);
        assert!((km - 505.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn antipodal_points_are_half_the_circumference() {
        let km = haversine_distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((km - 20015.0).abs() < 1.0, "got {km}");
    }

    #[test]
    fn out_of_range_inputs_still_produce_a_number() {
        let km = haversine_distance_km(123.0, 400.0, -95.0, -500.0);
        assert!(km.is_finite());
        assert!(km >= 0.0);
    }
}
