//! Great-circle distance and radius filtering. All distances are kilometres.

use crate::{Bar, BarWithDistance};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Keep the bars within `radius_km` of the user, nearest first.
///
/// Without a usable user location every bar is returned, unsorted and without
/// a distance. With one, bars lacking coordinates are dropped.
pub fn filter_by_distance(
    bars: Vec<Bar>,
    user_lat: Option<f64>,
    user_lon: Option<f64>,
    radius_km: f64,
) -> Vec<BarWithDistance> {
    let origin = match (user_lat, user_lon) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => (lat, lon),
        _ => {
            return bars
                .into_iter()
                .map(|bar| BarWithDistance { bar, distance_km: None })
                .collect();
        }
    };

    let mut nearby: Vec<BarWithDistance> = bars
        .into_iter()
        .filter_map(|bar| {
            let (lat, lon) = bar.coordinates()?;
            let distance = haversine_km(origin.0, origin.1, lat, lon);
            (distance <= radius_km).then_some(BarWithDistance { bar, distance_km: Some(distance) })
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_km
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
    });
    nearby
}
