use crate::models::Point;
use geo::{Distance, Geodesic};

/// Geodesic distance on the WGS-84 ellipsoid, in kilometers.
pub fn distance_km(a: Point, b: Point) -> f64 {
    let a = geo::Point::new(a.lon, a.lat);
    let b = geo::Point::new(b.lon, b.lat);
    Geodesic::distance(a, b) / 1000.0
}

/// Strictly inside: a point exactly on the boundary does not match.
pub fn within_radius(center: Point, radius_km: f64, point: Point) -> bool {
    distance_km(point, center) < radius_km
}
