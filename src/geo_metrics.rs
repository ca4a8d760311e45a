//! Distance and proximity helpers.
//!
//! Great-circle distances come from geo's Haversine implementation, which
//! uses the mean Earth radius (6371.0088 km).

use geo::prelude::*;

use crate::types::Coordinate;

/// Great-circle distance between two points, in meters.
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    a.point().haversine_distance(&b.point())
}

/// True when `other` lies within `radius_m` meters of `center` (inclusive).
pub fn within_radius(center: Coordinate, other: Coordinate, radius_m: f64) -> bool {
    haversine_meters(center, other) <= radius_m
}
