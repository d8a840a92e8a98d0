//! Geographic helpers: bearings, distances and destination points.
//!
//! Angles are taken and returned in degrees, trigonometry runs in radians and
//! distances are metres on a spherical earth.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::station::Feature;

/// Mean earth radius (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Axis-aligned geographic box, `[west, south, east, north]` in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.west && p.lon <= self.east && p.lat >= self.south && p.lat <= self.north
    }
}

/// Wrap any angle into [0, 360).
#[inline]
pub fn normalize_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Initial great-circle bearing from `from` to `to`, in [0, 360).
pub fn great_circle_bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let x = delta_lon.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lon.cos();

    normalize_degrees(x.atan2(y).to_degrees())
}

/// Constant-heading (loxodrome) bearing from `from` to `to`, in [0, 360).
pub fn rhumb_bearing(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let mut delta_lambda = (to.lon - from.lon).to_radians();
    // take the shorter way round the antimeridian
    if delta_lambda.abs() > PI {
        delta_lambda = if delta_lambda > 0.0 {
            -(2.0 * PI - delta_lambda)
        } else {
            2.0 * PI + delta_lambda
        };
    }
    let delta_psi = ((phi2 / 2.0 + FRAC_PI_4).tan() / (phi1 / 2.0 + FRAC_PI_4).tan()).ln();
    normalize_degrees(delta_lambda.atan2(delta_psi).to_degrees())
}

/// Great-circle distance using the haversine formula.
pub fn haversine_distance_m(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let delta_phi = (to.lat - from.lat).to_radians();
    let delta_lambda = (to.lon - from.lon).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Point reached after travelling `distance_m` on a constant `bearing_deg`.
pub fn rhumb_destination(origin: GeoPoint, distance_m: f64, bearing_deg: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let lambda1 = origin.lon.to_radians();
    let phi1 = origin.lat.to_radians();
    let theta = bearing_deg.to_radians();

    let delta_phi = delta * theta.cos();
    let mut phi2 = phi1 + delta_phi;
    // crossing a pole folds back onto the other meridian side
    if phi2.abs() > FRAC_PI_2 {
        phi2 = if phi2 > 0.0 { PI - phi2 } else { -PI - phi2 };
    }

    let delta_psi = ((phi2 / 2.0 + FRAC_PI_4).tan() / (phi1 / 2.0 + FRAC_PI_4).tan()).ln();
    // E-W course has an ill-conditioned delta_psi
    let q = if delta_psi.abs() > 1e-11 {
        delta_phi / delta_psi
    } else {
        phi1.cos()
    };
    let delta_lambda = delta * theta.sin() / q;
    let lambda2 = lambda1 + delta_lambda;

    GeoPoint::new(
        phi2.to_degrees(),
        (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0,
    )
}

/// Offset of `target` from `camera` in scene axes (meters): +x east, -z north.
///
/// Each axis is measured separately along the camera's parallel and meridian,
/// which is plenty accurate for the tens of meters between stations.
pub fn local_offset_m(camera: GeoPoint, target: GeoPoint) -> Vec3 {
    let along_parallel = GeoPoint::new(camera.lat, target.lon);
    let mut x = haversine_distance_m(camera, along_parallel);
    if target.lon <= camera.lon {
        x = -x;
    }
    let along_meridian = GeoPoint::new(target.lat, camera.lon);
    let mut z = haversine_distance_m(camera, along_meridian);
    if target.lat > camera.lat {
        z = -z;
    }
    Vec3::new(x as f32, 0.0, z as f32)
}

/// Bounding box of a circular buffer of `radius_m` around `center`.
pub fn buffered_bounds(center: GeoPoint, radius_m: f64) -> GeoBounds {
    let north = rhumb_destination(center, radius_m, 0.0);
    let east = rhumb_destination(center, radius_m, 90.0);
    let south = rhumb_destination(center, radius_m, 180.0);
    let west = rhumb_destination(center, radius_m, 270.0);
    GeoBounds {
        west: west.lon,
        south: south.lat,
        east: east.lon,
        north: north.lat,
    }
}

/// Point feature closest to `point` by great-circle distance.
pub fn nearest_feature(point: GeoPoint, features: &[Feature]) -> Option<&Feature> {
    let mut best: Option<(&Feature, f64)> = None;
    for f in features {
        let Some(p) = f.point() else { continue };
        let d = haversine_distance_m(point, p);
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((f, d)),
        }
    }
    best.map(|(f, _)| f)
}
