//! Corridor construction and membership.
//!
//! A corridor is the union of convex "capsules", one per path sub-segment.
//! Each capsule is built in a local equirectangular frame centred on its
//! sub-segment. That frame is affine in (lng, lat), so ray casting directly
//! on degree coordinates agrees exactly with the frame the capsule was
//! built in.
//!
//! Tolerance: the capsule radius is `width_km * (1 + BUFFER_TOLERANCE)` and
//! the end caps are circumscribed polygons, so every point within `width_km`
//! great-circle distance of the path is inside, and no point farther than
//! roughly `1.04 * width_km` is. Sub-segments are capped at
//! `MAX_SUBSEGMENT_KM` which keeps the frame distortion under half a percent
//! for mid-latitude corridors up to ~50 km wide. Paths crossing the
//! antimeridian are not supported.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::geo::{great_circle_distance_km, KM_PER_DEGREE};
use crate::model::Coordinate;

/// Relative inflation applied to the requested width.
pub const BUFFER_TOLERANCE: f64 = 0.02;

/// Longest path piece covered by a single capsule.
pub const MAX_SUBSEGMENT_KM: f64 = 25.0;

/// Polygon steps per half turn of an end cap.
const ARC_STEPS: usize = 8;

/// Lower bound for `cos(lat)` so frames near the poles stay invertible.
const MIN_COS_LAT: f64 = 1e-6;

/// Buffered region around a route path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorPolygon {
    width_km: f64,
    /// Closed rings (first == last); a point is inside if any ring contains it.
    rings: Vec<Vec<Coordinate>>,
    #[serde(skip)]
    bounds: Vec<Bounds>,
}

impl CorridorPolygon {
    pub fn width_km(&self) -> f64 {
        self.width_km
    }

    pub fn rings(&self) -> &[Vec<Coordinate>] {
        &self.rings
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point_in_polygon(point, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_lng: f64,
    min_lat: f64,
    max_lng: f64,
    max_lat: f64,
}

impl Bounds {
    fn of(ring: &[Coordinate]) -> Self {
        ring.iter().fold(
            Bounds {
                min_lng: f64::INFINITY,
                min_lat: f64::INFINITY,
                max_lng: f64::NEG_INFINITY,
                max_lat: f64::NEG_INFINITY,
            },
            |b, p| Bounds {
                min_lng: b.min_lng.min(p.lng),
                min_lat: b.min_lat.min(p.lat),
                max_lng: b.max_lng.max(p.lng),
                max_lat: b.max_lat.max(p.lat),
            },
        )
    }

    fn contains(&self, p: Coordinate) -> bool {
        p.lng >= self.min_lng && p.lng <= self.max_lng && p.lat >= self.min_lat && p.lat <= self.max_lat
    }
}

/// Builds a corridor enclosing every point within `width_km` of `path`.
pub fn build_corridor(path: &[Coordinate], width_km: f64) -> Result<CorridorPolygon, PlannerError> {
    if path.len() < 2 {
        return Err(PlannerError::invalid(format!(
            "corridor path needs at least 2 points, got {}",
            path.len()
        )));
    }
    if !width_km.is_finite() || width_km <= 0.0 {
        return Err(PlannerError::invalid(format!(
            "corridor width must be positive, got {width_km}"
        )));
    }
    for point in path {
        point.validate()?;
    }

    let radius = width_km * (1.0 + BUFFER_TOLERANCE);
    let mut rings = Vec::new();

    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let pieces = (great_circle_distance_km(a, b) / MAX_SUBSEGMENT_KM).ceil().max(1.0) as usize;
        for k in 0..pieces {
            let start = lerp(a, b, k as f64 / pieces as f64);
            let end = lerp(a, b, (k + 1) as f64 / pieces as f64);
            rings.push(capsule(start, end, radius));
        }
    }

    let bounds = rings.iter().map(|ring| Bounds::of(ring)).collect();

    Ok(CorridorPolygon {
        width_km,
        rings,
        bounds,
    })
}

/// Whether `point` lies inside any ring of the corridor.
///
/// Boundary points follow the half-open edge rule of [`point_in_ring`], so
/// repeated calls with identical inputs always agree.
pub fn point_in_polygon(point: Coordinate, polygon: &CorridorPolygon) -> bool {
    polygon.rings.iter().enumerate().any(|(i, ring)| {
        let in_bounds = polygon.bounds.get(i).map_or(true, |b| b.contains(point));
        in_bounds && point_in_ring(point, ring)
    })
}

/// Ray casting against a single ring, treating degrees as planar.
pub fn point_in_ring(point: Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (pi, pj) = (ring[i], ring[j]);
        if (pi.lat > point.lat) != (pj.lat > point.lat) {
            let x_cross = (pj.lng - pi.lng) * (point.lat - pi.lat) / (pj.lat - pi.lat) + pi.lng;
            if point.lng < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn lerp(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate::new(a.lng + (b.lng - a.lng) * t, a.lat + (b.lat - a.lat) * t)
}

/// Convex ring around segment `a`-`b` containing every point within `radius` km.
fn capsule(a: Coordinate, b: Coordinate, radius: f64) -> Vec<Coordinate> {
    let lng0 = (a.lng + b.lng) / 2.0;
    let lat0 = (a.lat + b.lat) / 2.0;
    let kx = KM_PER_DEGREE * lat0.to_radians().cos().max(MIN_COS_LAT);
    let ky = KM_PER_DEGREE;

    let (ax, ay) = ((a.lng - lng0) * kx, (a.lat - lat0) * ky);
    let (bx, by) = ((b.lng - lng0) * kx, (b.lat - lat0) * ky);
    let (dx, dy) = (bx - ax, by - ay);
    let heading = if dx.hypot(dy) > 1e-9 { dy.atan2(dx) } else { 0.0 };

    let step = PI / ARC_STEPS as f64;
    // Chords of the cap polygon stay tangent to the true circle.
    let vertex_radius = radius / (step / 2.0).cos();
    let to_coord = |x: f64, y: f64| Coordinate::new(lng0 + x / kx, lat0 + y / ky);

    let mut ring = Vec::with_capacity(2 * (ARC_STEPS + 1) + 1);
    for k in 0..=ARC_STEPS {
        let t = heading - FRAC_PI_2 + k as f64 * step;
        ring.push(to_coord(bx + vertex_radius * t.cos(), by + vertex_radius * t.sin()));
    }
    for k in 0..=ARC_STEPS {
        let t = heading + FRAC_PI_2 + k as f64 * step;
        ring.push(to_coord(ax + vertex_radius * t.cos(), ay + vertex_radius * t.sin()));
    }
    ring.push(ring[0]);
    ring
}
