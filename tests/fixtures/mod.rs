//! Test fixtures for flex-corridor.
//!
//! Provides:
//! - Real Belgian locations (from OpenStreetMap)
//! - Helpers that place job endpoints at a known distance off the direct path
//! - Builders for jobs

#![allow(dead_code)]

pub mod belgium_locations;

pub use belgium_locations::*;

use flex_corridor::geo::{destination_point, initial_bearing_deg};
use flex_corridor::{Coordinate, Job};

pub fn origin() -> Coordinate {
    BRUSSELS.coords()
}

pub fn destination() -> Coordinate {
    CHARLEROI.coords()
}

/// Point at fraction `t` along Brussels -> Charleroi, pushed `km` to the east side.
pub fn off_route(t: f64, km: f64) -> Coordinate {
    let (a, b) = (origin(), destination());
    let base = Coordinate::new(a.lng + (b.lng - a.lng) * t, a.lat + (b.lat - a.lat) * t);
    if km == 0.0 {
        return base;
    }
    destination_point(base, initial_bearing_deg(a, b) - 90.0, km)
}

/// A job whose pickup and dropoff both sit `km` off the direct path near its middle.
pub fn job_off_route(id: &str, km: f64, payout: f64) -> Job {
    Job::new(id, off_route(0.45, km), off_route(0.55, km), payout)
}
