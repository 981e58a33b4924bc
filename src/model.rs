//! Value types shared by the evaluator, the gateways and the planner.

use serde::{Deserialize, Serialize};

use crate::corridor::CorridorPolygon;
use crate::error::PlannerError;
use crate::polyline::Polyline;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Builds a coordinate, rejecting out-of-range or non-finite values.
    pub fn try_new(lng: f64, lat: f64) -> Result<Self, PlannerError> {
        let coordinate = Self { lng, lat };
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if !self.lng.is_finite() || !self.lat.is_finite() {
            return Err(PlannerError::invalid(format!(
                "coordinate ({}, {}) is not finite",
                self.lng, self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) || !(-90.0..=90.0).contains(&self.lat) {
            return Err(PlannerError::invalid(format!(
                "coordinate ({}, {}) is outside WGS84 bounds",
                self.lng, self.lat
            )));
        }
        Ok(())
    }
}

/// A pending delivery: pick up at one place, drop off at another, get paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub payout: f64,
}

impl Job {
    pub fn new(id: impl Into<String>, pickup: Coordinate, dropoff: Coordinate, payout: f64) -> Self {
        Self {
            id: id.into(),
            pickup,
            dropoff,
            payout,
        }
    }
}

/// A detour budget to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorConfig {
    pub id: String,
    pub label: String,
    /// Maximum perpendicular deviation from the direct route, in kilometers.
    pub max_deviation_km: f64,
}

impl CorridorConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>, max_deviation_km: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            max_deviation_km,
        }
    }

    /// The three detour budgets offered to couriers by default.
    pub fn presets() -> Vec<CorridorConfig> {
        vec![
            CorridorConfig::new("tight", "Tight detour", 5.0),
            CorridorConfig::new("balanced", "Balanced detour", 10.0),
            CorridorConfig::new("maximum", "Maximum detour", 15.0),
        ]
    }
}

/// The direct origin to destination route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRoute {
    pub duration_secs: f64,
    pub path: Polyline,
}

/// One candidate itinerary, the result of evaluating a single corridor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripOption {
    pub corridor_id: String,
    pub label: String,
    pub duration_secs: f64,
    /// Duration beyond the base route, never negative.
    pub extra_duration_secs: f64,
    pub job_count: usize,
    /// Qualifying job ids in input order.
    pub job_ids: Vec<String>,
    pub payout_total: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub corridor: Option<CorridorPolygon>,
}

impl TripOption {
    pub fn duration_minutes(&self) -> i64 {
        (self.duration_secs / 60.0).round() as i64
    }

    pub fn extra_minutes(&self) -> i64 {
        (self.extra_duration_secs / 60.0).round() as i64
    }
}

/// A corridor whose evaluation failed while others may have succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorFailure {
    pub corridor_id: String,
    pub label: String,
    pub error: PlannerError,
}

/// Per-corridor outcome in a batch.
pub type CorridorResult = Result<TripOption, CorridorFailure>;
