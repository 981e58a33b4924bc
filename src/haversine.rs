//! Straight-line routing gateway (fallback when OSRM is unavailable).
//!
//! Uses great-circle distance and an assumed speed to estimate travel time.
//! Less accurate than OSRM (ignores roads) but always available.

use crate::error::PlannerError;
use crate::geo::great_circle_distance_km;
use crate::model::{BaseRoute, Coordinate};
use crate::polyline::Polyline;
use crate::traits::{check_waypoints, RoutingGateway};

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Great-circle routing gateway.
///
/// The route path is the waypoint list itself.
#[derive(Debug, Clone)]
pub struct HaversineRouter {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineRouter {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineRouter {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    fn km_to_seconds(&self, km: f64) -> f64 {
        (km / self.speed_kmh * 3600.0).round()
    }

    fn total_km(waypoints: &[Coordinate]) -> f64 {
        waypoints
            .windows(2)
            .map(|leg| great_circle_distance_km(leg[0], leg[1]))
            .sum()
    }

    fn check(&self, waypoints: &[Coordinate]) -> Result<(), PlannerError> {
        if !self.speed_kmh.is_finite() || self.speed_kmh <= 0.0 {
            return Err(PlannerError::invalid(format!(
                "haversine speed must be positive, got {}",
                self.speed_kmh
            )));
        }
        check_waypoints(waypoints)
    }
}

impl RoutingGateway for HaversineRouter {
    fn fetch_route_geometry(&self, waypoints: &[Coordinate]) -> Result<BaseRoute, PlannerError> {
        self.check(waypoints)?;
        Ok(BaseRoute {
            duration_secs: self.km_to_seconds(Self::total_km(waypoints)),
            path: Polyline::new(waypoints.to_vec()),
        })
    }

    fn fetch_route_duration(&self, waypoints: &[Coordinate]) -> Result<f64, PlannerError> {
        self.check(waypoints)?;
        Ok(self.km_to_seconds(Self::total_km(waypoints)))
    }
}
