//! The routing contract the corridor evaluator depends on.
//!
//! Any driving-directions backend can be plugged in. Implementations must
//! translate their own transport failures into [`PlannerError`] before
//! returning.

use std::sync::Arc;

use crate::error::PlannerError;
use crate::model::{BaseRoute, Coordinate};

/// A driving-route oracle for ordered waypoint lists.
///
/// Calls are expected to be slow and fallible. Callers always pass at least
/// two waypoints.
pub trait RoutingGateway: Send + Sync {
    /// Route through `waypoints` in order, with its full path geometry.
    fn fetch_route_geometry(&self, waypoints: &[Coordinate]) -> Result<BaseRoute, PlannerError>;

    /// Duration in seconds of the route through `waypoints` in order.
    fn fetch_route_duration(&self, waypoints: &[Coordinate]) -> Result<f64, PlannerError>;
}

impl<T: RoutingGateway + ?Sized> RoutingGateway for &T {
    fn fetch_route_geometry(&self, waypoints: &[Coordinate]) -> Result<BaseRoute, PlannerError> {
        (**self).fetch_route_geometry(waypoints)
    }

    fn fetch_route_duration(&self, waypoints: &[Coordinate]) -> Result<f64, PlannerError> {
        (**self).fetch_route_duration(waypoints)
    }
}

impl<T: RoutingGateway + ?Sized> RoutingGateway for Arc<T> {
    fn fetch_route_geometry(&self, waypoints: &[Coordinate]) -> Result<BaseRoute, PlannerError> {
        (**self).fetch_route_geometry(waypoints)
    }

    fn fetch_route_duration(&self, waypoints: &[Coordinate]) -> Result<f64, PlannerError> {
        (**self).fetch_route_duration(waypoints)
    }
}

/// Rejects waypoint lists a gateway cannot route.
pub(crate) fn check_waypoints(waypoints: &[Coordinate]) -> Result<(), PlannerError> {
    if waypoints.len() < 2 {
        return Err(PlannerError::invalid(format!(
            "routing needs at least 2 waypoints, got {}",
            waypoints.len()
        )));
    }
    waypoints.iter().try_for_each(Coordinate::validate)
}
