//! Gateway combinator that falls back to a secondary oracle.

use tracing::warn;

use crate::error::PlannerError;
use crate::model::{BaseRoute, Coordinate};
use crate::traits::RoutingGateway;

/// Routes through `primary`, retrying on `secondary` when the primary is unreachable.
///
/// Only `RoutingUnavailable` triggers the fallback. A `NoRouteFound` answer
/// from a reachable primary is authoritative and returned as is.
#[derive(Debug, Clone)]
pub struct FallbackGateway<P, S> {
    pub primary: P,
    pub secondary: S,
}

impl<P, S> FallbackGateway<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: RoutingGateway, S: RoutingGateway> RoutingGateway for FallbackGateway<P, S> {
    fn fetch_route_geometry(&self, waypoints: &[Coordinate]) -> Result<BaseRoute, PlannerError> {
        match self.primary.fetch_route_geometry(waypoints) {
            Err(PlannerError::RoutingUnavailable(reason)) => {
                warn!(%reason, "primary routing unavailable, using fallback geometry");
                self.secondary.fetch_route_geometry(waypoints)
            }
            other => other,
        }
    }

    fn fetch_route_duration(&self, waypoints: &[Coordinate]) -> Result<f64, PlannerError> {
        match self.primary.fetch_route_duration(waypoints) {
            Err(PlannerError::RoutingUnavailable(reason)) => {
                warn!(%reason, "primary routing unavailable, using fallback duration");
                self.secondary.fetch_route_duration(waypoints)
            }
            other => other,
        }
    }
}
