//! flex-corridor: detour options for couriers on a planned trip.
//!
//! Given an origin, a destination and a set of pending pickup/dropoff jobs,
//! evaluates several detour budgets ("corridors" around the direct route)
//! and reports, per corridor, which jobs fit, how long the trip takes and
//! what it pays. Routing itself is delegated to a pluggable
//! [`RoutingGateway`](traits::RoutingGateway).

pub mod aggregate;
pub mod corridor;
pub mod error;
pub mod evaluator;
pub mod fallback;
pub mod geo;
pub mod haversine;
pub mod model;
pub mod osrm;
pub mod planner;
pub mod polyline;
pub mod traits;

pub use error::PlannerError;
pub use evaluator::{CancelToken, CorridorEvaluator, EvaluateOptions};
pub use model::{BaseRoute, Coordinate, CorridorConfig, CorridorFailure, CorridorResult, Job, TripOption};
pub use planner::{PlanState, PlannerOptions, TripInputs, TripPlanner};
pub use traits::RoutingGateway;
