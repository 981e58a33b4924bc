//! Error taxonomy for corridor evaluation.
//!
//! Transport-level failures never leave the gateway that produced them; by the
//! time an error reaches the evaluator or the planner it is one of these.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// The routing service could not be reached (network, timeout, bad payload).
    #[error("routing service unavailable: {0}")]
    RoutingUnavailable(String),

    /// The routing service answered but found no drivable route.
    #[error("no route found: {0}")]
    NoRouteFound(String),

    /// Malformed caller input (bad coordinates, non-positive width, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal consistency check failed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The evaluation was superseded before it finished.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl PlannerError {
    /// Whether retrying with the same inputs can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlannerError::RoutingUnavailable(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PlannerError::InvalidInput(msg.into())
    }
}
