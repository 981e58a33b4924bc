//! Corridor evaluation: which jobs fit each detour budget, and what they cost.
//!
//! For every corridor the evaluator buffers the base route, keeps the jobs
//! whose pickup and dropoff both fall inside, and asks the gateway how long
//! the trip takes with those stops. Waypoints are ordered as all pickups then
//! all dropoffs, each in job-list order. That ordering is a fixed heuristic,
//! not a solved routing problem.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregate::build_trip_option;
use crate::corridor::{build_corridor, point_in_polygon, CorridorPolygon};
use crate::error::PlannerError;
use crate::model::{BaseRoute, Coordinate, CorridorConfig, CorridorFailure, CorridorResult, Job, TripOption};
use crate::traits::RoutingGateway;

#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    /// Upper bound on routing calls in flight at once.
    pub max_concurrent_requests: usize,
    /// Attach each corridor polygon to its trip option (for map display).
    pub include_corridor_geometry: bool,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            // Couriers are offered a handful of corridors; one call each.
            max_concurrent_requests: 5,
            include_corridor_geometry: false,
        }
    }
}

/// Cooperative cancellation flag shared between a caller and an evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), PlannerError> {
        if self.is_cancelled() {
            Err(PlannerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct CorridorEvaluator<G> {
    gateway: G,
    options: EvaluateOptions,
    pool: rayon::ThreadPool,
}

impl<G: RoutingGateway> CorridorEvaluator<G> {
    pub fn new(gateway: G, options: EvaluateOptions) -> Result<Self, PlannerError> {
        if options.max_concurrent_requests == 0 {
            return Err(PlannerError::invalid("max_concurrent_requests must be at least 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_concurrent_requests)
            .thread_name(|i| format!("corridor-eval-{i}"))
            .build()
            .map_err(|err| PlannerError::InvariantViolation(format!("cannot start evaluation pool: {err}")))?;

        Ok(Self {
            gateway,
            options,
            pool,
        })
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn options(&self) -> &EvaluateOptions {
        &self.options
    }

    /// Evaluates every corridor against the same base route and job set.
    ///
    /// The outer error aborts the batch (bad input, no base route). Inner
    /// entries are per-corridor and come back in `corridors` order.
    pub fn evaluate(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        jobs: &[Job],
        corridors: &[CorridorConfig],
    ) -> Result<Vec<CorridorResult>, PlannerError> {
        self.evaluate_with_cancel(origin, destination, jobs, corridors, &CancelToken::new())
    }

    /// Like [`evaluate`](Self::evaluate), giving up with `Cancelled` once `cancel` trips.
    pub fn evaluate_with_cancel(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        jobs: &[Job],
        corridors: &[CorridorConfig],
        cancel: &CancelToken,
    ) -> Result<Vec<CorridorResult>, PlannerError> {
        validate_inputs(origin, destination, jobs, corridors)?;
        if corridors.is_empty() {
            return Ok(Vec::new());
        }

        cancel.check()?;
        let base = self.gateway.fetch_route_geometry(&[origin, destination])?;
        if base.path.len() < 2 {
            return Err(PlannerError::InvariantViolation(format!(
                "base route geometry has {} point(s)",
                base.path.len()
            )));
        }
        info!(
            duration_secs = base.duration_secs,
            path_points = base.path.len(),
            jobs = jobs.len(),
            corridors = corridors.len(),
            "base route fetched"
        );
        cancel.check()?;

        // Collecting an indexed parallel iterator keeps input order.
        let results: Vec<CorridorResult> = self.pool.install(|| {
            corridors
                .par_iter()
                .map(|config| {
                    self.evaluate_corridor(origin, destination, jobs, config, &base, cancel)
                        .map_err(|error| CorridorFailure {
                            corridor_id: config.id.clone(),
                            label: config.label.clone(),
                            error,
                        })
                })
                .collect()
        });

        cancel.check()?;
        log_non_monotone(corridors, &results);
        Ok(results)
    }

    fn evaluate_corridor(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        jobs: &[Job],
        config: &CorridorConfig,
        base: &BaseRoute,
        cancel: &CancelToken,
    ) -> Result<TripOption, PlannerError> {
        let corridor = build_corridor(base.path.points(), config.max_deviation_km)?;
        let qualifying = qualifying_jobs(jobs, &corridor);
        let geometry = self.options.include_corridor_geometry.then_some(corridor);

        if qualifying.is_empty() {
            debug!(corridor = %config.id, "no qualifying jobs, reusing base route");
            return build_trip_option(config, base.duration_secs, base.duration_secs, &[], geometry);
        }

        cancel.check()?;
        let waypoints = detour_waypoints(origin, destination, &qualifying);
        let duration = self.gateway.fetch_route_duration(&waypoints).inspect_err(|err| {
            warn!(corridor = %config.id, error = %err, "corridor routing failed");
        })?;
        debug!(
            corridor = %config.id,
            qualifying = qualifying.len(),
            duration_secs = duration,
            "corridor evaluated"
        );

        build_trip_option(config, base.duration_secs, duration, &qualifying, geometry)
    }
}

/// Jobs whose pickup and dropoff both lie inside `corridor`, in input order.
///
/// A job with a single endpoint inside is excluded; partial detours are not
/// modelled.
pub fn qualifying_jobs<'a>(jobs: &'a [Job], corridor: &CorridorPolygon) -> Vec<&'a Job> {
    jobs.iter()
        .filter(|job| point_in_polygon(job.pickup, corridor) && point_in_polygon(job.dropoff, corridor))
        .collect()
}

/// `[origin, pickups.., dropoffs.., destination]`, both groups in job order.
pub fn detour_waypoints(origin: Coordinate, destination: Coordinate, jobs: &[&Job]) -> Vec<Coordinate> {
    let mut waypoints = Vec::with_capacity(jobs.len() * 2 + 2);
    waypoints.push(origin);
    waypoints.extend(jobs.iter().map(|job| job.pickup));
    waypoints.extend(jobs.iter().map(|job| job.dropoff));
    waypoints.push(destination);
    waypoints
}

fn validate_inputs(
    origin: Coordinate,
    destination: Coordinate,
    jobs: &[Job],
    corridors: &[CorridorConfig],
) -> Result<(), PlannerError> {
    origin.validate()?;
    destination.validate()?;

    let mut job_ids = HashSet::new();
    for job in jobs {
        if job.id.is_empty() {
            return Err(PlannerError::invalid("job with empty id"));
        }
        if !job_ids.insert(job.id.as_str()) {
            return Err(PlannerError::invalid(format!("duplicate job id {}", job.id)));
        }
        job.pickup.validate()?;
        job.dropoff.validate()?;
        if !job.payout.is_finite() || job.payout < 0.0 {
            return Err(PlannerError::invalid(format!("job {} has payout {}", job.id, job.payout)));
        }
    }

    let mut corridor_ids = HashSet::new();
    for config in corridors {
        if config.id.is_empty() {
            return Err(PlannerError::invalid("corridor with empty id"));
        }
        if !corridor_ids.insert(config.id.as_str()) {
            return Err(PlannerError::invalid(format!("duplicate corridor id {}", config.id)));
        }
        if !config.max_deviation_km.is_finite() || config.max_deviation_km <= 0.0 {
            return Err(PlannerError::invalid(format!(
                "corridor {} has deviation {}",
                config.id, config.max_deviation_km
            )));
        }
    }

    Ok(())
}

/// Wider corridors are expected to cost at least as much extra time.
fn log_non_monotone(corridors: &[CorridorConfig], results: &[CorridorResult]) {
    let mut ok: Vec<(f64, f64, &str)> = corridors
        .iter()
        .zip(results)
        .filter_map(|(config, result)| {
            result
                .as_ref()
                .ok()
                .map(|option| (config.max_deviation_km, option.extra_duration_secs, config.id.as_str()))
        })
        .collect();
    ok.sort_by(|a, b| a.0.total_cmp(&b.0));

    for pair in ok.windows(2) {
        if pair[1].1 < pair[0].1 {
            debug!(
                narrower = pair[0].2,
                wider = pair[1].2,
                "extra duration shrinks as the corridor widens"
            );
        }
    }
}
