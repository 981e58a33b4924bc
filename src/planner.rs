//! Reactive trip planning.
//!
//! [`TripPlanner`] holds the current trip inputs and re-runs the corridor
//! evaluator whenever they change. Every trigger bumps a generation counter
//! and cancels the previous evaluation; a finished evaluation is published
//! only if its generation is still the current one, so a slow, stale
//! evaluation can never overwrite a newer result.
//!
//! States move `Idle -> Loading -> (Ready | Error)`, and any new trigger
//! returns to `Loading`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::PlannerError;
use crate::evaluator::{CancelToken, CorridorEvaluator};
use crate::model::{Coordinate, CorridorConfig, CorridorResult, Job};
use crate::traits::RoutingGateway;

#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Quiet period after an input change before evaluating.
    pub debounce: Duration,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
        }
    }
}

/// Everything an evaluation depends on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TripInputs {
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub jobs: Vec<Job>,
    pub corridors: Vec<CorridorConfig>,
}

impl TripInputs {
    pub fn new(
        origin: Coordinate,
        destination: Coordinate,
        jobs: Vec<Job>,
        corridors: Vec<CorridorConfig>,
    ) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            jobs,
            corridors,
        }
    }

    /// Origin and destination, if the inputs are complete enough to evaluate.
    fn endpoints(&self) -> Option<(Coordinate, Coordinate)> {
        match (self.origin, self.destination) {
            (Some(origin), Some(destination)) if !self.corridors.is_empty() => Some((origin, destination)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanState {
    /// Inputs are incomplete; nothing to evaluate.
    Idle,
    Loading,
    /// Last successful evaluation, one entry per corridor in input order.
    Ready(Vec<CorridorResult>),
    /// Last evaluation failed as a whole, or every corridor failed.
    Error(PlannerError),
}

impl PlanState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PlanState::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&PlanState) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    /// Sequence number of the subscriber's initial delivery.
    since: u64,
    callback: Callback,
}

/// A state waiting to be handed to subscribers.
struct Delivery {
    seq: u64,
    state: PlanState,
    /// `Some` for the initial call made by `subscribe`.
    only: Option<SubscriptionId>,
}

struct Shared {
    inputs: TripInputs,
    generation: u64,
    cancel: Option<CancelToken>,
    state: PlanState,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
    published: u64,
    pending: VecDeque<Delivery>,
    delivering: bool,
}

impl Shared {
    fn publish(&mut self, state: PlanState) {
        self.state = state.clone();
        self.enqueue(state, None);
    }

    fn enqueue(&mut self, state: PlanState, only: Option<SubscriptionId>) -> u64 {
        self.published += 1;
        self.pending.push_back(Delivery {
            seq: self.published,
            state,
            only,
        });
        self.published
    }

    fn recipients(&self, delivery: &Delivery) -> Vec<Callback> {
        self.subscribers
            .iter()
            .filter(|sub| match delivery.only {
                Some(id) => sub.id == id,
                None => sub.since < delivery.seq,
            })
            .map(|sub| Arc::clone(&sub.callback))
            .collect()
    }

    fn is_settled(&self) -> bool {
        !self.state.is_loading() && !self.delivering && self.pending.is_empty()
    }
}

struct Inner<G> {
    evaluator: CorridorEvaluator<G>,
    options: PlannerOptions,
    shared: Mutex<Shared>,
    settled: Condvar,
    in_flight: AtomicUsize,
}

impl<G: RoutingGateway> Inner<G> {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands queued states to subscribers with the lock released.
    ///
    /// Only one thread drains the queue at a time. A state published while
    /// another thread is delivering (including from inside a callback) is
    /// picked up by that thread, so subscribers see states in publication
    /// order.
    fn deliver<'a>(&'a self, mut shared: MutexGuard<'a, Shared>) {
        if shared.delivering {
            return;
        }
        shared.delivering = true;
        while let Some(delivery) = shared.pending.pop_front() {
            let callbacks = shared.recipients(&delivery);
            drop(shared);
            for callback in &callbacks {
                callback(&delivery.state);
            }
            shared = self.lock();
        }
        shared.delivering = false;
        drop(shared);
        self.settled.notify_all();
    }

    fn run(&self, generation: u64, inputs: TripInputs, endpoints: (Coordinate, Coordinate), cancel: CancelToken) {
        if !self.options.debounce.is_zero() {
            thread::sleep(self.options.debounce);
            if cancel.is_cancelled() {
                debug!(generation, "superseded during debounce");
                return;
            }
        }

        let (origin, destination) = endpoints;
        let outcome = self
            .evaluator
            .evaluate_with_cancel(origin, destination, &inputs.jobs, &inputs.corridors, &cancel);
        self.finish(generation, outcome);
    }

    fn finish(&self, generation: u64, outcome: Result<Vec<CorridorResult>, PlannerError>) {
        let mut shared = self.lock();
        if shared.generation != generation {
            debug!(generation, current = shared.generation, "discarding stale evaluation");
            return;
        }

        let state = match outcome {
            Ok(results) => match every_corridor_failed(&results) {
                Some(error) => {
                    warn!(%error, "every corridor failed");
                    PlanState::Error(error)
                }
                None => {
                    info!(generation, corridors = results.len(), "trip options ready");
                    PlanState::Ready(results)
                }
            },
            // Only dropping the planner cancels the live generation.
            Err(PlannerError::Cancelled) => {
                debug!(generation, "evaluation cancelled");
                PlanState::Error(PlannerError::Cancelled)
            }
            Err(error) => {
                warn!(generation, %error, "trip evaluation failed");
                PlanState::Error(error)
            }
        };

        shared.cancel = None;
        shared.publish(state);
        self.deliver(shared);
    }
}

fn every_corridor_failed(results: &[CorridorResult]) -> Option<PlannerError> {
    if results.iter().any(Result::is_ok) {
        return None;
    }
    results
        .iter()
        .find_map(|result| result.as_ref().err())
        .map(|failure| failure.error.clone())
}

/// Keeps trip options up to date with changing inputs.
///
/// Subscriber callbacks run on whichever thread changed the state, outside
/// the planner's lock, so a callback may call back into the planner (for
/// example `refetch()` after an `Error`).
pub struct TripPlanner<G> {
    inner: Arc<Inner<G>>,
}

impl<G: RoutingGateway + 'static> TripPlanner<G> {
    pub fn new(evaluator: CorridorEvaluator<G>, options: PlannerOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                evaluator,
                options,
                shared: Mutex::new(Shared {
                    inputs: TripInputs::default(),
                    generation: 0,
                    cancel: None,
                    state: PlanState::Idle,
                    subscribers: Vec::new(),
                    next_subscription: 0,
                    published: 0,
                    pending: VecDeque::new(),
                    delivering: false,
                }),
                settled: Condvar::new(),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn evaluator(&self) -> &CorridorEvaluator<G> {
        &self.inner.evaluator
    }

    pub fn state(&self) -> PlanState {
        self.inner.lock().state.clone()
    }

    pub fn inputs(&self) -> TripInputs {
        self.inner.lock().inputs.clone()
    }

    /// Evaluations whose worker thread has not finished yet, stale ones included.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Registers `callback`; it is called once with the current state right away.
    ///
    /// From inside another callback, that first call happens once the
    /// callback in progress returns.
    pub fn subscribe(&self, callback: impl Fn(&PlanState) + Send + Sync + 'static) -> SubscriptionId {
        let mut shared = self.inner.lock();
        let id = SubscriptionId(shared.next_subscription);
        shared.next_subscription += 1;
        let current = shared.state.clone();
        let since = shared.enqueue(current, Some(id));
        shared.subscribers.push(Subscriber {
            id,
            since,
            callback: Arc::new(callback),
        });
        self.inner.deliver(shared);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscribers.retain(|sub| sub.id != id);
    }

    pub fn set_inputs(&self, inputs: TripInputs) {
        self.update(|current| *current = inputs);
    }

    pub fn set_origin(&self, origin: Coordinate) {
        self.update(|current| current.origin = Some(origin));
    }

    pub fn set_destination(&self, destination: Coordinate) {
        self.update(|current| current.destination = Some(destination));
    }

    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.update(|current| current.jobs = jobs);
    }

    pub fn set_corridors(&self, corridors: Vec<CorridorConfig>) {
        self.update(|current| current.corridors = corridors);
    }

    /// Re-evaluates the current inputs even if nothing changed.
    pub fn refetch(&self) {
        let shared = self.inner.lock();
        self.trigger(shared);
    }

    /// Blocks until the state leaves `Loading` and subscribers have been told,
    /// or `timeout` elapses.
    pub fn wait_until_settled(&self, timeout: Duration) -> PlanState {
        let shared = self.inner.lock();
        let (shared, _) = self
            .inner
            .settled
            .wait_timeout_while(shared, timeout, |s| !s.is_settled())
            .unwrap_or_else(PoisonError::into_inner);
        shared.state.clone()
    }

    fn update(&self, apply: impl FnOnce(&mut TripInputs)) {
        let mut shared = self.inner.lock();
        let mut next = shared.inputs.clone();
        apply(&mut next);
        if next == shared.inputs {
            return;
        }
        shared.inputs = next;
        self.trigger(shared);
    }

    fn trigger(&self, mut shared: MutexGuard<'_, Shared>) {
        shared.generation += 1;
        let generation = shared.generation;
        if let Some(previous) = shared.cancel.take() {
            previous.cancel();
        }

        let Some(endpoints) = shared.inputs.endpoints() else {
            shared.publish(PlanState::Idle);
            self.inner.deliver(shared);
            return;
        };

        let cancel = CancelToken::new();
        shared.cancel = Some(cancel.clone());
        let inputs = shared.inputs.clone();
        shared.publish(PlanState::Loading);
        self.inner.deliver(shared);

        debug!(generation, "starting trip evaluation");
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name(format!("trip-planner-{generation}"))
            .spawn(move || {
                inner.run(generation, inputs, endpoints, cancel);
                inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            });

        if let Err(err) = spawned {
            self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.finish(
                generation,
                Err(PlannerError::InvariantViolation(format!("cannot spawn evaluation: {err}"))),
            );
        }
    }
}

impl<G> Drop for TripPlanner<G> {
    fn drop(&mut self) {
        let mut shared = self.inner.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = shared.cancel.take() {
            cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluateOptions;
    use crate::haversine::HaversineRouter;

    const BRUSSELS: Coordinate = Coordinate::new(4.35, 50.85);
    const CHARLEROI: Coordinate = Coordinate::new(4.46, 50.41);

    fn planner() -> TripPlanner<HaversineRouter> {
        let evaluator = CorridorEvaluator::new(HaversineRouter::default(), EvaluateOptions::default()).unwrap();
        TripPlanner::new(
            evaluator,
            PlannerOptions {
                debounce: Duration::ZERO,
            },
        )
    }

    #[test]
    fn starts_idle() {
        assert_eq!(planner().state(), PlanState::Idle);
    }

    #[test]
    fn incomplete_inputs_stay_idle() {
        let planner = planner();
        planner.set_origin(BRUSSELS);
        assert_eq!(planner.state(), PlanState::Idle);
        planner.set_destination(CHARLEROI);
        // Still no corridors.
        assert_eq!(planner.state(), PlanState::Idle);
        assert_eq!(planner.in_flight(), 0);
    }

    #[test]
    fn completing_inputs_produces_options() {
        let planner = planner();
        planner.set_origin(BRUSSELS);
        planner.set_destination(CHARLEROI);
        planner.set_corridors(CorridorConfig::presets());
        match planner.wait_until_settled(Duration::from_secs(5)) {
            PlanState::Ready(results) => assert_eq!(results.len(), 3),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn invalid_inputs_surface_as_error() {
        let planner = planner();
        planner.set_inputs(TripInputs::new(
            BRUSSELS,
            CHARLEROI,
            Vec::new(),
            vec![CorridorConfig::new("bad", "Bad", -1.0)],
        ));
        assert!(matches!(
            planner.wait_until_settled(Duration::from_secs(5)),
            PlanState::Error(PlannerError::InvalidInput(_))
        ));
    }

    #[test]
    fn every_corridor_failed_picks_first_error() {
        let failure = |id: &str, error: PlannerError| {
            Err(crate::model::CorridorFailure {
                corridor_id: id.to_string(),
                label: id.to_string(),
                error,
            })
        };
        let results: Vec<CorridorResult> = vec![
            failure("a", PlannerError::NoRouteFound("a".into())),
            failure("b", PlannerError::RoutingUnavailable("b".into())),
        ];
        assert_eq!(
            every_corridor_failed(&results),
            Some(PlannerError::NoRouteFound("a".into()))
        );
        assert_eq!(every_corridor_failed(&[]), None);
    }
}
