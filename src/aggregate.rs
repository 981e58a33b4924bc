//! Turns a corridor's raw routing result into a comparable trip option.

use tracing::error;

use crate::corridor::CorridorPolygon;
use crate::error::PlannerError;
use crate::model::{CorridorConfig, Job, TripOption};

/// Builds the trip option for one corridor.
///
/// Extra duration is clamped at zero: a waypoint route can come back a few
/// seconds faster than the direct one when the router picks a different path.
pub fn build_trip_option(
    config: &CorridorConfig,
    base_duration_secs: f64,
    option_duration_secs: f64,
    qualifying: &[&Job],
    corridor: Option<CorridorPolygon>,
) -> Result<TripOption, PlannerError> {
    check_duration(config, "base", base_duration_secs)?;
    check_duration(config, "option", option_duration_secs)?;

    let mut payout_total = 0.0;
    for job in qualifying {
        if !job.payout.is_finite() || job.payout < 0.0 {
            error!(corridor = %config.id, job = %job.id, payout = job.payout, "invalid payout");
            return Err(PlannerError::InvariantViolation(format!(
                "job {} has payout {}",
                job.id, job.payout
            )));
        }
        payout_total += job.payout;
    }

    Ok(TripOption {
        corridor_id: config.id.clone(),
        label: config.label.clone(),
        duration_secs: option_duration_secs,
        extra_duration_secs: (option_duration_secs - base_duration_secs).max(0.0),
        job_count: qualifying.len(),
        job_ids: qualifying.iter().map(|job| job.id.clone()).collect(),
        payout_total,
        corridor,
    })
}

fn check_duration(config: &CorridorConfig, kind: &str, secs: f64) -> Result<(), PlannerError> {
    if secs.is_finite() && secs >= 0.0 {
        return Ok(());
    }
    error!(corridor = %config.id, kind, secs, "invalid route duration");
    Err(PlannerError::InvariantViolation(format!(
        "{kind} duration {secs} for corridor {}",
        config.id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    fn job(id: &str, payout: f64) -> Job {
        Job::new(id, Coordinate::new(4.4, 50.6), Coordinate::new(4.41, 50.61), payout)
    }

    fn tight() -> CorridorConfig {
        CorridorConfig::new("tight", "Tight detour", 5.0)
    }

    #[test]
    fn sums_payout_and_counts_jobs() {
        let jobs = [job("a", 7.5), job("b", 12.0)];
        let refs: Vec<&Job> = jobs.iter().collect();
        let option = build_trip_option(&tight(), 2700.0, 3000.0, &refs, None).unwrap();
        assert_eq!(option.job_count, 2);
        assert_eq!(option.job_ids, vec!["a", "b"]);
        assert_eq!(option.payout_total, 19.5);
        assert_eq!(option.extra_duration_secs, 300.0);
        assert_eq!(option.duration_minutes(), 50);
        assert_eq!(option.extra_minutes(), 5);
    }

    #[test]
    fn faster_detour_clamps_extra_to_zero() {
        let jobs = [job("a", 3.0)];
        let refs: Vec<&Job> = jobs.iter().collect();
        let option = build_trip_option(&tight(), 2700.0, 2650.0, &refs, None).unwrap();
        assert_eq!(option.extra_duration_secs, 0.0);
        assert_eq!(option.duration_secs, 2650.0);
    }

    #[test]
    fn no_jobs_is_the_base_trip() {
        let option = build_trip_option(&tight(), 2700.0, 2700.0, &[], None).unwrap();
        assert_eq!(option.job_count, 0);
        assert_eq!(option.payout_total, 0.0);
        assert_eq!(option.extra_minutes(), 0);
        assert_eq!(option.duration_minutes(), 45);
    }

    #[test]
    fn negative_duration_is_an_invariant_violation() {
        let result = build_trip_option(&tight(), -1.0, 3000.0, &[], None);
        assert!(matches!(result, Err(PlannerError::InvariantViolation(_))));
        let result = build_trip_option(&tight(), 2700.0, f64::INFINITY, &[], None);
        assert!(matches!(result, Err(PlannerError::InvariantViolation(_))));
    }

    #[test]
    fn negative_payout_is_an_invariant_violation() {
        let jobs = [job("a", -2.0)];
        let refs: Vec<&Job> = jobs.iter().collect();
        assert!(matches!(
            build_trip_option(&tight(), 10.0, 20.0, &refs, None),
            Err(PlannerError::InvariantViolation(_))
        ));
    }
}
