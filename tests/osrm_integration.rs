//! Live OSRM round trip.
//!
//! Needs Docker and a prepared MLD dataset: `OSRM_DATA_DIR` must contain
//! `<OSRM_DATASET>.osrm*` files (default dataset `belgium-latest`). Run with
//! `cargo test -- --ignored`.

mod fixtures;

use std::env;
use std::path::PathBuf;

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, ReuseDirective, TestcontainersError};

use flex_corridor::osrm::{OsrmClient, OsrmConfig};
use flex_corridor::{CorridorConfig, CorridorEvaluator, EvaluateOptions, PlannerError, RoutingGateway};

use fixtures::{destination, job_off_route, origin};

fn osrm_container() -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let data_dir = env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data/belgium".to_string());
    let dataset = env::var("OSRM_DATASET").unwrap_or_else(|_| "belgium-latest".to_string());
    let data_dir = PathBuf::from(data_dir);
    let data_dir = if data_dir.is_absolute() {
        data_dir
    } else {
        env::current_dir()
            .map_err(|err| TestcontainersError::other(format!("no working directory: {err}")))?
            .join(data_dir)
    };

    let partition = data_dir.join(format!("{dataset}.osrm.partition"));
    let mtime = std::fs::metadata(&partition)
        .and_then(|meta| meta.modified())
        .map_err(|err| TestcontainersError::other(format!("OSRM dataset missing at {}: {err}", partition.display())))?
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0);

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{dataset}.osrm"),
        ])
        .with_container_name(format!("osrm-{dataset}-mld-{mtime}"))
        .with_startup_timeout(std::time::Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{port}")))
}

/// Retries while osrm-routed is still loading its dataset.
fn wait_for_route(client: &OsrmClient) -> Result<f64, PlannerError> {
    let start = std::time::Instant::now();
    loop {
        match client.fetch_route_duration(&[origin(), destination()]) {
            Err(PlannerError::RoutingUnavailable(_)) if start.elapsed() < std::time::Duration::from_secs(15) => {
                std::thread::sleep(std::time::Duration::from_millis(500));
            }
            other => return other,
        }
    }
}

#[test]
#[ignore = "requires Docker and a prepared OSRM dataset"]
fn osrm_routes_brussels_to_charleroi() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = OsrmClient::new(OsrmConfig {
        base_url,
        ..OsrmConfig::default()
    })
    .expect("build OSRM client");

    let direct = wait_for_route(&client).expect("direct route");
    // Roughly 50 km of motorway and national road.
    assert!(direct > 1800.0 && direct < 5400.0, "unexpected duration {direct}");

    let base = client
        .fetch_route_geometry(&[origin(), destination()])
        .expect("base geometry");
    assert!(base.path.len() > 10);

    let evaluator = CorridorEvaluator::new(&client, EvaluateOptions::default()).expect("build evaluator");
    let jobs = vec![job_off_route("near", 1.0, 10.0)];
    let results = evaluator
        .evaluate(origin(), destination(), &jobs, &CorridorConfig::presets())
        .expect("evaluate corridors");

    assert_eq!(results.len(), 3);
    for result in &results {
        let option = result.as_ref().expect("corridor option");
        assert!(option.duration_secs >= 0.0);
        assert!(option.extra_duration_secs >= 0.0);
    }

    drop(container);
}
