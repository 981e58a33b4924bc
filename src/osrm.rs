//! OSRM HTTP adapter for route durations and geometries.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::PlannerError;
use crate::model::{BaseRoute, Coordinate};
use crate::polyline::{Polyline, OSRM_PRECISION};
use crate::traits::{check_waypoints, RoutingGateway};

#[derive(Debug, Clone, PartialEq)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Reads `OSRM_BASE_URL`, `OSRM_PROFILE` and `OSRM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; missing keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("OSRM_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(profile) = lookup("OSRM_PROFILE") {
            config.profile = profile;
        }
        if let Some(raw) = lookup("OSRM_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => config.timeout_secs = secs,
                Err(_) => warn!(value = %raw, "ignoring unparseable OSRM_TIMEOUT_SECS"),
            }
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, PlannerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PlannerError::RoutingUnavailable(format!("cannot build HTTP client: {err}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn route_url(&self, waypoints: &[Coordinate], with_geometry: bool) -> String {
        let coords = waypoints
            .iter()
            .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");

        let query = if with_geometry {
            "overview=full&geometries=polyline6"
        } else {
            "overview=false"
        };

        format!(
            "{}/route/v1/{}/{}?{}",
            self.config.base_url, self.config.profile, coords, query
        )
    }

    fn request(&self, waypoints: &[Coordinate], with_geometry: bool) -> Result<OsrmRoute, PlannerError> {
        check_waypoints(waypoints)?;
        let url = self.route_url(waypoints, with_geometry);
        debug!(waypoints = waypoints.len(), with_geometry, "requesting OSRM route");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| PlannerError::RoutingUnavailable(format!("OSRM request failed: {err}")))?;

        // OSRM reports NoRoute with a 400 status, so read the body first.
        let status = response.status();
        match response.json::<OsrmRouteResponse>() {
            Ok(body) => first_route(body),
            Err(err) if status.is_success() => Err(PlannerError::RoutingUnavailable(format!(
                "malformed OSRM response: {err}"
            ))),
            Err(_) => Err(PlannerError::RoutingUnavailable(format!("OSRM returned HTTP {status}"))),
        }
    }
}

impl RoutingGateway for OsrmClient {
    fn fetch_route_geometry(&self, waypoints: &[Coordinate]) -> Result<BaseRoute, PlannerError> {
        let route = self.request(waypoints, true)?;
        let duration_secs = checked_duration(route.duration)?;
        let encoded = route.geometry.ok_or_else(|| {
            PlannerError::RoutingUnavailable("OSRM route is missing its geometry".to_string())
        })?;
        let path = Polyline::decode(&encoded, OSRM_PRECISION)
            .map_err(|err| PlannerError::RoutingUnavailable(format!("malformed OSRM geometry: {err}")))?;
        if path.len() < 2 {
            return Err(PlannerError::RoutingUnavailable(format!(
                "OSRM geometry has {} point(s)",
                path.len()
            )));
        }

        Ok(BaseRoute { duration_secs, path })
    }

    fn fetch_route_duration(&self, waypoints: &[Coordinate]) -> Result<f64, PlannerError> {
        let route = self.request(waypoints, false)?;
        checked_duration(route.duration)
    }
}

fn first_route(body: OsrmRouteResponse) -> Result<OsrmRoute, PlannerError> {
    let OsrmRouteResponse { code, message, routes } = body;
    match code.as_str() {
        "Ok" => routes
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::NoRouteFound("OSRM returned no routes".to_string())),
        "NoRoute" | "NoSegment" => Err(PlannerError::NoRouteFound(message.unwrap_or_else(|| code.clone()))),
        _ => Err(PlannerError::RoutingUnavailable(format!(
            "OSRM error {code}: {}",
            message.as_deref().unwrap_or("no message")
        ))),
    }
}

fn checked_duration(duration: f64) -> Result<f64, PlannerError> {
    if duration.is_finite() && duration >= 0.0 {
        Ok(duration)
    } else {
        Err(PlannerError::RoutingUnavailable(format!(
            "OSRM returned an invalid duration {duration}"
        )))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
    geometry: Option<String>,
}
