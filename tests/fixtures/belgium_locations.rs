//! Belgian locations around the Brussels - Charleroi corridor.
//!
//! Coordinates are approximate city-centre positions from OpenStreetMap.

use flex_corridor::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> Coordinate {
        Coordinate::new(self.lng, self.lat)
    }
}

pub const BRUSSELS: Location = Location::new("Brussels", 50.85, 4.35);
pub const CHARLEROI: Location = Location::new("Charleroi", 50.41, 4.46);
pub const HALLE: Location = Location::new("Halle", 50.7339, 4.2345);

// ============================================================================
// Towns along the N5 / E19 between Brussels and Charleroi
// ============================================================================

pub const ALONG_ROUTE: &[Location] = &[
    Location::new("Waterloo", 50.7148, 4.3992),
    Location::new("Braine-l'Alleud", 50.6836, 4.3681),
    Location::new("Genappe", 50.6116, 4.4514),
    Location::new("Nivelles", 50.5983, 4.3285),
    Location::new("Gosselies", 50.4680, 4.4312),
];

// ============================================================================
// Well outside any reasonable detour
// ============================================================================

pub const FAR_AWAY: &[Location] = &[
    Location::new("Liège", 50.6326, 5.5797),
    Location::new("Ghent", 51.0543, 3.7174),
    Location::new("Namur", 50.4674, 4.8720),
];
