#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entity and geometry types shown on the hazard map.
//!
//! The REST API, the push channel and the official alert feed all deliver
//! loosely-shaped JSON. The types here accept those shapes leniently and
//! guarantee the invariants the map relies on: every entity has a
//! position inside the valid latitude/longitude ranges and every severity
//! is an integer in 1-5. Input that cannot be brought into shape is
//! rejected per entity, never per list.

pub mod alert;
pub mod hotspot;
pub mod lenient;
pub mod report;
pub mod submission;

pub use alert::{Alert, NO_DESCRIPTION, RawAlert, normalize_alert, normalize_alert_value};
pub use hotspot::Hotspot;
pub use report::Report;
pub use submission::{AuthToken, LoginRequest, MediaFile, MediaKind, ReportSubmission};

use serde::{Deserialize, Serialize};

/// Coarse classification of every failure the client can absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A request or the push channel could not reach the backend.
    NetworkFailure,
    /// A response body or pushed message could not be understood.
    MalformedPayload,
    /// User input was rejected before anything was sent.
    ValidationFailure,
}

/// Why a single entity was rejected while parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// No usable latitude/longitude pair, or one outside the valid ranges.
    #[error("invalid or missing position")]
    InvalidPosition,
    /// The entity has no usable identifier.
    #[error("missing identifier")]
    MissingId,
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinates {
    /// Creates a new position.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside
    /// lat ∈ [-90, 90], lng ∈ [-180, 180].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northern latitude boundary.
    pub north: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Western longitude boundary.
    pub west: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given edges.
    #[must_use]
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Whether every edge lies in range and north is not below south.
    ///
    /// West may exceed east: that is a box crossing the antimeridian.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Coordinates::new(self.north, self.east).is_valid()
            && Coordinates::new(self.south, self.west).is_valid()
            && self.north >= self.south
    }

    /// Returns the center point of the box.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        let lat = f64::midpoint(self.north, self.south);
        let lng = if self.west <= self.east {
            f64::midpoint(self.west, self.east)
        } else {
            let mid = f64::midpoint(self.west, self.east + 360.0);
            if mid > 180.0 { mid - 360.0 } else { mid }
        };
        Coordinates::new(lat, lng)
    }

    /// Whether the position falls inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, position: &Coordinates) -> bool {
        let lat_ok = (self.south..=self.north).contains(&position.lat);
        let lng_ok = if self.west <= self.east {
            (self.west..=self.east).contains(&position.lng)
        } else {
            position.lng >= self.west || position.lng <= self.east
        };
        lat_ok && lng_ok
    }
}

/// Default map center (India).
pub const DEFAULT_CENTER: Coordinates = Coordinates::new(20.5937, 78.9629);

/// Default map zoom level.
pub const DEFAULT_ZOOM: u8 = 5;

/// The visible map rectangle plus its center and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Map center.
    pub center: Coordinates,
    /// Tile zoom level.
    pub zoom: u8,
    /// Visible rectangle, once the map has reported one.
    pub bounds: Option<BoundingBox>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            bounds: None,
        }
    }
}
