//! Coordinate handling for camera position priors.
//!
//! Photo positions arrive either in a Cartesian frame (used as-is) or as
//! geographic longitude/latitude/altitude, which must be reprojected into
//! a local Cartesian frame before a stage can consume them.

use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Sentinel marking a coordinate component as unset.
///
/// A component is usable only when strictly greater than this value;
/// equal-or-below means the capture device recorded nothing.
pub const INVALID_COORDINATE: f64 = -1e-100;

/// How a photo's position components are to be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    /// Components are local Cartesian meters; used without conversion.
    #[default]
    Cartesian,
    /// Components are longitude/latitude degrees and altitude meters.
    Geographic,
}

/// A three-component position.
///
/// For [`CoordinateSystem::Geographic`] the convention is
/// `x` = longitude, `y` = latitude, `z` = altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3 {
    /// First component (Cartesian x, or longitude in degrees).
    pub x: f64,
    /// Second component (Cartesian y, or latitude in degrees).
    pub y: f64,
    /// Third component (Cartesian z, or altitude in meters).
    pub z: f64,
}

impl Default for Position3 {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Position3 {
    /// Creates a position from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates the all-unset position.
    #[must_use]
    pub const fn invalid() -> Self {
        Self::new(INVALID_COORDINATE, INVALID_COORDINATE, INVALID_COORDINATE)
    }

    /// Whether every component carries a real measurement.
    ///
    /// All three must be strictly greater than [`INVALID_COORDINATE`];
    /// a single unset component invalidates the whole position.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x > INVALID_COORDINATE && self.y > INVALID_COORDINATE && self.z > INVALID_COORDINATE
    }
}

/// A local Cartesian frame derived from geographic positions.
///
/// The frame is a tangent plane anchored at the centroid of the positions
/// it was built from: x grows eastward, y northward, z with altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    anchor: Position3,
}

impl LocalFrame {
    /// Derives a frame anchored at the centroid of `positions`.
    ///
    /// Returns `None` when `positions` is empty; callers filter out
    /// invalid positions before deriving a frame.
    #[must_use]
    pub fn from_positions(positions: &[Position3]) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let count = positions.len() as f64;
        let mut anchor = Position3::new(0.0, 0.0, 0.0);
        for position in positions {
            anchor.x += position.x;
            anchor.y += position.y;
            anchor.z += position.z;
        }
        anchor.x /= count;
        anchor.y /= count;
        anchor.z /= count;

        Some(Self { anchor })
    }

    /// The geographic position the frame is anchored at.
    #[must_use]
    pub const fn anchor(&self) -> Position3 {
        self.anchor
    }

    /// Projects a geographic position into the frame.
    #[must_use]
    pub fn project(&self, position: &Position3) -> Position3 {
        let lat0 = self.anchor.y.to_radians();
        Position3::new(
            (position.x - self.anchor.x).to_radians() * EARTH_RADIUS * lat0.cos(),
            (position.y - self.anchor.y).to_radians() * EARTH_RADIUS,
            position.z - self.anchor.z,
        )
    }
}
