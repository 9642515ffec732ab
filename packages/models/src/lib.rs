#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the police data pipeline.
//!
//! Everything that more than one stage needs to agree on lives here: the
//! resolved [`Location`], the [`month`] range used to page through the
//! crime API, the [`catalog`] of category identifiers, the run-wide
//! [`config`], and the per-step [`policy`] table that decides whether a
//! failure aborts the run or is logged and skipped.

pub mod catalog;
pub mod config;
pub mod month;
pub mod policy;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair resolved from a postcode.
///
/// Resolved once per run and shared read-only by every monthly fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl Location {
    /// Creates a new location from the given coordinates.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}
