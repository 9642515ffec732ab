#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote data sources for the police data pipeline.
//!
//! Three services are involved: a postcode lookup ([`geocoder`]) that
//! anchors the run to a coordinate pair, and the street-level crime and
//! category-listing endpoints, both reached through the [`PoliceApi`]
//! trait. [`police_uk::PoliceUkClient`] is the HTTP implementation;
//! [`fetch`] drives it across a month range and persists the category
//! listing.

pub mod fetch;
pub mod geocoder;
pub mod police_uk;
pub mod progress;

use async_trait::async_trait;
use police_data_models::Location;
use police_data_models::month::MonthToken;

/// Errors that can occur while talking to remote services.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured endpoint is not a usable URL.
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    /// The postcode could not be resolved to coordinates.
    #[error("Geocoding {postcode:?} failed: {message}")]
    Geocode {
        /// The postcode that was looked up.
        postcode: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{request} returned status {status}")]
    Status {
        /// What was requested.
        request: String,
        /// Status code the service answered with.
        status: u16,
    },
}

/// Outcome of a request that reached the server.
///
/// Transport failures are reported as [`SourceError`]; a response with a
/// non-success status is a normal outcome that callers decide how to
/// handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse<T> {
    /// The server answered with a success status.
    Success(T),
    /// The server answered with the given non-success status code.
    Failure {
        /// HTTP status code.
        status: u16,
    },
}

/// The crime and category endpoints of the police data service.
#[async_trait]
pub trait PoliceApi: Send + Sync {
    /// Fetches the street-level crimes recorded near `location` during
    /// `month`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request cannot be sent or a success
    /// response is not a JSON array.
    async fn crimes_at_location(
        &self,
        location: Location,
        month: MonthToken,
    ) -> Result<ApiResponse<Vec<serde_json::Value>>, SourceError>;

    /// Fetches the category listing, returning the response body
    /// unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request cannot be sent or the body
    /// cannot be read.
    async fn crime_categories(&self) -> Result<ApiResponse<String>, SourceError>;
}
