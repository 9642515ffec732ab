//! HTTP client for the police data service.
//!
//! - Street-level crimes: `GET {crimes_url}?lat=..&lng=..&date=YYYY-MM`
//!   returns a bare JSON array of crime objects. Months that have not been
//!   published (or that exceed the service's per-request cap) come back
//!   as a non-200 status.
//! - Categories: `GET {categories_url}` returns a bare JSON array of
//!   `{"url": .., "name": ..}` objects.
//!
//! See <https://data.police.uk/docs/>

use async_trait::async_trait;
use police_data_models::Location;
use police_data_models::config::Endpoints;
use police_data_models::month::MonthToken;

use crate::{ApiResponse, PoliceApi, SourceError};

/// User agent sent when the config does not name one.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client used for all remote calls.
///
/// No timeout is configured beyond the transport defaults.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the TLS backend cannot be initialised.
pub fn build_http_client(user_agent: Option<&str>) -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .build()?)
}

/// [`PoliceApi`] implementation backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct PoliceUkClient {
    client: reqwest::Client,
    crimes_url: String,
    categories_url: String,
}

impl PoliceUkClient {
    /// Creates a client for the configured endpoints.
    #[must_use]
    pub fn new(client: reqwest::Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            crimes_url: endpoints.crimes_url.clone(),
            categories_url: endpoints.categories_url.clone(),
        }
    }
}

/// Query parameters for a street-level crime request.
#[must_use]
pub fn crime_query(location: Location, month: MonthToken) -> [(&'static str, String); 3] {
    [
        ("lat", location.latitude.to_string()),
        ("lng", location.longitude.to_string()),
        ("date", month.to_string()),
    ]
}

#[async_trait]
impl PoliceApi for PoliceUkClient {
    async fn crimes_at_location(
        &self,
        location: Location,
        month: MonthToken,
    ) -> Result<ApiResponse<Vec<serde_json::Value>>, SourceError> {
        let resp = self
            .client
            .get(&self.crimes_url)
            .query(&crime_query(location, month))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            log::debug!("{} returned {status} for {month}", resp.url());
            return Ok(ApiResponse::Failure {
                status: status.as_u16(),
            });
        }

        let records: Vec<serde_json::Value> = resp.json().await?;
        Ok(ApiResponse::Success(records))
    }

    async fn crime_categories(&self) -> Result<ApiResponse<String>, SourceError> {
        let resp = self.client.get(&self.categories_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Ok(ApiResponse::Failure {
                status: status.as_u16(),
            });
        }

        Ok(ApiResponse::Success(resp.text().await?))
    }
}
