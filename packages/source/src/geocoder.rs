//! Postcode lookup client.
//!
//! Resolves a UK postcode to a WGS84 coordinate pair through a
//! postcodes.io-compatible service:
//!
//! - `GET {base_url}/{postcode}` returns
//!   `{"status": 200, "result": {"latitude": .., "longitude": ..}}`
//! - unknown postcodes return `404` with `{"status": 404, "error": ".."}`
//!
//! A failed lookup is fatal for the run: nothing else can be fetched
//! without coordinates.

use police_data_models::Location;

use crate::SourceError;

/// Client for a postcodes.io-compatible lookup service.
#[derive(Debug, Clone)]
pub struct PostcodeGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl PostcodeGeocoder {
    /// Creates a geocoder that queries `base_url` with the given client.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the lookup URL for `postcode`, percent-encoding it as a
    /// single path segment.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidUrl`] if the base URL cannot carry a
    /// path.
    pub fn lookup_url(&self, postcode: &str) -> Result<reqwest::Url, SourceError> {
        let invalid = |message: String| SourceError::InvalidUrl {
            url: self.base_url.clone(),
            message,
        };

        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(postcode.trim());
        Ok(url)
    }

    /// Resolves `postcode` to coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails, the service answers
    /// with a non-success status, or the response has no coordinates.
    pub async fn geocode(&self, postcode: &str) -> Result<Location, SourceError> {
        let url = self.lookup_url(postcode)?;
        log::info!("Geocoding postcode {postcode:?} via {url}");

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(SourceError::Geocode {
                postcode: postcode.to_string(),
                message: format!("status {}: {}", status.as_u16(), error_message(&body)),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        let location = parse_lookup_response(postcode, &json)?;
        log::info!("Resolved {postcode:?} to {location}");
        Ok(location)
    }
}

/// Extracts `result.latitude` / `result.longitude` from a lookup response.
///
/// # Errors
///
/// Returns [`SourceError::Geocode`] if either coordinate is missing or not
/// a number (postcodes without a grid reference come back as `null`).
pub fn parse_lookup_response(
    postcode: &str,
    body: &serde_json::Value,
) -> Result<Location, SourceError> {
    let missing = |field: &str| SourceError::Geocode {
        postcode: postcode.to_string(),
        message: format!("response has no numeric result.{field}"),
    };

    let result = &body["result"];
    let latitude = result["latitude"]
        .as_f64()
        .ok_or_else(|| missing("latitude"))?;
    let longitude = result["longitude"]
        .as_f64()
        .ok_or_else(|| missing("longitude"))?;

    Ok(Location::new(latitude, longitude))
}

/// Best-effort extraction of the `error` field of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
