//! Month-by-month crime fetching and category catalog persistence.
//!
//! Requests are issued one at a time, in month order. A month that the
//! service does not answer successfully is handled according to
//! [`PipelineStep::FetchMonth`]'s failure policy (skip and continue), so a
//! partially published range still produces a dataset.

use std::path::Path;
use std::sync::Arc;

use police_data_models::Location;
use police_data_models::month::{MonthRange, MonthToken};
use police_data_models::policy::PipelineStep;

use crate::progress::ProgressCallback;
use crate::{ApiResponse, PoliceApi, SourceError};

/// File name of the persisted category listing.
pub const CATEGORY_FILE_NAME: &str = "crime_categories.json";

/// The records returned for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthRecords {
    /// The month that was queried.
    pub month: MonthToken,
    /// Crime objects exactly as returned by the service.
    pub records: Vec<serde_json::Value>,
}

/// A month that was dropped from the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedMonth {
    /// The month that was queried.
    pub month: MonthToken,
    /// Status code the service answered with.
    pub status: u16,
}

/// Everything a month-range fetch produced, in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSummary {
    /// Months that answered successfully (possibly with no records).
    pub months: Vec<MonthRecords>,
    /// Months that were skipped.
    pub skipped: Vec<SkippedMonth>,
}

impl FetchSummary {
    /// Total number of records across all fetched months.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.months.iter().map(|m| m.records.len()).sum()
    }
}

/// Fetches every month in `months` for `location`, in order.
///
/// # Errors
///
/// Returns [`SourceError`] on a transport failure, or
/// [`SourceError::Status`] if a month fails and [`PipelineStep::FetchMonth`]
/// is fatal.
pub async fn fetch_months(
    api: &dyn PoliceApi,
    location: Location,
    months: &MonthRange,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<FetchSummary, SourceError> {
    let mut summary = FetchSummary::default();
    progress.set_total(months.len() as u64);

    log::info!(
        "Fetching crimes near {location} for {} month(s) ({} to {})",
        months.len(),
        months.start,
        months.end
    );

    for month in months {
        progress.set_message(format!("Fetching {month}"));

        match api.crimes_at_location(location, month).await? {
            ApiResponse::Success(records) => {
                log::info!("{month}: {} records", records.len());
                summary.months.push(MonthRecords { month, records });
            }
            ApiResponse::Failure { status } => {
                PipelineStep::FetchMonth.tolerate(SourceError::Status {
                    request: format!("Crimes for {month}"),
                    status,
                })?;
                summary.skipped.push(SkippedMonth { month, status });
            }
        }

        progress.inc(1);
    }

    progress.finish(format!(
        "Fetched {} records ({} month(s) skipped)",
        summary.total_records(),
        summary.skipped.len()
    ));

    Ok(summary)
}

/// Fetches the category listing and writes it verbatim to `path`.
///
/// Returns `true` if the file was written. On a non-success status the
/// existing file (if any) is left untouched and `false` is returned.
///
/// # Errors
///
/// Returns [`SourceError`] on a transport failure or if the file cannot be
/// written, or [`SourceError::Status`] if the listing fails and
/// [`PipelineStep::FetchCatalog`] is fatal.
#[must_use = "false means the category file was not refreshed"]
pub async fn fetch_category_catalog(api: &dyn PoliceApi, path: &Path) -> Result<bool, SourceError> {
    match api.crime_categories().await? {
        ApiResponse::Success(body) => {
            tokio::fs::write(path, body.as_bytes()).await?;
            log::info!("Category listing saved to {}", path.display());
            Ok(true)
        }
        ApiResponse::Failure { status } => {
            PipelineStep::FetchCatalog.tolerate(SourceError::Status {
                request: "Category listing".to_string(),
                status,
            })?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::progress::null_progress;

    /// Serves canned responses keyed by month token.
    pub struct MockPoliceApi {
        pub months: BTreeMap<String, ApiResponse<Vec<serde_json::Value>>>,
        pub categories: ApiResponse<String>,
    }

    #[async_trait]
    impl PoliceApi for MockPoliceApi {
        async fn crimes_at_location(
            &self,
            _location: Location,
            month: MonthToken,
        ) -> Result<ApiResponse<Vec<serde_json::Value>>, SourceError> {
            Ok(self
                .months
                .get(&month.to_string())
                .cloned()
                .unwrap_or(ApiResponse::Failure { status: 404 }))
        }

        async fn crime_categories(&self) -> Result<ApiResponse<String>, SourceError> {
            Ok(self.categories.clone())
        }
    }

    fn range(start: &str, end: &str) -> MonthRange {
        MonthRange::new(start.parse().unwrap(), end.parse().unwrap())
    }

    #[tokio::test]
    async fn skips_months_with_failed_status() {
        let api = MockPoliceApi {
            months: BTreeMap::from([(
                "2022-01".to_string(),
                ApiResponse::Success(vec![
                    json!({"category": "burglary"}),
                    json!({"category": "drugs"}),
                    json!({"category": "robbery"}),
                ]),
            )]),
            categories: ApiResponse::Failure { status: 500 },
        };

        let summary = fetch_months(
            &api,
            Location::new(51.5, -0.01),
            &range("2022-01", "2022-02"),
            &null_progress(),
        )
        .await
        .unwrap();

        assert_eq!(summary.total_records(), 3);
        assert_eq!(summary.months.len(), 1);
        assert_eq!(
            summary.skipped,
            [SkippedMonth {
                month: "2022-02".parse().unwrap(),
                status: 404
            }]
        );
    }

    #[tokio::test]
    async fn empty_range_makes_no_requests() {
        let api = MockPoliceApi {
            months: BTreeMap::new(),
            categories: ApiResponse::Failure { status: 500 },
        };
        let summary = fetch_months(
            &api,
            Location::new(51.5, -0.01),
            &range("2022-06", "2022-01"),
            &null_progress(),
        )
        .await
        .unwrap();
        assert_eq!(summary, FetchSummary::default());
    }

    #[tokio::test]
    async fn writes_category_listing_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CATEGORY_FILE_NAME);
        let body = r#"[{"url":"burglary","name":"Burglary"}]"#;
        let api = MockPoliceApi {
            months: BTreeMap::new(),
            categories: ApiResponse::Success(body.to_string()),
        };

        assert!(fetch_category_catalog(&api, &path).await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), body);
    }

    #[tokio::test]
    async fn failed_listing_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CATEGORY_FILE_NAME);
        std::fs::write(&path, "[]").unwrap();
        let api = MockPoliceApi {
            months: BTreeMap::new(),
            categories: ApiResponse::Failure { status: 503 },
        };

        assert!(!fetch_category_catalog(&api, &path).await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
