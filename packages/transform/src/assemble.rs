//! Raw dataset assembly.
//!
//! Every fetched month is flattened and appended in fetch order. Columns
//! are the union of all fields seen, in first-seen order, so a field that
//! only appears in later months is missing for earlier rows.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use police_data_source::fetch::FetchSummary;

use crate::TransformError;
use crate::flatten::flatten_record;
use crate::snapshot::SnapshotKind;
use crate::table::Table;

/// Flattens and concatenates every fetched month into one table.
#[must_use]
pub fn assemble_raw(summary: &FetchSummary) -> Table {
    let rows = summary.months.iter().flat_map(|month| {
        month.records.iter().filter_map(move |record| {
            let row = flatten_record(record);
            if row.is_none() {
                log::warn!("{}: skipping non-object record {record}", month.month);
            }
            row
        })
    });

    Table::from_rows(rows)
}

/// Writes `table` as the raw snapshot for `date` inside `dir`, replacing a
/// snapshot from the same day.
///
/// # Errors
///
/// Returns [`TransformError`] if the file cannot be written.
pub fn write_raw_snapshot(
    table: &Table,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, TransformError> {
    let path = SnapshotKind::Raw.path(dir, date);

    if table.is_empty() {
        log::warn!(
            "No crime records were fetched; writing empty snapshot {}",
            path.display()
        );
    }

    table.write_csv_path(&path)?;
    log::info!(
        "Wrote {} rows x {} columns to {}",
        table.row_count(),
        table.columns().len(),
        path.display()
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use police_data_models::Location;
    use police_data_models::month::{MonthRange, MonthToken};
    use police_data_source::fetch::{MonthRecords, fetch_months};
    use police_data_source::progress::null_progress;
    use police_data_source::{ApiResponse, PoliceApi, SourceError};
    use serde_json::json;

    use super::*;

    struct CannedApi {
        months: BTreeMap<String, Vec<serde_json::Value>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PoliceApi for CannedApi {
        async fn crimes_at_location(
            &self,
            _location: Location,
            month: MonthToken,
        ) -> Result<ApiResponse<Vec<serde_json::Value>>, SourceError> {
            self.requested.lock().unwrap().push(month.to_string());
            Ok(self
                .months
                .get(&month.to_string())
                .map_or(ApiResponse::Failure { status: 404 }, |r| {
                    ApiResponse::Success(r.clone())
                }))
        }

        async fn crime_categories(&self) -> Result<ApiResponse<String>, SourceError> {
            Ok(ApiResponse::Failure { status: 404 })
        }
    }

    fn crime(id: u64, category: &str, subtype: &str) -> serde_json::Value {
        json!({
            "category": category,
            "location_type": "Force",
            "location": {
                "latitude": "51.500",
                "street": { "id": 1_234, "name": "On or near Cuba Street" },
                "longitude": "-0.018"
            },
            "context": "",
            "outcome_status": null,
            "persistent_id": "",
            "id": id,
            "location_subtype": subtype,
            "month": "2022-01"
        })
    }

    #[tokio::test]
    async fn three_records_and_one_missing_month() {
        let api = CannedApi {
            months: BTreeMap::from([(
                "2022-01".to_string(),
                vec![
                    crime(1, "burglary", ""),
                    crime(2, "drugs", "STATION"),
                    crime(3, "robbery", ""),
                ],
            )]),
            requested: Mutex::new(Vec::new()),
        };
        let months = MonthRange::new("2022-01".parse().unwrap(), "2022-02".parse().unwrap());

        let summary = fetch_months(&api, Location::new(51.5, -0.018), &months, &null_progress())
            .await
            .unwrap();
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(*api.requested.lock().unwrap(), ["2022-01", "2022-02"]);

        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        let path = write_raw_snapshot(&assemble_raw(&summary), dir.path(), date).unwrap();

        assert!(path.ends_with("20220701-raw_police_data.csv"));
        let table = Table::read_csv_path(&path).unwrap();
        assert_eq!(table.row_count(), 3);
        assert!(table.column("location.street.name").is_some());
    }

    #[test]
    fn later_months_add_columns_with_gaps() {
        let summary = FetchSummary {
            months: vec![
                MonthRecords {
                    month: "2022-01".parse().unwrap(),
                    records: vec![json!({"id": 1, "outcome_status": null})],
                },
                MonthRecords {
                    month: "2022-02".parse().unwrap(),
                    records: vec![json!({
                        "id": 2,
                        "outcome_status": {"category": "Under investigation", "date": "2022-02"}
                    })],
                },
            ],
            skipped: Vec::new(),
        };

        let table = assemble_raw(&summary);
        assert_eq!(
            table.column_names(),
            [
                "id",
                "outcome_status",
                "outcome_status.category",
                "outcome_status.date"
            ]
        );
        assert_eq!(
            table.column("outcome_status.date").unwrap().values(),
            [None, Some("2022-02".to_string())]
        );
    }

    #[test]
    fn same_day_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        let first = Table::from_rows(vec![vec![("id".to_string(), Some("1".to_string()))]]);
        let second = Table::from_rows(vec![vec![("id".to_string(), Some("2".to_string()))]]);

        write_raw_snapshot(&first, dir.path(), date).unwrap();
        let path = write_raw_snapshot(&second, dir.path(), date).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "id\n2\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
