//! The two pipeline stages.
//!
//! `download` geocodes the postcode, fetches every month, writes the raw
//! snapshot, and refreshes the category file. `transform_load` tidies the
//! raw snapshot, writes the tidy snapshot, and bulk loads it. Each stage
//! records the file it wrote in the shared [`SnapshotManifest`] so a later
//! stage in the same process uses it directly.

use std::time::Instant;

use chrono::NaiveDate;
use police_data_cli_utils::{IndicatifProgress, MultiProgress};
use police_data_models::config::PipelineConfig;
use police_data_source::fetch::{CATEGORY_FILE_NAME, fetch_category_catalog, fetch_months};
use police_data_source::geocoder::PostcodeGeocoder;
use police_data_source::police_uk::{PoliceUkClient, build_http_client};
use police_data_transform::assemble::{assemble_raw, write_raw_snapshot};
use police_data_transform::schema::TableSchema;
use police_data_transform::snapshot::{SnapshotKind, SnapshotManifest};
use police_data_transform::tidy::run_tidy_stage;

/// Stage 1: fetch everything and write the raw snapshot and category file.
///
/// # Errors
///
/// Returns an error if geocoding fails, a transport error occurs, or a
/// file cannot be written. Months the service rejects are skipped.
pub async fn download(
    config: &PipelineConfig,
    date: NaiveDate,
    multi: &MultiProgress,
    manifest: &mut SnapshotManifest,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    std::fs::create_dir_all(&config.data_dir)?;

    let client = build_http_client(config.user_agent.as_deref())?;

    let geocoder = PostcodeGeocoder::new(client.clone(), &config.endpoints.geocode_url);
    let location = geocoder.geocode(&config.postcode).await?;
    log::info!("{} resolved to {location}", config.postcode);

    let api = PoliceUkClient::new(client, &config.endpoints);
    let months = config.months();
    let bar = IndicatifProgress::months_bar(multi, "Fetching crimes");
    let summary = fetch_months(&api, location, &months, &bar).await?;

    for skipped in &summary.skipped {
        log::debug!("Skipped {} (status {})", skipped.month, skipped.status);
    }

    let table = assemble_raw(&summary);
    let raw = write_raw_snapshot(&table, &config.data_dir, date)?;
    manifest.raw = Some(raw);

    let catalog = config.data_dir.join(CATEGORY_FILE_NAME);
    if !fetch_category_catalog(&api, &catalog).await? {
        log::warn!(
            "Category listing not refreshed; the tidy stage will use {} as it is",
            catalog.display()
        );
    }

    log::info!(
        "Download finished in {:.1}s: {} records, {} month(s) skipped",
        start.elapsed().as_secs_f64(),
        summary.total_records(),
        summary.skipped.len()
    );

    Ok(())
}

/// Stage 2: tidy the raw snapshot, write the tidy snapshot, and load it
/// into the destination table.
///
/// # Errors
///
/// Returns an error if no raw snapshot is available, an expected column is
/// missing, the database settings are incomplete, or any SQL fails.
pub async fn transform_load(
    config: &PipelineConfig,
    date: NaiveDate,
    manifest: &mut SnapshotManifest,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let raw = manifest.resolve(&config.data_dir, SnapshotKind::Raw)?;
    let catalog = config.data_dir.join(CATEGORY_FILE_NAME);

    let output = run_tidy_stage(&raw, &catalog, &config.data_dir, date)?;
    manifest.tidy = Some(output.path);

    let column_clause = TableSchema::infer(&output.table)?.column_clause();
    log::info!("Column clause: {column_clause}");

    let tidy = manifest.resolve(&config.data_dir, SnapshotKind::Tidy)?;
    let db_config = police_data_database::db::config_from_env()?;
    let rows = police_data_database::load::load_into_postgres(
        &db_config,
        &config.table_name,
        &column_clause,
        &tidy,
    )
    .await?;

    log::info!(
        "Loaded {rows} rows into {} in {:.1}s",
        config.table_name,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
