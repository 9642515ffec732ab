//! Tidy transformation of the raw snapshot.
//!
//! The raw snapshot is cleaned, two availability indicators are derived,
//! and the crime category is one-hot encoded against the category catalog.
//! Column names come out free of `.` and `-` so they can be used as SQL
//! identifiers.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use police_data_models::catalog::CategoryCatalog;
use police_data_models::policy::PipelineStep;

use crate::TransformError;
use crate::snapshot::SnapshotKind;
use crate::table::{Cell, Column, Table};

/// Placeholder for crimes with no recorded outcome.
pub const STATUS_UNAVAILABLE: &str = "Status update unavailable";

/// Index column left behind by tools that write a row index.
const INDEX_COLUMN: &str = "Unnamed: 0";

const CONTEXT: &str = "context";
const OUTCOME_STATUS: &str = "outcome_status";
const OUTCOME_STATUS_CATEGORY: &str = "outcome_status_category";
const OUTCOME_STATUS_DATE: &str = "outcome_status_date";
const LOCATION_SUBTYPE: &str = "location_subtype";
const CATEGORY: &str = "category";

/// Name of the indicator for a non-missing `location_subtype`.
pub const LOCATION_SUBTYPE_AVAILABLE: &str = "location_subtype_available";

/// Name of the indicator for a non-missing `outcome_status_date`.
pub const OUTCOME_STATUS_DATE_AVAILABLE: &str = "outcome_status_date_available";

/// What the transformation did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TidyReport {
    /// Columns removed from the raw snapshot.
    pub dropped_columns: Vec<String>,
    /// Non-missing `context` entries, when the column was kept.
    pub context_retained: Option<usize>,
    /// Outcome categories filled with [`STATUS_UNAVAILABLE`], when the
    /// column was present.
    pub outcome_categories_filled: Option<usize>,
    /// Rows with more than one category flag set.
    pub one_hot_violations: usize,
    /// Rows whose category is not in the catalog.
    pub uncatalogued_rows: usize,
}

/// Result of the tidy stage.
#[derive(Debug, Clone)]
pub struct TidyOutput {
    /// Where the tidy snapshot was written.
    pub path: PathBuf,
    /// The tidy table as written.
    pub table: Table,
    /// What the transformation did.
    pub report: TidyReport,
}

/// Reads the category catalog written by the download stage.
///
/// # Errors
///
/// Returns [`TransformError::Catalog`] if the file is missing or is not a
/// JSON array of category objects.
pub fn load_category_catalog(path: &Path) -> Result<CategoryCatalog, TransformError> {
    let body = std::fs::read_to_string(path).map_err(|e| TransformError::Catalog {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let catalog = CategoryCatalog::from_json(&body).map_err(|e| TransformError::Catalog {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    log::info!(
        "Loaded {} crime categories from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

/// Looks up a column the transformation relies on. A missing column goes
/// through [`PipelineStep::RequireColumn`]'s policy, and `Ok(None)` means
/// the transformation that needed it is skipped.
fn require_column<'a>(
    table: &'a Table,
    name: &str,
) -> Result<Option<&'a Column>, TransformError> {
    let Some(column) = table.column(name) else {
        PipelineStep::RequireColumn.tolerate(TransformError::MissingColumn {
            column: name.to_string(),
        })?;
        return Ok(None);
    };
    Ok(Some(column))
}

fn availability(column: &Column) -> Vec<Cell> {
    column
        .values()
        .iter()
        .map(|v| Some(if v.is_some() { "1" } else { "0" }.to_string()))
        .collect()
}

/// Cleans `table` and encodes its categories against `catalog`.
///
/// # Errors
///
/// Returns [`TransformError::MissingColumn`] if `context`,
/// `outcome_status`, `location_subtype`, `outcome_status_date`, or
/// `category` is absent and [`PipelineStep::RequireColumn`] is fatal, or
/// [`TransformError::OneHot`] if a row has several category flags and
/// [`PipelineStep::OneHotValidation`] is fatal.
pub fn tidy(
    mut table: Table,
    catalog: &CategoryCatalog,
) -> Result<(Table, TidyReport), TransformError> {
    let mut report = TidyReport::default();

    if table.drop_column(INDEX_COLUMN).is_some() {
        log::info!("Dropped index column {INDEX_COLUMN:?}");
        report.dropped_columns.push(INDEX_COLUMN.to_string());
    }

    match require_column(&table, CONTEXT)?.map(Column::non_null_count) {
        Some(0) => {
            table.drop_column(CONTEXT);
            log::info!("Dropped {CONTEXT:?}: no entries");
            report.dropped_columns.push(CONTEXT.to_string());
        }
        Some(count) => {
            log::info!("Kept {CONTEXT:?}: {count} entries");
            report.context_retained = Some(count);
        }
        None => {}
    }

    table.rename_columns(|name| name.replace('.', "_"));

    if require_column(&table, OUTCOME_STATUS)?.is_some() {
        table.drop_column(OUTCOME_STATUS);
        report.dropped_columns.push(OUTCOME_STATUS.to_string());
    }

    if let Some(column) = table.column_mut(OUTCOME_STATUS_CATEGORY) {
        let filled = column.fill_null(STATUS_UNAVAILABLE);
        log::info!("Filled {filled} missing {OUTCOME_STATUS_CATEGORY:?} values");
        report.outcome_categories_filled = Some(filled);
    } else {
        PipelineStep::FillOutcomeCategory.tolerate(TransformError::MissingColumn {
            column: OUTCOME_STATUS_CATEGORY.to_string(),
        })?;
    }

    for (source, indicator) in [
        (LOCATION_SUBTYPE, LOCATION_SUBTYPE_AVAILABLE),
        (OUTCOME_STATUS_DATE, OUTCOME_STATUS_DATE_AVAILABLE),
    ] {
        let flags = require_column(&table, source)?.map(availability);
        if let Some(flags) = flags {
            table.set_column(indicator, flags)?;
        }
    }

    encode_categories(&mut table, catalog, &mut report)?;

    table.rename_columns(|name| name.replace('-', "_"));

    Ok((table, report))
}

fn encode_categories(
    table: &mut Table,
    catalog: &CategoryCatalog,
    report: &mut TidyReport,
) -> Result<(), TransformError> {
    let Some(categories) = require_column(table, CATEGORY)?.map(|c| c.values().to_vec()) else {
        return Ok(());
    };

    for entry in catalog.categories() {
        let flags = categories
            .iter()
            .map(|c| {
                let hit = c.as_deref() == Some(entry.as_str());
                Some(if hit { "1" } else { "0" }.to_string())
            })
            .collect();
        table.set_column(entry, flags)?;
    }

    let mut row_sums = vec![0_usize; table.row_count()];
    for entry in catalog.categories() {
        if let Some(column) = table.column(entry) {
            for (sum, flag) in row_sums.iter_mut().zip(column.values()) {
                if flag.as_deref() == Some("1") {
                    *sum += 1;
                }
            }
        }
    }

    report.one_hot_violations = row_sums.iter().filter(|&&s| s > 1).count();
    report.uncatalogued_rows = row_sums.iter().filter(|&&s| s == 0).count();

    check_one_hot(report.one_hot_violations, catalog.len())?;

    if report.uncatalogued_rows > 0 {
        log::debug!(
            "{} rows have a category outside the catalog",
            report.uncatalogued_rows
        );
    }

    Ok(())
}

/// Applies [`PipelineStep::OneHotValidation`]'s policy to the number of
/// rows with more than one category flag set.
fn check_one_hot(violations: usize, categories: usize) -> Result<(), TransformError> {
    if violations == 0 {
        log::info!("One-hot encoding of {categories} categories is valid");
        return Ok(());
    }
    PipelineStep::OneHotValidation.tolerate(TransformError::OneHot { rows: violations })
}

/// Runs the tidy stage: reads `raw_path`, transforms it against the
/// catalog at `catalog_path`, and writes the tidy snapshot for `date` into
/// `out_dir`.
///
/// # Errors
///
/// Returns [`TransformError`] if an input cannot be read, an expected
/// column is missing, or the output cannot be written.
pub fn run_tidy_stage(
    raw_path: &Path,
    catalog_path: &Path,
    out_dir: &Path,
    date: NaiveDate,
) -> Result<TidyOutput, TransformError> {
    log::info!("Reading raw snapshot {}", raw_path.display());
    let raw = Table::read_csv_path(raw_path)?;
    let catalog = load_category_catalog(catalog_path)?;

    let (table, report) = tidy(raw, &catalog)?;

    log::info!(
        "Tidy table: {} rows x {} columns",
        table.row_count(),
        table.columns().len()
    );
    for line in table.describe() {
        log::info!("  {line}");
    }

    let path = SnapshotKind::Tidy.path(out_dir, date);
    table.write_csv_path(&path)?;
    log::info!("Wrote {}", path.display());

    Ok(TidyOutput {
        path,
        table,
        report,
    })
}
