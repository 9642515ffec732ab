#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular stages of the police data pipeline.
//!
//! - [`assemble`] turns fetched months into the raw snapshot.
//! - [`tidy`] cleans the raw snapshot, derives indicator columns, and
//!   one-hot encodes the crime category.
//! - [`schema`] maps the tidy table's column types to a SQL column clause.
//!
//! Stages hand data to each other only through the CSV files described
//! in [`snapshot`].

pub mod assemble;
pub mod flatten;
pub mod schema;
pub mod snapshot;
pub mod table;
pub mod tidy;

use std::path::PathBuf;

/// Errors that can occur while building or transforming snapshots.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No snapshot with the expected marker exists.
    #[error("No file containing {marker:?} found in {dir}")]
    MissingSnapshot {
        /// Directory that was searched.
        dir: PathBuf,
        /// Marker the file name had to contain.
        marker: &'static str,
    },

    /// A column the transformation relies on is absent.
    #[error("Expected column {column:?} is missing")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },

    /// A derived column does not have one cell per row.
    #[error("Column {column:?} has {actual} values, expected {expected}")]
    RowCount {
        /// Column being added.
        column: String,
        /// Rows in the table.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },

    /// Rows have more than one category flag set.
    #[error("{rows} rows have more than one category flag set")]
    OneHot {
        /// Number of offending rows.
        rows: usize,
    },

    /// A column type has no SQL mapping.
    #[error("No SQL type for {column:?} of type {dtype}")]
    UnmappedType {
        /// Column name.
        column: String,
        /// The column's inferred type.
        dtype: String,
    },

    /// The category catalog file could not be used.
    #[error("Cannot load category catalog {path}: {message}")]
    Catalog {
        /// Catalog file path.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },
}
