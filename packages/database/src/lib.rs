#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PostgreSQL access for the police data pipeline.
//!
//! Connection settings come from the environment (see [`db`]). The tidy
//! snapshot is loaded with `COPY ... FROM STDIN` inside a single
//! transaction (see [`load`]).

pub mod db;
pub mod load;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Connection or query error.
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Reading the upload file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection settings are missing or malformed.
    #[error("Database configuration error: {message}")]
    MissingConfig {
        /// Description of what is missing.
        message: String,
    },
}
