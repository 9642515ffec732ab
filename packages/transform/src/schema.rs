//! SQL column definitions for the tidy table.
//!
//! Each column's inferred [`DType`] maps to a Postgres type. The result is
//! only used to build the `CREATE TABLE` statement before the bulk load.

use police_data_models::policy::PipelineStep;

use crate::TransformError;
use crate::table::{DType, Table};

/// SQL type for a column type, or `None` if there is no mapping.
#[must_use]
pub const fn sql_type(dtype: DType) -> Option<&'static str> {
    match dtype {
        DType::Object | DType::TimeDelta => Some("varchar"),
        DType::Float64 => Some("float"),
        DType::Int64 | DType::Int32 => Some("int"),
        DType::DateTime64 => Some("timestamp"),
        DType::Bool => None,
    }
}

/// Ordered `(column, SQL type)` pairs for a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<(String, String)>,
}

impl TableSchema {
    /// Builds a schema from column names and their types.
    ///
    /// A type with no SQL mapping goes through
    /// [`PipelineStep::SchemaMapping`]'s policy and, when tolerated, is
    /// passed through under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnmappedType`] if a type has no mapping
    /// and the step is fatal.
    pub fn from_dtypes<'a, I>(columns: I) -> Result<Self, TransformError>
    where
        I: IntoIterator<Item = (&'a str, DType)>,
    {
        let columns: Vec<(String, String)> = columns
            .into_iter()
            .map(|(name, dtype)| -> Result<_, TransformError> {
                let sql = match sql_type(dtype) {
                    Some(sql) => sql.to_string(),
                    None => {
                        PipelineStep::SchemaMapping.tolerate(TransformError::UnmappedType {
                            column: name.to_string(),
                            dtype: dtype.to_string(),
                        })?;
                        dtype.to_string()
                    }
                };
                Ok((name.to_string(), sql))
            })
            .collect::<Result<_, TransformError>>()?;

        Ok(Self { columns })
    }

    /// Infers the schema of `table` from its columns' types.
    ///
    /// # Errors
    ///
    /// See [`Self::from_dtypes`].
    pub fn infer(table: &Table) -> Result<Self, TransformError> {
        Self::from_dtypes(table.columns().iter().map(|c| (c.name(), c.dtype())))
    }

    /// `(column, SQL type)` pairs in column order.
    #[must_use]
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Column list for `CREATE TABLE`, e.g. `id int, category varchar`.
    #[must_use]
    pub fn column_clause(&self) -> String {
        self.columns
            .iter()
            .map(|(name, sql)| format!("{name} {sql}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
