//! A minimal column-oriented table of nullable text cells.
//!
//! Cells keep the exact text they were read with, so a table read from CSV
//! and written back unchanged is byte-identical. Column types are not
//! stored; they are inferred on demand from the cell text (see
//! [`DType::infer`]), the same way a CSV reader would guess them.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::TransformError;

/// A single cell. `None` is a missing value.
pub type Cell = Option<String>;

/// Text values read back as missing.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Inferred storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum DType {
    /// Arbitrary text.
    #[strum(serialize = "object")]
    Object,
    /// 64-bit floating point (also any numeric column with missing values).
    #[strum(serialize = "float64")]
    Float64,
    /// 64-bit integer.
    #[strum(serialize = "int64")]
    Int64,
    /// 32-bit integer.
    #[strum(serialize = "int32")]
    Int32,
    /// Boolean.
    #[strum(serialize = "bool")]
    Bool,
    /// Timestamp.
    #[strum(serialize = "datetime64")]
    DateTime64,
    /// Duration.
    #[strum(serialize = "timedelta[ns]")]
    TimeDelta,
}

impl DType {
    /// Infers the type of a column from its cells.
    ///
    /// An all-missing column is `float64`. Integers with gaps widen to
    /// `float64`, and booleans with gaps fall back to `object`.
    #[must_use]
    pub fn infer(values: &[Cell]) -> Self {
        let has_null = values.iter().any(Option::is_none);
        let mut present = values.iter().flatten().map(String::as_str).peekable();

        if present.peek().is_none() {
            return Self::Float64;
        }

        let present: Vec<&str> = present.collect();

        if present.iter().all(|v| v.parse::<i64>().is_ok()) {
            return if has_null { Self::Float64 } else { Self::Int64 };
        }
        if present.iter().all(|v| v.parse::<f64>().is_ok()) {
            return Self::Float64;
        }
        if !has_null && present.iter().all(|v| is_bool_literal(v)) {
            return Self::Bool;
        }

        Self::Object
    }
}

fn is_bool_literal(v: &str) -> bool {
    matches!(v, "True" | "False" | "true" | "false" | "TRUE" | "FALSE")
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    values: Vec<Cell>,
}

impl Column {
    /// Creates a column.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cells, one per row.
    #[must_use]
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Number of non-missing cells.
    #[must_use]
    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Inferred storage type.
    #[must_use]
    pub fn dtype(&self) -> DType {
        DType::infer(&self.values)
    }

    /// Replaces every missing cell with `value`. Returns how many were
    /// filled.
    pub fn fill_null(&mut self, value: &str) -> usize {
        let mut filled = 0;
        for cell in self.values.iter_mut().filter(|c| c.is_none()) {
            *cell = Some(value.to_string());
            filled += 1;
        }
        filled
    }
}

/// An ordered set of equally long columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Creates an empty table with no columns and no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from rows of `(column, value)` pairs.
    ///
    /// Columns are ordered by first appearance; a column a row does not
    /// mention is missing for that row. If a row names a column twice the
    /// last value wins.
    #[must_use]
    pub fn from_rows<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (String, Cell)>,
    {
        let mut table = Self::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();

        for row in rows {
            for column in &mut table.columns {
                column.values.push(None);
            }

            for (name, value) in row {
                let i = if let Some(&i) = index.get(&name) {
                    i
                } else {
                    let i = table.columns.len();
                    index.insert(name.clone(), i);
                    table
                        .columns
                        .push(Column::new(name, vec![None; table.row_count + 1]));
                    i
                };
                table.columns[i].values[table.row_count] = value;
            }

            table.row_count += 1;
        }

        table
    }

    /// Number of rows.
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by name for modification.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Removes and returns the column called `name`.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let i = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(i))
    }

    /// Adds a column, replacing an existing column of the same name in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::RowCount`] if `values` does not have one
    /// cell per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), TransformError> {
        if values.len() != self.row_count && !self.columns.is_empty() {
            return Err(TransformError::RowCount {
                column: name.to_string(),
                expected: self.row_count,
                actual: values.len(),
            });
        }
        if self.columns.is_empty() {
            self.row_count = values.len();
        }

        match self.column_mut(name) {
            Some(column) => column.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
        Ok(())
    }

    /// Renames every column through `f`.
    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) {
        for column in &mut self.columns {
            column.name = f(&column.name);
        }
    }

    /// One line per column: name, inferred type, and non-missing count.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| {
                format!(
                    "{:<40} {:>8} non-null  {}",
                    c.name,
                    c.non_null_count(),
                    c.dtype()
                )
            })
            .collect()
    }

    /// Reads a headered, comma-delimited CSV stream.
    ///
    /// Missing-value markers (see [`NA_VALUES`]) become `None`. An empty
    /// header at position `i` is named `Unnamed: i`, and a repeated header
    /// gets a `.n` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Csv`] if the stream is not valid CSV or
    /// rows have differing lengths.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, TransformError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let mut names: Vec<String> = Vec::new();
        for (i, header) in reader.headers()?.iter().enumerate() {
            let base = if header.is_empty() {
                format!("Unnamed: {i}")
            } else {
                header.to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while names.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            names.push(name);
        }

        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column::new(name, Vec::new()))
            .collect();
        let mut row_count = 0;

        for record in reader.records() {
            let record = record?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                let cell = (!NA_VALUES.contains(&field)).then(|| field.to_string());
                column.values.push(cell);
            }
            row_count += 1;
        }

        Ok(Self { columns, row_count })
    }

    /// Reads a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] if the file cannot be opened or parsed.
    pub fn read_csv_path(path: &Path) -> Result<Self, TransformError> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(std::io::BufReader::new(file))
    }

    /// Writes the table as headered, comma-delimited CSV without an index
    /// column. Missing cells are written as empty fields. A table with no
    /// columns writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TransformError> {
        if self.columns.is_empty() {
            return Ok(());
        }

        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns.iter().map(Column::name))?;

        for row in 0..self.row_count {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|c| c.values[row].as_deref().unwrap_or("")),
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Writes the table to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError`] if the file cannot be created or written.
    pub fn write_csv_path(&self, path: &Path) -> Result<(), TransformError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Option<&str>]) -> Vec<Cell> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    #[test]
    fn infers_column_types() {
        assert_eq!(DType::infer(&cells(&[Some("1"), Some("-2")])), DType::Int64);
        assert_eq!(DType::infer(&cells(&[Some("1"), None])), DType::Float64);
        assert_eq!(
            DType::infer(&cells(&[Some("51.5"), Some("3")])),
            DType::Float64
        );
        assert_eq!(DType::infer(&cells(&[None, None])), DType::Float64);
        assert_eq!(
            DType::infer(&cells(&[Some("True"), Some("false")])),
            DType::Bool
        );
        assert_eq!(DType::infer(&cells(&[Some("True"), None])), DType::Object);
        assert_eq!(
            DType::infer(&cells(&[Some("burglary"), Some("1")])),
            DType::Object
        );
        assert_eq!(DType::TimeDelta.to_string(), "timedelta[ns]");
    }

    #[test]
    fn builds_from_sparse_rows() {
        let table = Table::from_rows(vec![
            vec![("a".to_string(), Some("1".to_string()))],
            vec![
                ("b".to_string(), Some("x".to_string())),
                ("a".to_string(), Some("2".to_string())),
            ],
            vec![],
        ]);

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), ["a", "b"]);
        assert_eq!(
            table.column("a").unwrap().values(),
            cells(&[Some("1"), Some("2"), None])
        );
        assert_eq!(
            table.column("b").unwrap().values(),
            cells(&[None, Some("x"), None])
        );
    }

    #[test]
    fn reads_missing_markers_as_null() {
        let csv = "id,context,flag\n1,,NaN\n2,NA,yes\n";
        let table = Table::read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("context").unwrap().non_null_count(), 0);
        assert_eq!(
            table.column("flag").unwrap().values(),
            cells(&[None, Some("yes")])
        );
    }

    #[test]
    fn names_blank_and_repeated_headers() {
        let table = Table::read_csv(",a,a\n0,x,y\n".as_bytes()).unwrap();
        assert_eq!(table.column_names(), ["Unnamed: 0", "a", "a.1"]);
    }

    #[test]
    fn write_then_read_preserves_text() {
        let csv = "id,name,lat\n1,\"Smith, J\",51.500\n2,,-0.1\n";
        let table = Table::read_csv(csv.as_bytes()).unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), csv);
    }

    #[test]
    fn set_column_replaces_in_place() {
        let mut table = Table::read_csv("a,b\n1,2\n".as_bytes()).unwrap();
        table.set_column("a", cells(&[Some("9")])).unwrap();
        table.set_column("c", cells(&[Some("3")])).unwrap();
        assert_eq!(table.column_names(), ["a", "b", "c"]);
        assert_eq!(table.column("a").unwrap().values(), cells(&[Some("9")]));
        assert!(table.set_column("d", Vec::new()).is_err());
    }

    #[test]
    fn fills_missing_cells() {
        let mut column = Column::new("c", cells(&[None, Some("x"), None]));
        assert_eq!(column.fill_null("n/a"), 2);
        assert_eq!(column.non_null_count(), 3);
    }
}
