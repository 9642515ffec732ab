//! Bulk loading of the tidy snapshot.
//!
//! The destination table is dropped, recreated from the synthesized column
//! clause, filled with `COPY ... FROM STDIN`, and granted to `public`, all
//! inside one transaction. Dropping an uncommitted transaction rolls it
//! back, so a failure at any step leaves the previous table in place.

use std::path::Path;
use std::pin::pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_postgres::{Config, CopyInSink, Transaction};

use crate::DbError;

/// Bytes read from the upload file per `COPY` message.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// The statements a bulk load issues, in order.
#[async_trait]
pub trait LoadSession: Send {
    /// Runs a statement that returns no rows.
    async fn run_statement(&mut self, sql: &str) -> Result<(), DbError>;

    /// Runs a `COPY ... FROM STDIN` statement fed from `data`. Returns the
    /// number of rows copied.
    async fn copy_from(
        &mut self,
        sql: &str,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, DbError>;
}

#[async_trait]
impl LoadSession for Transaction<'_> {
    async fn run_statement(&mut self, sql: &str) -> Result<(), DbError> {
        log::debug!("{sql}");
        self.batch_execute(sql).await?;
        Ok(())
    }

    async fn copy_from(
        &mut self,
        sql: &str,
        data: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64, DbError> {
        log::debug!("{sql}");
        let sink: CopyInSink<Bytes> = self.copy_in(sql).await?;
        let mut sink = pin!(sink);

        let mut buf = vec![0_u8; COPY_CHUNK_SIZE];
        loop {
            let n = data.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            sink.send(Bytes::copy_from_slice(&buf[..n])).await?;
        }

        Ok(sink.as_mut().finish().await?)
    }
}

/// `drop table if exists <table>`
#[must_use]
pub fn drop_table_sql(table: &str) -> String {
    format!("drop table if exists {table}")
}

/// `CREATE TABLE <table> (<columns>)`
#[must_use]
pub fn create_table_sql(table: &str, column_clause: &str) -> String {
    format!("CREATE TABLE {table} ({column_clause})")
}

/// `COPY` statement reading a headered, comma-delimited CSV from stdin.
#[must_use]
pub fn copy_sql(table: &str) -> String {
    format!("COPY {table} FROM STDIN WITH CSV HEADER DELIMITER AS ','")
}

/// `grant select on table <table> to public`
#[must_use]
pub fn grant_sql(table: &str) -> String {
    format!("grant select on table {table} to public")
}

/// Replaces `table` with the contents of the CSV at `csv_path` through
/// `session`. The caller commits.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be opened or any statement fails.
/// No further statements are issued after the first failure.
pub async fn bulk_load(
    session: &mut dyn LoadSession,
    table: &str,
    column_clause: &str,
    csv_path: &Path,
) -> Result<u64, DbError> {
    let mut file = tokio::fs::File::open(csv_path).await?;

    session.run_statement(&drop_table_sql(table)).await?;
    session
        .run_statement(&create_table_sql(table, column_clause))
        .await?;

    let rows = session.copy_from(&copy_sql(table), &mut file).await?;
    log::info!("Copied {rows} rows from {} into {table}", csv_path.display());

    session.run_statement(&grant_sql(table)).await?;

    Ok(rows)
}

/// Connects with `config` and bulk loads `csv_path` into `table` in a
/// single committed transaction.
///
/// # Errors
///
/// Returns [`DbError`] if connecting, any statement, or the commit fails.
/// The transaction is rolled back in that case.
pub async fn load_into_postgres(
    config: &Config,
    table: &str,
    column_clause: &str,
    csv_path: &Path,
) -> Result<u64, DbError> {
    let mut client = crate::db::connect(config).await?;
    let mut transaction = client.transaction().await?;

    let rows = bulk_load(&mut transaction, table, column_clause, csv_path).await?;

    transaction.commit().await?;
    log::info!("Committed load of {table}");

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSession {
        statements: Vec<String>,
        copied: Vec<u8>,
        fail_on: Option<&'static str>,
    }

    impl RecordingSession {
        fn check(&self, sql: &str) -> Result<(), DbError> {
            match self.fail_on {
                Some(prefix) if sql.starts_with(prefix) => Err(DbError::MissingConfig {
                    message: format!("rejected {sql}"),
                }),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl LoadSession for RecordingSession {
        async fn run_statement(&mut self, sql: &str) -> Result<(), DbError> {
            self.statements.push(sql.to_string());
            self.check(sql)
        }

        async fn copy_from(
            &mut self,
            sql: &str,
            data: &mut (dyn AsyncRead + Unpin + Send),
        ) -> Result<u64, DbError> {
            self.statements.push(sql.to_string());
            self.check(sql)?;
            data.read_to_end(&mut self.copied).await?;
            let lines = self.copied.iter().filter(|&&b| b == b'\n').count();
            Ok(u64::try_from(lines.saturating_sub(1)).unwrap())
        }
    }

    fn tidy_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("20220701_tidy_police_data.csv");
        std::fs::write(&path, "id,category\n1,burglary\n2,drugs\n").unwrap();
        path
    }

    #[tokio::test]
    async fn issues_statements_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = tidy_file(&dir);
        let mut session = RecordingSession::default();

        let rows = bulk_load(&mut session, "police_data", "id int, category varchar", &path)
            .await
            .unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            session.statements,
            [
                "drop table if exists police_data",
                "CREATE TABLE police_data (id int, category varchar)",
                "COPY police_data FROM STDIN WITH CSV HEADER DELIMITER AS ','",
                "grant select on table police_data to public",
            ]
        );
        assert_eq!(session.copied, std::fs::read(&path).unwrap());
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = tidy_file(&dir);
        let mut session = RecordingSession {
            fail_on: Some("CREATE"),
            ..RecordingSession::default()
        };

        assert!(
            bulk_load(&mut session, "police_data", "id int", &path)
                .await
                .is_err()
        );
        assert_eq!(session.statements.len(), 2);
        assert!(session.copied.is_empty());
    }

    #[tokio::test]
    async fn missing_file_issues_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = RecordingSession::default();

        let err = bulk_load(&mut session, "police_data", "id int", &dir.path().join("none.csv"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Io(_)));
        assert!(session.statements.is_empty());
    }
}
