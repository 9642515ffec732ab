//! Dated snapshot files and the manifest that hands them between stages.
//!
//! Each stage writes one CSV per day into the data directory:
//!
//! - `<YYYYMMDD>-raw_police_data.csv`
//! - `<YYYYMMDD>_tidy_police_data.csv`
//!
//! When stages run in one process the paths travel in a
//! [`SnapshotManifest`]. A stage started on its own falls back to the most
//! recently modified file carrying the right marker.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;

use crate::TransformError;

/// Substring identifying raw snapshots.
pub const RAW_MARKER: &str = "raw_police_data";

/// Substring identifying tidy snapshots.
pub const TIDY_MARKER: &str = "tidy_police_data";

/// Which snapshot a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// As fetched, flattened.
    Raw,
    /// Cleaned and encoded, ready to load.
    Tidy,
}

impl SnapshotKind {
    /// Substring every file of this kind contains.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Raw => RAW_MARKER,
            Self::Tidy => TIDY_MARKER,
        }
    }

    /// File name for the snapshot taken on `date`.
    #[must_use]
    pub fn file_name(self, date: NaiveDate) -> String {
        let stamp = date.format("%Y%m%d");
        match self {
            Self::Raw => format!("{stamp}-{RAW_MARKER}.csv"),
            Self::Tidy => format!("{stamp}_{TIDY_MARKER}.csv"),
        }
    }

    /// Full path of the snapshot taken on `date` inside `dir`.
    #[must_use]
    pub fn path(self, dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(self.file_name(date))
    }
}

/// Today's date in local time, used to stamp snapshot names.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Finds the most recently modified file in `dir` whose name contains the
/// marker for `kind`. Ties on modification time go to the greater name.
///
/// # Errors
///
/// Returns [`TransformError::MissingSnapshot`] if no such file exists, or
/// [`TransformError::Io`] if the directory cannot be read.
pub fn latest_snapshot(dir: &Path, kind: SnapshotKind) -> Result<PathBuf, TransformError> {
    let mut best: Option<(SystemTime, String, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(kind.marker()) {
            continue;
        }

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified()?;
        let candidate = (modified, name, entry.path());
        if best
            .as_ref()
            .is_none_or(|b| (&candidate.0, &candidate.1) > (&b.0, &b.1))
        {
            best = Some(candidate);
        }
    }

    best.map(|(_, _, path)| path)
        .ok_or_else(|| TransformError::MissingSnapshot {
            dir: dir.to_path_buf(),
            marker: kind.marker(),
        })
}

/// Snapshot paths produced so far in this process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotManifest {
    /// Raw snapshot written by the download stage.
    pub raw: Option<PathBuf>,
    /// Tidy snapshot written by the transform stage.
    pub tidy: Option<PathBuf>,
}

impl SnapshotManifest {
    /// Returns the recorded path for `kind`, or discovers the latest file
    /// in `dir` when none was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::MissingSnapshot`] if nothing was recorded
    /// and no matching file exists.
    pub fn resolve(&self, dir: &Path, kind: SnapshotKind) -> Result<PathBuf, TransformError> {
        let recorded = match kind {
            SnapshotKind::Raw => self.raw.as_ref(),
            SnapshotKind::Tidy => self.tidy.as_ref(),
        };

        if let Some(path) = recorded {
            log::debug!("Using {} from manifest", path.display());
            return Ok(path.clone());
        }

        let path = latest_snapshot(dir, kind)?;
        log::info!("Using latest {} snapshot: {}", kind.marker(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn touch(path: &Path, secs_after_epoch: u64) {
        std::fs::write(path, "a\n1\n").unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    #[test]
    fn names_snapshots_by_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            SnapshotKind::Raw.file_name(date),
            "20240307-raw_police_data.csv"
        );
        assert_eq!(
            SnapshotKind::Tidy.file_name(date),
            "20240307_tidy_police_data.csv"
        );
    }

    #[test]
    fn picks_most_recently_modified() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("20240101-raw_police_data.csv"), 2_000);
        touch(&dir.path().join("20240301-raw_police_data.csv"), 1_000);
        touch(&dir.path().join("20240401_tidy_police_data.csv"), 3_000);

        let latest = latest_snapshot(dir.path(), SnapshotKind::Raw).unwrap();
        assert_eq!(latest, dir.path().join("20240101-raw_police_data.csv"));
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("crime_categories.json"), 1_000);
        let err = latest_snapshot(dir.path(), SnapshotKind::Tidy).unwrap_err();
        assert!(matches!(err, TransformError::MissingSnapshot { .. }));
    }

    #[test]
    fn manifest_path_wins_over_discovery() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("20240101-raw_police_data.csv"), 5_000);
        let explicit = dir.path().join("20231231-raw_police_data.csv");
        touch(&explicit, 1_000);

        let manifest = SnapshotManifest {
            raw: Some(explicit.clone()),
            tidy: None,
        };
        assert_eq!(
            manifest.resolve(dir.path(), SnapshotKind::Raw).unwrap(),
            explicit
        );
        assert!(manifest.resolve(dir.path(), SnapshotKind::Tidy).is_err());
    }
}
