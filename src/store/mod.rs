//! Result Store - durable, write-once experiment records
//!
//! One authoritative JSON document per orchestration run, plus projections
//! derived from it:
//!
//! ```text
//! <dir>/parallel_benchmark_<token>.json   authoritative, one flat object per cell
//! <dir>/parallel_benchmark_<token>.csv    flattened rows
//! <dir>/parallel_summary_<token>.txt      human-readable tables
//! ```
//!
//! "Most recent" is decided by the [`RunToken`] embedded in the file name,
//! never by file modification time, so copied or restored result
//! directories keep their order.
//!
//! ## Example
//!
//! ```rust
//! use scalebench::experiment::{BaselineIndex, ExperimentRecord};
//! use scalebench::store::ResultStore;
//!
//! # fn main() -> scalebench::Result<()> {
//! let dir = std::env::temp_dir().join(format!("scalebench-doc-{}", std::process::id()));
//! let store = ResultStore::new(&dir);
//!
//! let record = ExperimentRecord::new(BaselineIndex::new(), Vec::new());
//! store.save(&record)?;
//!
//! assert_eq!(store.load_latest()?, record);
//! # std::fs::remove_dir_all(&dir)?;
//! # Ok(())
//! # }
//! ```

mod csv;
mod summary;

pub use csv::{generate_csv_report, CSV_HEADER};
pub use summary::generate_summary;

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::experiment::{ExperimentRecord, RunToken};
use crate::{Error, Result};

/// File name prefix of authoritative records.
pub const RECORD_PREFIX: &str = "parallel_benchmark_";
/// File name prefix of summary projections.
pub const SUMMARY_PREFIX: &str = "parallel_summary_";

/// Paths written by [`ResultStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecord {
    /// Authoritative JSON record
    pub json: PathBuf,
    /// CSV projection
    pub csv: PathBuf,
    /// Summary projection
    pub summary: PathBuf,
}

/// Directory-backed store of experiment records.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Create a store rooted at `dir`. The directory is created by
    /// [`prepare`](Self::prepare) or on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the authoritative record for a token.
    #[must_use]
    pub fn record_path(&self, token: RunToken) -> PathBuf {
        self.dir.join(format!("{RECORD_PREFIX}{token}.json"))
    }

    /// Path of the CSV projection for a token.
    #[must_use]
    pub fn csv_path(&self, token: RunToken) -> PathBuf {
        self.dir.join(format!("{RECORD_PREFIX}{token}.csv"))
    }

    /// Path of the summary projection for a token.
    #[must_use]
    pub fn summary_path(&self, token: RunToken) -> PathBuf {
        self.dir.join(format!("{SUMMARY_PREFIX}{token}.txt"))
    }

    /// Create the store directory and check that it accepts new files.
    ///
    /// Called before any trial runs, so an unusable location fails the run
    /// up front instead of after the whole matrix was measured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultsDirUnwritable`] if the directory cannot be
    /// created or a file cannot be created inside it.
    pub fn prepare(&self) -> Result<()> {
        let unwritable = |source| Error::ResultsDirUnwritable {
            dir: self.dir.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(unwritable)?;
        // Removed again on drop.
        tempfile::Builder::new()
            .prefix(".scalebench-")
            .tempfile_in(&self.dir)
            .map_err(unwritable)?;
        debug!(dir = %self.dir.display(), "results directory is writable");
        Ok(())
    }

    /// Persist a record and its projections.
    ///
    /// The JSON document is written first with create-new semantics; the
    /// projections are derived from the same record afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordExists`] if a record with the same token is
    /// already stored, or an I/O / serialization error.
    pub fn save(&self, record: &ExperimentRecord) -> Result<SavedRecord> {
        fs::create_dir_all(&self.dir)?;
        let token = record.timestamp();

        let json = self.record_path(token);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&json)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::RecordExists { path: json.clone() },
                _ => Error::Io(e),
            })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(path = %json.display(), "JSON saved");

        let csv = self.csv_path(token);
        fs::write(&csv, generate_csv_report(record))?;
        info!(path = %csv.display(), "CSV saved");

        let summary = self.summary_path(token);
        fs::write(&summary, generate_summary(record))?;
        info!(path = %summary.display(), "Summary saved");

        Ok(SavedRecord {
            json,
            csv,
            summary,
        })
    }

    /// Tokens of all stored records, oldest first.
    ///
    /// A missing directory holds no records. Files whose name does not carry
    /// a valid token are ignored.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory exists but cannot be read.
    pub fn list_tokens(&self) -> Result<Vec<RunToken>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tokens = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(raw) = name
                .strip_prefix(RECORD_PREFIX)
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            match raw.parse::<RunToken>() {
                Ok(token) => tokens.push(token),
                Err(_) => debug!(file = name, "ignoring record with malformed token"),
            }
        }
        tokens.sort_unstable();
        Ok(tokens)
    }

    /// Load the record stored under a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no such record exists, or an
    /// I/O / deserialization error.
    pub fn load(&self, token: RunToken) -> Result<ExperimentRecord> {
        let path = self.record_path(token);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::RecordNotFound {
                    dir: self.dir.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the record with the greatest token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] when the store is empty.
    pub fn load_latest(&self) -> Result<ExperimentRecord> {
        let latest = self
            .list_tokens()?
            .pop()
            .ok_or_else(|| Error::RecordNotFound {
                dir: self.dir.clone(),
            })?;
        info!(path = %self.record_path(latest).display(), "Loading latest record");
        self.load(latest)
    }
}
