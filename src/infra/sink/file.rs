//! Append-only file sink with lazy daily rotation.
//!
//! Files are named `<prefix>-<yyyy-MM-dd>.log` inside the log directory. The
//! target date is recomputed from the clock on every write, so a process that
//! sits idle over midnight still lands its next record in the new day's file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::core::error::SinkError;
use crate::util::Clock;

/// Date layout used in file names.
pub const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

struct OpenLog {
    date: NaiveDate,
    path: PathBuf,
    file: File,
}

/// Daily-rotating, append-only log file writer.
pub struct RollingFileSink {
    dir: PathBuf,
    prefix: String,
    clock: Arc<dyn Clock>,
    current: Option<OpenLog>,
}

impl RollingFileSink {
    /// Create the log directory if needed and open today's file.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::CreateDir`] or [`SinkError::Open`] when the
    /// directory or file cannot be created.
    pub fn open(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SinkError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut sink = Self {
            dir,
            prefix: prefix.into(),
            clock,
            current: None,
        };
        let today = sink.clock.today();
        sink.rotate_to(today)?;
        Ok(sink)
    }

    /// Path of the file for `date`.
    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}-{}.log", self.prefix, date.format(FILE_DATE_FORMAT)))
    }

    /// Path of the currently open file.
    #[must_use]
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|log| log.path.as_path())
    }

    /// Append `text`, rotating first if the date has moved on.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] if the new day's file cannot be created, or
    /// [`SinkError::Write`] if the append fails.
    pub fn write(&mut self, text: &str) -> Result<(), SinkError> {
        let today = self.clock.today();
        if self.current.as_ref().map(|log| log.date) != Some(today) {
            self.rotate_to(today)?;
        }

        let Some(log) = self.current.as_mut() else {
            return Ok(());
        };
        log.file
            .write_all(text.as_bytes())
            .and_then(|()| log.file.flush())
            .map_err(|source| SinkError::Write {
                path: log.path.clone(),
                source,
            })
    }

    fn rotate_to(&mut self, date: NaiveDate) -> Result<(), SinkError> {
        let path = self.path_for(date);
        // Directory may have been removed while running.
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|source| SinkError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;

        if let Some(previous) = self.current.replace(OpenLog { date, path, file }) {
            debug!(from = %previous.path.display(), "log file rotated");
        }
        Ok(())
    }
}

impl std::fmt::Debug for RollingFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingFileSink")
            .field("dir", &self.dir)
            .field("prefix", &self.prefix)
            .field("current", &self.current_path())
            .finish_non_exhaustive()
    }
}
