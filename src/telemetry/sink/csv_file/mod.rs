//! Single-line CSV file sink.
//!
//! The file always holds exactly the latest reading set: each write goes to
//! a temporary file in the target directory, is flushed and synced, then
//! renamed over the target. Readers of the file (the radio transmitter)
//! therefore see either the previous line or the new one.
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::{Channel, ChannelKind};
use crate::error::PersistError;
use crate::telemetry::sink::PersistenceSink;
use crate::telemetry::snapshot::SnapshotView;

/// Rendering options of the CSV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Write a header row with the column names before the values.
    pub header: bool,
    /// Text written for channels never observed.
    pub placeholder: String,
    /// Decimal places of real-valued channels.
    pub precision: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            header: false,
            placeholder: String::new(),
            precision: 2,
        }
    }
}

/// Render the snapshot as one record in [`Channel::ALL`] order.
///
/// Real channels use `precision` decimals, flags render `1`/`0`, and
/// invalid channels render the placeholder.
pub fn render_record(view: &SnapshotView, options: &CsvOptions) -> Vec<String> {
    view.iter()
        .map(|(channel, sample)| match sample {
            None => options.placeholder.clone(),
            Some(sample) => match channel.kind() {
                ChannelKind::Flag => {
                    if sample.value != 0.0 {
                        "1".to_owned()
                    } else {
                        "0".to_owned()
                    }
                }
                ChannelKind::Real => format!("{:.*}", options.precision, sample.value),
            },
        })
        .collect()
}

/// Sink rewriting one CSV file atomically on every call.
#[derive(Debug)]
pub struct CsvFileSink {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PersistenceSink for CsvFileSink {
    fn persist(&mut self, view: &SnapshotView) -> Result<(), PersistError> {
        // Dropping an unpersisted temporary file removes it.
        let mut temp = NamedTempFile::new_in(self.directory()).map_err(|e| self.io_error(e))?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(temp.as_file_mut());
            if self.options.header {
                writer.write_record(Channel::ALL.iter().map(|channel| channel.column_name()))?;
            }
            writer.write_record(render_record(view, &self.options))?;
            writer.flush().map_err(|e| self.io_error(e))?;
        }

        temp.as_file_mut().flush().map_err(|e| self.io_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        temp.persist(&self.path)
            .map_err(|source| PersistError::Replace {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), valid = view.valid_count(), "wrote telemetry record");
        Ok(())
    }
}
