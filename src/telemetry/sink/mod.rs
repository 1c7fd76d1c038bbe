//! Persistence sinks: consumers of snapshot views invoked by the aggregator
//! whenever the snapshot changed.
pub mod csv_file;

use crate::error::PersistError;
use crate::telemetry::snapshot::SnapshotView;

pub use csv_file::{render_record, CsvFileSink, CsvOptions};

/// Contract for anything that stores or forwards a snapshot.
///
/// A failure is reported to the caller, which logs it and keeps running.
pub trait PersistenceSink {
    fn persist(&mut self, view: &SnapshotView) -> Result<(), PersistError>;
}

impl<F> PersistenceSink for F
where
    F: FnMut(&SnapshotView) -> Result<(), PersistError>,
{
    fn persist(&mut self, view: &SnapshotView) -> Result<(), PersistError> {
        self(view)
    }
}
