//! The `ExportSink` trait implemented by all export backends.

use crate::row::{SnapshotRow, StepSummaryRow};
use crate::ExportResult;

/// Trait implemented by CSV, SQLite (and any future) export backends.
///
/// `write(snapshot, step)` plus a per-step summary and a final flush. All
/// methods are infallible from the
/// observer's perspective — errors are stored internally by
/// [`crate::observer::ExportObserver`] and retrieved with `take_error`.
pub trait ExportSink {
    /// Write one entity's frozen state for the step it was committed at.
    fn write(&mut self, row: &SnapshotRow) -> ExportResult<()>;

    /// Write one step's summary row.
    fn write_summary(&mut self, row: &StepSummaryRow) -> ExportResult<()>;

    /// Flush and close all underlying file/connection handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> ExportResult<()>;
}
