//! `ExportObserver<S>` — bridges `josh_sim::Observer` to an `ExportSink`.

use josh_core::{RunConfig, Timestep};
use josh_sim::Observer;

use crate::row::{SnapshotRow, StepSummaryRow};
use crate::writer::ExportSink;
use crate::ExportError;

/// An [`Observer`] that writes every committed step's frozen snapshots and a
/// summary row to any [`ExportSink`] backend (CSV, SQLite, …).
///
/// Errors from the sink are stored internally because `Observer` methods
/// have no return value. After `Replicate::run` returns, check for errors
/// with [`take_error`][Self::take_error].
pub struct ExportObserver<S: ExportSink> {
    sink: S,
    start_unix_secs: i64,
    step_duration_secs: u32,
    last_error: Option<ExportError>,
}

impl<S: ExportSink> ExportObserver<S> {
    /// Create an observer backed by `sink`, using `config` for wall-clock
    /// conversion.
    pub fn new(sink: S, config: &RunConfig) -> Self {
        Self {
            sink,
            start_unix_secs: config.start_unix_secs,
            step_duration_secs: config.step_duration_secs,
            last_error: None,
        }
    }

    /// Take the stored write error (if any) after the replicate finishes.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<ExportError> {
        self.last_error.take()
    }

    /// Unwrap the inner sink (e.g. to inspect files after the run).
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn unix_time(&self, step: Timestep) -> i64 {
        self.start_unix_secs + step.0 as i64 * self.step_duration_secs as i64
    }

    fn store_err(&mut self, result: crate::ExportResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<S: ExportSink> Observer for ExportObserver<S> {
    fn on_step_end(&mut self, step: Timestep, frozen: &[josh_sim::StepSnapshot]) {
        let summary = StepSummaryRow {
            step: step.0,
            unix_time_secs: self.unix_time(step),
            entity_count: frozen.len() as u64,
        };
        let result = self.sink.write_summary(&summary);
        self.store_err(result);

        for snapshot in frozen {
            let row = SnapshotRow::from_frozen(&snapshot.entity, step, snapshot.position);
            let result = self.sink.write(&row);
            self.store_err(result);
        }
    }

    fn on_replicate_end(&mut self, _final_step: Timestep) {
        let result = self.sink.finish();
        self.store_err(result);
    }
}
