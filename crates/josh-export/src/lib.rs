//! Frozen-snapshot export sinks for the Josh simulation engine.
//!
//! Two backends are provided behind Cargo features:
//!
//! | Feature   | Backend | Files created                                |
//! |-----------|---------|-----------------------------------------------|
//! | *(none)*  | CSV     | `<EntityType>.csv` per type, `step_summaries.csv` |
//! | `sqlite`  | SQLite  | `output.db` (one table per type, `step_summaries`) |
//!
//! Both backends implement [`ExportSink`] and are driven by
//! [`ExportObserver`], which implements `josh_sim::Observer`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use josh_export::{CsvSink, ExportObserver};
//!
//! let sink = CsvSink::new(Path::new("./output")).unwrap();
//! let mut obs = ExportObserver::new(sink, &config);
//! replicate.run(&mut obs, &cancel, None).unwrap();
//! obs.take_error().map(|e| eprintln!("export error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use csv::CsvSink;
pub use error::{ExportError, ExportResult};
pub use observer::ExportObserver;
pub use row::{SnapshotRow, StepSummaryRow};
pub use writer::ExportSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSink;
