//! CSV export backend.
//!
//! Creates one file per entity type encountered (`<type_name>.csv`) plus a
//! shared `step_summaries.csv`, all in the configured output directory. Each
//! entity-type file's header is taken from the first [`SnapshotRow`] written
//! for that type — every later row for the same type is expected to carry
//! the same attribute set (true for any single entity type's descriptor,
//! short of a schema migration mid-run, see `AttributeStore::mark_only_on_prior`);
//! a row missing an attribute the header already has simply writes an empty
//! field rather than shifting later columns.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::Writer;

use crate::row::{SnapshotRow, StepSummaryRow};
use crate::writer::ExportSink;
use crate::ExportResult;

struct TypeFile {
    writer: Writer<File>,
    attributes: Vec<Arc<str>>,
}

/// Writes frozen snapshots to one CSV file per entity type.
pub struct CsvSink {
    dir: PathBuf,
    by_type: HashMap<Arc<str>, TypeFile>,
    summaries: Writer<File>,
    finished: bool,
}

impl CsvSink {
    /// Open (or create) `dir` and its `step_summaries.csv`. Per-type files
    /// are created lazily on the first row written for that type.
    pub fn new(dir: &Path) -> ExportResult<Self> {
        let mut summaries = Writer::from_path(dir.join("step_summaries.csv"))?;
        summaries.write_record(["step", "unix_time_secs", "entity_count"])?;

        Ok(Self {
            dir: dir.to_path_buf(),
            by_type: HashMap::new(),
            summaries,
            finished: false,
        })
    }

    fn file_for(&mut self, row: &SnapshotRow) -> ExportResult<&mut TypeFile> {
        if !self.by_type.contains_key(&row.type_name) {
            let path = self.dir.join(format!("{}.csv", row.type_name));
            let mut writer = Writer::from_path(path)?;
            let attributes: Vec<Arc<str>> = row.attributes.iter().map(|(name, _)| name.clone()).collect();

            let mut header = vec!["step".to_string(), "entity_id".to_string(), "position_x".to_string(), "position_y".to_string()];
            header.extend(attributes.iter().map(|a| a.to_string()));
            writer.write_record(&header)?;

            self.by_type.insert(row.type_name.clone(), TypeFile { writer, attributes });
        }
        Ok(self.by_type.get_mut(&row.type_name).expect("just inserted"))
    }
}

impl ExportSink for CsvSink {
    fn write(&mut self, row: &SnapshotRow) -> ExportResult<()> {
        let (px, py) = row.position.map(|(x, y)| (x.to_string(), y.to_string())).unwrap_or_default();
        let file = self.file_for(row)?;

        let mut record = vec![row.step.to_string(), row.entity.0.to_string(), px, py];
        for name in &file.attributes {
            let value = row.attribute(name).map(|v| v.to_string()).unwrap_or_default();
            record.push(value);
        }
        file.writer.write_record(&record)?;
        Ok(())
    }

    fn write_summary(&mut self, row: &StepSummaryRow) -> ExportResult<()> {
        self.summaries.write_record([row.step.to_string(), row.unix_time_secs.to_string(), row.entity_count.to_string()])?;
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.summaries.flush()?;
        for file in self.by_type.values_mut() {
            file.writer.flush()?;
        }
        Ok(())
    }
}
