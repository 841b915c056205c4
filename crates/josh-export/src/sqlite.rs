//! SQLite export backend (feature `sqlite`).
//!
//! Creates a single `output.db` file in the configured output directory: one
//! table per entity type (named after the type, quoted so arbitrary program
//! names are safe identifiers) plus a shared `step_summaries` table. A
//! type's table is created lazily from the first [`SnapshotRow`] written for
//! it, with one `TEXT` column per attribute — values are stored via
//! `Value`'s `Display` rendering rather than native SQL types, since a
//! program's attributes can be `Bool`/`Int64`/`Decimal`/`String`/`EntityRef`/
//! `Distribution` and SQLite has no column type that fits all of them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;

use crate::row::{SnapshotRow, StepSummaryRow};
use crate::writer::ExportSink;
use crate::ExportResult;

/// Double any embedded `"` so `name` is safe to splice into a quoted SQL
/// identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Writes frozen snapshots to an SQLite database.
pub struct SqliteSink {
    conn: Connection,
    known_tables: HashMap<Arc<str>, Vec<Arc<str>>>,
    finished: bool,
}

impl SqliteSink {
    /// Open (or create) `output.db` in `dir` and initialise the shared
    /// summary table's schema.
    pub fn new(dir: &Path) -> ExportResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS step_summaries (
                 step           INTEGER PRIMARY KEY,
                 unix_time_secs INTEGER NOT NULL,
                 entity_count   INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, known_tables: HashMap::new(), finished: false })
    }

    fn ensure_table(&mut self, row: &SnapshotRow) -> ExportResult<Vec<Arc<str>>> {
        if let Some(attrs) = self.known_tables.get(&row.type_name) {
            return Ok(attrs.clone());
        }

        let table = quote_ident(&row.type_name);
        let attributes: Vec<Arc<str>> = row.attributes.iter().map(|(name, _)| name.clone()).collect();

        let mut columns = vec![
            "step INTEGER NOT NULL".to_string(),
            "entity_id INTEGER NOT NULL".to_string(),
            "position_x REAL".to_string(),
            "position_y REAL".to_string(),
        ];
        columns.extend(attributes.iter().map(|a| format!("{} TEXT", quote_ident(a))));

        self.conn.execute_batch(&format!("CREATE TABLE IF NOT EXISTS {table} ({});", columns.join(", ")))?;
        self.known_tables.insert(row.type_name.clone(), attributes.clone());
        Ok(attributes)
    }
}

impl ExportSink for SqliteSink {
    fn write(&mut self, row: &SnapshotRow) -> ExportResult<()> {
        let attributes = self.ensure_table(row)?;
        let table = quote_ident(&row.type_name);

        let mut columns = vec!["step".to_string(), "entity_id".to_string(), "position_x".to_string(), "position_y".to_string()];
        columns.extend(attributes.iter().map(|a| quote_ident(a)));

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!("INSERT INTO {table} ({}) VALUES ({})", columns.join(", "), placeholders.join(", "));

        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(row.step as i64),
            Box::new(row.entity.0),
            Box::new(row.position.map(|(x, _)| x)),
            Box::new(row.position.map(|(_, y)| y)),
        ];
        for name in &attributes {
            let rendered = row.attribute(name).map(|v| v.to_string());
            params.push(Box::new(rendered));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.conn.execute(&sql, param_refs.as_slice())?;
        Ok(())
    }

    fn write_summary(&mut self, row: &StepSummaryRow) -> ExportResult<()> {
        self.conn.execute(
            "INSERT INTO step_summaries (step, unix_time_secs, entity_count) VALUES (?1, ?2, ?3)",
            rusqlite::params![row.step, row.unix_time_secs, row.entity_count],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
