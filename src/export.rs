//! Result export through the engine's COPY statement.

use crate::db::{quote_ident, quote_literal, Database};
use clap::ValueEnum;
use color_eyre::Result;
use std::path::Path;
use tracing::info;

/// Export formats for the currently displayed result or a whole table.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    /// Comma-separated values, UTF-8, with a header row
    Csv,
    /// Parquet columnar format
    Parquet,
    /// Spreadsheet (requires the engine's excel extension)
    Xlsx,
}

impl ExportFormat {
    /// Detect the export format from a path extension. None when the
    /// extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())?
            .to_lowercase()
            .as_str()
        {
            "csv" => Some(Self::Csv),
            "parquet" | "pq" => Some(Self::Parquet),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    fn copy_options(self) -> &'static str {
        match self {
            ExportFormat::Csv => "FORMAT CSV, HEADER",
            ExportFormat::Parquet => "FORMAT PARQUET",
            ExportFormat::Xlsx => "FORMAT xlsx",
        }
    }
}

/// Export the result of a query. The query is re-run by the engine inside
/// COPY; errors propagate with the engine's message.
pub fn export_query(db: &Database, sql: &str, path: &Path, format: ExportFormat) -> Result<()> {
    if format == ExportFormat::Xlsx {
        db.execute("INSTALL excel; LOAD excel;")?;
    }
    let statement = copy_sql(sql, path, format);
    info!(path = %path.display(), "exporting query result");
    db.execute(&statement)
}

/// Export a whole table.
pub fn export_table(db: &Database, table: &str, path: &Path, format: ExportFormat) -> Result<()> {
    export_query(db, &format!("SELECT * FROM {}", quote_ident(table)), path, format)
}

fn copy_sql(sql: &str, path: &Path, format: ExportFormat) -> String {
    let query = sql.trim().trim_end_matches(';');
    format!(
        "COPY ({query}) TO {} ({})",
        quote_literal(&path.to_string_lossy()),
        format.copy_options()
    )
}
