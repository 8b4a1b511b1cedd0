//! Query execution: SQL text in, a row-oriented [`QueryResult`] or a
//! columnar Arrow result out. Execution errors always propagate with the
//! engine's message; nothing here rewrites or sanitizes caller SQL.

use crate::db::Database;
use chrono::{DateTime, NaiveDate, NaiveTime};
use color_eyre::Result;
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::types::{TimeUnit, ValueRef};
use std::time::{Duration, Instant};

/// Broad classification of an engine column type, used by the profiler to
/// choose a display strategy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
    Temporal,
    Other,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// Classify an engine type name (as reported by DESCRIBE) into a kind.
pub fn column_kind(type_name: &str) -> ColumnKind {
    let t = type_name.to_uppercase();
    if t == "BOOLEAN" || t == "BOOL" {
        ColumnKind::Boolean
    } else if t == "FLOAT" || t == "DOUBLE" || t == "REAL" || t.starts_with("DECIMAL") {
        ColumnKind::Float
    } else if matches!(
        t.as_str(),
        "TINYINT"
            | "SMALLINT"
            | "INTEGER"
            | "INT"
            | "BIGINT"
            | "HUGEINT"
            | "UTINYINT"
            | "USMALLINT"
            | "UINTEGER"
            | "UBIGINT"
    ) {
        ColumnKind::Integer
    } else if t == "DATE" || t == "TIME" || t.starts_with("TIMESTAMP") || t.starts_with("TIME ") {
        ColumnKind::Temporal
    } else if t == "VARCHAR" || t == "TEXT" || t == "STRING" || t == "UUID" || t.starts_with("ENUM")
    {
        ColumnKind::Text
    } else {
        ColumnKind::Other
    }
}

#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: String,
    pub kind: ColumnKind,
}

/// One value of a query result. Temporal and exotic engine types are
/// rendered to text at extraction time; numerics stay numeric so the
/// profiler can aggregate them.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Display rendering. Nulls render empty, matching delimited-text output.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// In-memory tabular output of one query execution. Ephemeral: valid only
/// until the next query replaces it.
#[derive(Clone, Debug)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Cell>>,
    pub elapsed: Duration,
}

impl QueryResult {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[index])
    }
}

impl Database {
    /// Execute a SQL query and return a row-oriented result with timing.
    ///
    /// Column metadata comes from `DESCRIBE` against the query text. For
    /// statements DESCRIBE does not accept (DDL and other non-queries) the
    /// text is executed as a batch and an empty result is returned.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let started = Instant::now();
        let columns = match self.describe_query(sql) {
            Ok(columns) => columns,
            Err(_) => {
                self.execute(sql)?;
                return Ok(QueryResult {
                    columns: Vec::new(),
                    rows: Vec::new(),
                    elapsed: started.elapsed(),
                });
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut raw = stmt.query([])?;
        let mut rows = Vec::new();
        while let Some(row) = raw.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                cells.push(cell_from_value(row.get_ref(i)?));
            }
            rows.push(cells);
        }
        Ok(QueryResult {
            columns,
            rows,
            elapsed: started.elapsed(),
        })
    }

    /// Execute a SQL query and return the columnar exchange shape: Arrow
    /// record batches, suitable for bulk transfer without row conversion.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    fn describe_query(&self, sql: &str) -> Result<Vec<ColumnMeta>> {
        let trimmed = sql.trim().trim_end_matches(';');
        let mut stmt = self.conn.prepare(&format!("DESCRIBE {trimmed}"))?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let type_name: String = row.get(1)?;
            let kind = column_kind(&type_name);
            columns.push(ColumnMeta {
                name,
                type_name,
                kind,
            });
        }
        Ok(columns)
    }
}

fn cell_from_value(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Boolean(b) => Cell::Bool(b),
        ValueRef::TinyInt(v) => Cell::Int(v as i64),
        ValueRef::SmallInt(v) => Cell::Int(v as i64),
        ValueRef::Int(v) => Cell::Int(v as i64),
        ValueRef::BigInt(v) => Cell::Int(v),
        ValueRef::HugeInt(v) => match i64::try_from(v) {
            Ok(v) => Cell::Int(v),
            Err(_) => Cell::Float(v as f64),
        },
        ValueRef::UTinyInt(v) => Cell::Int(v as i64),
        ValueRef::USmallInt(v) => Cell::Int(v as i64),
        ValueRef::UInt(v) => Cell::Int(v as i64),
        ValueRef::UBigInt(v) => match i64::try_from(v) {
            Ok(v) => Cell::Int(v),
            Err(_) => Cell::Float(v as f64),
        },
        ValueRef::Float(v) => Cell::Float(v as f64),
        ValueRef::Double(v) => Cell::Float(v),
        ValueRef::Decimal(d) => Cell::Float(d.to_string().parse().unwrap_or(f64::NAN)),
        ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Cell::Text(format!("<blob: {} bytes>", bytes.len())),
        ValueRef::Date32(days) => Cell::Text(render_date32(days)),
        ValueRef::Time64(unit, v) => Cell::Text(render_time64(unit, v)),
        ValueRef::Timestamp(unit, v) => Cell::Text(render_timestamp(unit, v)),
        other => Cell::Text(format!("{other:?}")),
    }
}

fn render_date32(days: i32) -> String {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date");
    let date = epoch + chrono::Duration::days(days as i64);
    date.format("%Y-%m-%d").to_string()
}

fn render_time64(unit: TimeUnit, value: i64) -> String {
    let micros = to_micros(unit, value);
    let secs = (micros / 1_000_000) as u32;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
        Some(t) if nanos != 0 => t.format("%H:%M:%S%.6f").to_string(),
        Some(t) => t.format("%H:%M:%S").to_string(),
        None => value.to_string(),
    }
}

fn render_timestamp(unit: TimeUnit, value: i64) -> String {
    let micros = to_micros(unit, value);
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) if micros % 1_000_000 != 0 => {
            dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
        }
        Some(dt) => dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
        None => value.to_string(),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}
