//! Storage backend context: an explicit handle over the embedded analytical
//! engine, passed to every component that needs database access.

use crate::config::AppConfig;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use duckdb::Connection;
use std::path::PathBuf;
use tracing::{info, warn};

/// Tables with this prefix are internal bookkeeping and are excluded from
/// user-facing listings.
pub const RESERVED_TABLE_PREFIX: &str = "__";

/// Explicit storage-engine context. Owns the single process-wide connection;
/// open/close/switch are explicit operations rather than global mutation.
pub struct Database {
    pub(crate) conn: Connection,
    databases_folder: PathBuf,
    s3_region: Option<String>,
    s3_access_key_id: Option<String>,
    s3_secret_access_key: Option<String>,
    remote_enabled: bool,
    spatial_enabled: bool,
}

/// Name and ordered (column name, engine type) pairs of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<(String, String)>,
}

/// Quote an identifier for interpolation into engine SQL: wrapped in double
/// quotes with embedded double quotes doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (e.g. a file path) for interpolation into engine
/// SQL: wrapped in single quotes with embedded single quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Database {
    /// Open an in-memory database and load extensions.
    pub fn open_in_memory(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    /// Open the configured default database, or an in-memory one when no
    /// default is configured.
    pub fn open_default(config: &AppConfig) -> Result<Self> {
        match &config.storage.default_database {
            Some(name) => Self::open_named(config, name),
            None => Self::open_in_memory(config),
        }
    }

    /// Open (creating if needed) a named `.db` file under the configured
    /// databases folder.
    pub fn open_named(config: &AppConfig, name: &str) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.databases_folder)?;
        let path = config
            .storage
            .databases_folder
            .join(format!("{}.db", name.trim_end_matches(".db")));
        info!(path = %path.display(), "connecting to database");
        let conn = Connection::open(&path)?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: &AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.download_folder)?;
        let mut db = Self {
            conn,
            databases_folder: config.storage.databases_folder.clone(),
            s3_region: config.s3.region.clone(),
            s3_access_key_id: config.s3.access_key_id.clone(),
            s3_secret_access_key: config.s3.secret_access_key.clone(),
            remote_enabled: false,
            spatial_enabled: false,
        };
        db.load_extensions();
        Ok(db)
    }

    /// Load the httpfs and spatial extensions and apply S3 credentials.
    /// Best-effort: failures (offline build, no credentials) degrade remote
    /// and geospatial functionality instead of blocking local workflows.
    fn load_extensions(&mut self) {
        match self.conn.execute_batch("INSTALL httpfs; LOAD httpfs;") {
            Ok(()) => {
                self.remote_enabled = true;
                if let Err(e) = self.apply_s3_credentials() {
                    warn!("could not apply S3 credentials: {e}");
                }
            }
            Err(e) => warn!("httpfs extension unavailable, remote reads disabled: {e}"),
        }
        match self.conn.execute_batch("INSTALL spatial; LOAD spatial;") {
            Ok(()) => self.spatial_enabled = true,
            Err(e) => warn!("spatial extension unavailable, geospatial formats disabled: {e}"),
        }
    }

    fn apply_s3_credentials(&self) -> Result<()> {
        if let Some(region) = &self.s3_region {
            self.conn
                .execute_batch(&format!("SET s3_region={};", quote_literal(region)))?;
        }
        match (&self.s3_access_key_id, &self.s3_secret_access_key) {
            (Some(key), Some(secret)) => {
                self.conn.execute_batch(&format!(
                    "SET s3_access_key_id={}; SET s3_secret_access_key={};",
                    quote_literal(key),
                    quote_literal(secret)
                ))?;
                info!("loaded S3 credentials");
            }
            _ => {
                // No configured keys: fall back to the engine's own
                // credential chain, then anonymous access.
                if let Err(e) = self
                    .conn
                    .execute_batch("INSTALL aws; LOAD aws; CALL load_aws_credentials();")
                {
                    warn!("no S3 credentials found, using anonymous access: {e}");
                }
            }
        }
        Ok(())
    }

    /// Execute one or more SQL statements with no result.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(|e| eyre!("{e}"))
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote_enabled
    }

    pub fn spatial_enabled(&self) -> bool {
        self.spatial_enabled
    }

    /// Names of all user tables. Reserved (`__`-prefixed) bookkeeping tables
    /// are hidden unless `include_reserved` is set.
    pub fn table_list(&self, include_reserved: bool) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SHOW TABLES")?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            if include_reserved || !name.starts_with(RESERVED_TABLE_PREFIX) {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_list(true)?.iter().any(|t| t == name))
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
    }

    /// Drop every table, including reserved ones. Used when a project file
    /// replaces the current session.
    pub fn drop_all_tables(&self) -> Result<()> {
        for name in self.table_list(true)? {
            self.drop_table(&name)?;
        }
        Ok(())
    }

    pub fn table_row_count(&self, name: &str) -> Result<u64> {
        let sql = format!("SELECT count(*) FROM {}", quote_ident(name));
        let count: u64 = self.conn.prepare(&sql)?.query_row([], |row| row.get(0))?;
        Ok(count)
    }

    /// Ordered (column name, engine type) pairs for a table.
    pub fn describe_table(&self, name: &str) -> Result<TableDescription> {
        let sql = format!("DESCRIBE {}", quote_ident(name));
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let column: String = row.get(0)?;
            let dtype: String = row.get(1)?;
            columns.push((column, dtype));
        }
        Ok(TableDescription {
            name: name.to_string(),
            columns,
        })
    }

    /// Database files (without the `.db` extension) in the databases folder.
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.databases_folder.exists() {
            return Ok(names);
        }
        for entry in std::fs::read_dir(&self.databases_folder)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(stem) = file_name.strip_suffix(".db") {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create an empty named database file without switching to it.
    pub fn create_database(&self, name: &str) -> Result<()> {
        std::fs::create_dir_all(&self.databases_folder)?;
        let path = self
            .databases_folder
            .join(format!("{}.db", name.trim_end_matches(".db")));
        info!(path = %path.display(), "creating database");
        Connection::open(&path)?;
        Ok(())
    }

    /// Close the current connection and open another named database file,
    /// reloading extensions on the new connection.
    pub fn switch_database(&mut self, name: &str) -> Result<()> {
        let path = self
            .databases_folder
            .join(format!("{}.db", name.trim_end_matches(".db")));
        info!(path = %path.display(), "switching database");
        self.conn = Connection::open(&path)?;
        self.remote_enabled = false;
        self.spatial_enabled = false;
        self.load_extensions();
        Ok(())
    }
}
