//! Session state and project-file persistence.
//!
//! The session is an explicit struct with named, typed fields (not a
//! loosely-typed key-value bag): everything one interactive session tracks
//! about loaded tables, queries, and the assistant.

use crate::config::AppConfig;
use crate::db::Database;
use crate::loader;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Per-session state. Lifecycle is one interactive session, or an explicit
/// project save/load.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    /// The reference typed into the load box (path, URL, or search text).
    pub source_input: String,
    /// Candidate object paths produced by an external search, awaiting pick.
    pub candidates: Vec<String>,
    /// First table loaded from a directory batch, used as the implicit
    /// target for table-scoped actions.
    pub selected_table: Option<String>,
    /// Last query text, re-shown on next use.
    pub last_query: String,
    pub last_query_ms: u64,
    pub total_ms: u64,
    /// Saved queries, deduplicated, insertion order preserved.
    pub queries: Vec<String>,
    /// Table name to source reference, for project save and reload.
    pub loaded_tables: BTreeMap<String, String>,
    /// Table name to schema sentence, composed at load time for the
    /// assistant bridge.
    pub schema_descriptions: BTreeMap<String, String>,
    pub assistant_response: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully loaded table: its source for project
    /// persistence and its schema sentence for the assistant.
    pub fn record_loaded_table(&mut self, name: &str, source: &str, schema_sentence: String) {
        self.loaded_tables
            .insert(name.to_string(), source.to_string());
        self.schema_descriptions
            .insert(name.to_string(), schema_sentence);
    }

    pub fn forget_table(&mut self, name: &str) {
        self.loaded_tables.remove(name);
        self.schema_descriptions.remove(name);
        if self.selected_table.as_deref() == Some(name) {
            self.selected_table = None;
        }
    }

    /// Save a query for later, keeping the list free of duplicates.
    pub fn save_query(&mut self, query: &str) {
        if !self.queries.iter().any(|q| q == query) {
            self.queries.push(query.to_string());
        }
    }
}

/// On-disk project document (`.dls`): the loaded-table mapping, the saved
/// query list, and the last query text.
#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    #[serde(rename = "loadedTables")]
    loaded_tables: BTreeMap<String, String>,
    #[serde(default)]
    queries: Vec<String>,
    #[serde(rename = "lastQuery", default)]
    last_query: String,
}

/// Serialize the current session to a project file.
pub fn save_project(path: &Path, session: &SessionState) -> Result<()> {
    let project = ProjectFile {
        loaded_tables: session.loaded_tables.clone(),
        queries: session.queries.clone(),
        last_query: session.last_query.clone(),
    };
    let text = serde_json::to_string_pretty(&project)?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), "project saved");
    Ok(())
}

/// Load a project file: drop every current table, re-ingest each listed
/// table from its recorded source, and replace the session's query state.
pub fn load_project(
    db: &Database,
    config: &AppConfig,
    path: &Path,
    session: &mut SessionState,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre!("Could not read project file {}: {}", path.display(), e))?;
    let project: ProjectFile = serde_json::from_str(&text)
        .map_err(|e| eyre!("Invalid project file {}: {}", path.display(), e))?;

    db.drop_all_tables()?;
    session.loaded_tables.clear();
    session.schema_descriptions.clear();
    session.selected_table = None;

    for (name, reference) in &project.loaded_tables {
        loader::load_table(db, config, session, name, reference)?;
    }

    session.queries = dedup_preserving_order(project.queries);
    if !project.last_query.is_empty() {
        session.last_query = project.last_query;
    }
    info!(path = %path.display(), "project loaded");
    Ok(())
}

fn dedup_preserving_order(queries: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    queries
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .collect()
}
