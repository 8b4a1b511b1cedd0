//! lakestudio: load tabular and geospatial datasets into an embedded
//! analytical database, run SQL over them, and profile the results.
//!
//! The crate is organized around an explicit [`db::Database`] context:
//! [`loader`] materializes sources as tables through string-built ingestion
//! SQL, [`query`] executes caller SQL and returns row-oriented or columnar
//! results, [`profile`] derives per-column summaries and display strategies
//! from one result snapshot, and [`assistant`] composes schema-aware prompts
//! for a SQL-drafting language model. [`session`] carries the typed session
//! state and project-file persistence.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod db;
pub mod export;
pub mod loader;
pub mod profile;
pub mod query;
pub mod session;
pub mod source;

pub const APP_NAME: &str = "lakestudio";

pub use config::{AppConfig, ConfigManager};
pub use db::Database;
pub use profile::{profile_result, ResultProfile};
pub use query::QueryResult;
pub use session::SessionState;
