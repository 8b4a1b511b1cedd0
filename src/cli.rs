//! Command-line definitions.

use crate::export::ExportFormat;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for lakestudio
#[derive(Clone, Parser, Debug)]
#[command(
    name = "lakestudio",
    version,
    about = "Explore tabular and geospatial datasets with an embedded analytical database"
)]
pub struct Args {
    /// Sources to load: local files, directories, zip archives, http(s)
    /// URLs, or s3:// objects
    #[arg(value_name = "SOURCE", num_args = 1.., required_unless_present_any = ["generate_config", "project"])]
    pub sources: Vec<String>,

    /// Table name for a single-source load (defaults to the file stem)
    #[arg(long = "table", value_name = "NAME")]
    pub table: Option<String>,

    /// Open this named database from the databases folder instead of the
    /// configured default
    #[arg(long = "database", value_name = "NAME")]
    pub database: Option<String>,

    /// SQL query to run after loading
    #[arg(short = 'q', long = "query", value_name = "SQL")]
    pub query: Option<String>,

    /// Profile the query result column by column
    #[arg(long = "profile", action)]
    pub profile: bool,

    /// Export the query result to this path
    #[arg(long = "export", value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Export format (inferred from the export path extension when omitted)
    #[arg(long = "export-format", value_enum)]
    pub export_format: Option<ExportFormat>,

    /// Ask the assistant to draft SQL for a natural-language question. The
    /// suggestion is printed, never executed
    #[arg(long = "ask", value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Load a project file (.dls) before loading any sources
    #[arg(long = "project", value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// Save the session as a project file (.dls) before exiting
    #[arg(long = "save-project", value_name = "FILE")]
    pub save_project: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,
}
