//! Dataset ingestion: resolve a path, directory, URL, or zip archive to
//! tabular files and materialize each as a named table through the engine's
//! ingestion functions.

use crate::assistant;
use crate::config::AppConfig;
use crate::db::{quote_ident, quote_literal, Database};
use crate::session::SessionState;
use crate::source::{self, InputSource};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Extensions the loader recognizes as data files, in archives and direct
/// references alike.
pub const DATA_FORMATS: [&str; 9] = [
    "csv", "tsv", "parquet", "gz", "json", "geojson", "gpkg", "kml", "shp",
];

/// Extensions picked up when batch-loading a directory.
const DIRECTORY_FORMATS: [&str; 3] = ["csv", "parquet", "json"];

/// Rows sampled for delimited-text type inference.
const CSV_SAMPLE_SIZE: u32 = 1_000_000;

/// Per-object size bound for JSON ingestion, to reject pathological inputs.
const JSON_MAX_OBJECT_SIZE: u32 = 60_000_000;

/// Load a source reference. Directories are batch-loaded (one table per
/// matching file, named after the file stem); everything else becomes a
/// single table under `table_name`. Returns the names of the tables created.
pub fn load_source(
    db: &Database,
    config: &AppConfig,
    session: &mut SessionState,
    table_name: &str,
    reference: &str,
) -> Result<Vec<String>> {
    let src = source::input_source(reference);
    if let InputSource::Local(path) = &src {
        if path.is_dir() {
            return load_directory(db, config, session, path);
        }
    }
    if load_table(db, config, session, table_name, reference)? {
        Ok(vec![table_name.to_string()])
    } else {
        Ok(Vec::new())
    }
}

/// Batch-load a directory: every entry with a `csv`, `parquet`, or `json`
/// extension becomes a table named after the file stem; other entries are
/// ignored. The first loaded table becomes the selected table if none is.
pub fn load_directory(
    db: &Database,
    config: &AppConfig,
    session: &mut SessionState,
    dir: &Path,
) -> Result<Vec<String>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut loaded = Vec::new();
    for path in entries {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let matches = ext
            .as_deref()
            .is_some_and(|e| DIRECTORY_FORMATS.contains(&e));
        if !matches {
            continue;
        }
        let name = source::reference_stem(&path.to_string_lossy());
        if load_table(db, config, session, &name, &path.to_string_lossy())? {
            if session.selected_table.is_none() {
                session.selected_table = Some(name.clone());
            }
            loaded.push(name);
        }
    }
    Ok(loaded)
}

/// Load a single source reference as `table_name`, replacing any existing
/// table of that name.
///
/// Returns `Ok(true)` when the table exists afterwards. A format-specific
/// ingestion failure is logged and reported as `Ok(false)` rather than an
/// error, as is an unrecognized extension; `Err` is reserved for
/// infrastructure failures (unreadable archive, broken working directory).
pub fn load_table(
    db: &Database,
    config: &AppConfig,
    session: &mut SessionState,
    table_name: &str,
    reference: &str,
) -> Result<bool> {
    let work_dir = &config.storage.download_folder;
    std::fs::create_dir_all(work_dir)?;

    info!(table = table_name, source = reference, "loading table");
    db.drop_table(table_name)?;

    let src = source::input_source(reference);
    let mut file_ref = src.as_engine_path();
    let mut extracted: Vec<PathBuf> = Vec::new();

    if let InputSource::Local(path) = &src {
        if source::has_suffix(reference, ".zip") {
            let (files, data_file) = extract_archive(path, work_dir)?;
            extracted = files;
            std::fs::remove_file(path)?;
            match data_file {
                Some(found) => {
                    info!(file = %found.display(), "archive data file");
                    file_ref = found.to_string_lossy().into_owned();
                }
                None => {
                    warn!(archive = reference, "no data file found in archive");
                    return Ok(false);
                }
            }
        }
    }

    // .pq.gz is gzip-wrapped parquet: decompress into the working directory
    // so the engine's columnar reader can take it.
    if source::has_suffix(&file_ref, ".pq.gz") {
        match source::input_source(&file_ref) {
            InputSource::Local(path) => {
                let inflated = gunzip_to_dir(&path, work_dir)?;
                extracted.push(inflated.clone());
                file_ref = inflated.to_string_lossy().into_owned();
            }
            _ => warn!(source = %file_ref, "cannot decompress a remote archive in place"),
        }
    }

    let Some(sql) = ingest_sql(table_name, &file_ref) else {
        warn!(source = %file_ref, "unrecognized extension, nothing loaded");
        return Ok(false);
    };

    if let Err(e) = db.execute(&sql) {
        error!(table = table_name, source = %file_ref, "error reading file: {e}");
        return Ok(false);
    }

    if !db.table_exists(table_name)? {
        error!(table = table_name, "table not loaded");
        return Ok(false);
    }

    if !source::input_source(&file_ref).is_remote() {
        remove_quietly(Path::new(&file_ref));
    }
    for file in &extracted {
        remove_quietly(file);
    }

    let description = db.describe_table(table_name)?;
    session.record_loaded_table(table_name, reference, assistant::table_sentence(&description));
    Ok(true)
}

/// The ingestion statement for a reference, dispatched on its extension
/// (case-insensitive). None when the extension is not a recognized format.
fn ingest_sql(table_name: &str, file_ref: &str) -> Option<String> {
    let table = quote_ident(table_name);
    let path = quote_literal(file_ref);
    let ext = source::reference_extension(file_ref)?;
    let select = match ext.as_str() {
        "csv" | "tsv" => format!(
            "read_csv_auto({path}, HEADER=TRUE, SAMPLE_SIZE={CSV_SAMPLE_SIZE})"
        ),
        "parquet" | "pq" => format!("read_parquet({path})"),
        "json" => format!("read_json_auto({path}, maximum_object_size={JSON_MAX_OBJECT_SIZE})"),
        "shp" | "geojson" | "gpkg" | "kml" => format!("ST_Read({path})"),
        _ => return None,
    };
    Some(format!("CREATE TABLE {table} AS (SELECT * FROM {select})"))
}

/// Extract every archive entry into `dest`, returning the extracted paths
/// and the first entry whose extension is a recognized data format.
fn extract_archive(archive: &Path, dest: &Path) -> Result<(Vec<PathBuf>, Option<PathBuf>)> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| eyre!("Could not open archive {}: {}", archive.display(), e))?;

    let mut extracted = Vec::new();
    let mut data_file = None;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            warn!(entry = entry.name(), "skipping archive entry with unsafe path");
            continue;
        };
        let out_path = dest.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        let is_data = out_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| DATA_FORMATS.contains(&e.to_lowercase().as_str()));
        if data_file.is_none() && is_data {
            data_file = Some(out_path.clone());
        }
        extracted.push(out_path);
    }
    Ok((extracted, data_file))
}

/// Decompress a gzipped file into `dest`, named after the file minus its
/// `.gz` suffix.
fn gunzip_to_dir(path: &Path, dest: &Path) -> Result<PathBuf> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| eyre!("No file name in {}", path.display()))?;
    let out_path = dest.join(name);
    let mut decoder = flate2::read::GzDecoder::new(File::open(path)?);
    let mut out = File::create(&out_path)?;
    std::io::copy(&mut decoder, &mut out)?;
    Ok(out_path)
}

/// Best-effort removal; ingestion already succeeded, so a leftover file is
/// only worth a log line.
fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), "could not remove file: {e}");
        }
    }
}
