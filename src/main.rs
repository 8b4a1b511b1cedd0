use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use lakestudio::assistant::{self, HttpSuggester, SqlSuggester};
use lakestudio::cli::Args;
use lakestudio::export::{self, ExportFormat};
use lakestudio::profile::{self, DisplayStrategy, ResultProfile, SpatialCheck};
use lakestudio::query::QueryResult;
use lakestudio::{loader, session, source, ConfigManager, Database, SessionState, APP_NAME};
use tracing::warn;

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let started = std::time::Instant::now();
    let manager = ConfigManager::new(APP_NAME)?;
    if args.generate_config {
        let path = manager.generate_default_config()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }
    let config = manager.load()?;

    let db = match &args.database {
        Some(name) => Database::open_named(&config, name)?,
        None => Database::open_default(&config)?,
    };
    let mut session = SessionState::new();

    if let Some(project) = &args.project {
        session::load_project(&db, &config, project, &mut session)?;
        println!("Project loaded from {}", project.display());
    }

    for reference in &args.sources {
        let name = args
            .table
            .clone()
            .unwrap_or_else(|| source::reference_stem(reference));
        let loaded = loader::load_source(&db, &config, &mut session, &name, reference)?;
        if loaded.is_empty() {
            println!("Not loaded: {reference}");
        }
        for table in loaded {
            println!("Loaded table {table}");
        }
    }

    let tables = db.table_list(false)?;
    if !tables.is_empty() {
        println!("Tables: {}", tables.join(", "));
    }

    if let Some(question) = &args.ask {
        // Describe every user table live, not just the ones loaded this run.
        let mut sentences = Vec::new();
        for table in &tables {
            match session.schema_descriptions.get(table) {
                Some(sentence) => sentences.push(sentence.clone()),
                None => {
                    if let Ok(description) = db.describe_table(table) {
                        sentences.push(assistant::table_sentence(&description));
                    }
                }
            }
        }
        let suggester = HttpSuggester::new(config.assistant.clone());
        match suggester.suggest(question, &sentences) {
            Ok(sql) => {
                println!("Suggested query:\n{sql}");
                session.assistant_response = Some(sql);
            }
            Err(e) => warn!("no suggestion available: {e}"),
        }
    }

    if let Some(sql) = &args.query {
        session.last_query = sql.clone();
        let result = db.query(sql)?;
        session.last_query_ms = result.elapsed.as_millis() as u64;
        print_result(&result);
        println!("Query execution time: {} ms", session.last_query_ms);

        if args.profile {
            let profile = profile::profile_result(&result)?;
            print_profile(&profile);
        }
        if let Some(path) = &args.export {
            let format = args
                .export_format
                .or_else(|| ExportFormat::from_path(path))
                .ok_or_else(|| {
                    eyre!("Cannot infer export format from {}; pass --export-format", path.display())
                })?;
            export::export_query(&db, sql, path, format)?;
            println!("Exported to {}", path.display());
        }
    }

    session.total_ms = started.elapsed().as_millis() as u64;
    if args.query.is_some() {
        println!("Total execution time: {} ms", session.total_ms);
    }

    if let Some(path) = &args.save_project {
        session::save_project(path, &session)?;
        println!("Project saved to {}", path.display());
    }
    Ok(())
}

const PREVIEW_ROWS: usize = 20;
const PREVIEW_CELL_WIDTH: usize = 28;

fn print_result(result: &QueryResult) {
    if result.width() == 0 {
        return;
    }
    let header: Vec<String> = result
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.type_name))
        .collect();
    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            result
                .rows
                .iter()
                .take(PREVIEW_ROWS)
                .map(|row| row[i].render().len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
                .min(PREVIEW_CELL_WIDTH)
        })
        .collect();

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| {
                let mut text: String = cell.chars().take(w).collect();
                if text.chars().count() < cell.chars().count() {
                    text.pop();
                    text.push('…');
                }
                format!("{text:<w$}")
            })
            .collect();
        padded.join("  ")
    };

    println!("{}", line(header));
    for row in result.rows.iter().take(PREVIEW_ROWS) {
        println!("{}", line(row.iter().map(|c| c.render()).collect()));
    }
    if result.height() > PREVIEW_ROWS {
        println!("… {} rows total", result.height());
    }
}

fn print_profile(profile: &ResultProfile) {
    println!("\nRecords: {}", profile.total_rows);
    match &profile.spatial {
        SpatialCheck::PointMap { lat, lon } => {
            println!("Detected spatial data ({lat}/{lon})");
        }
        SpatialCheck::NoSpatialData => {
            println!("No spatial data detected. {}", SpatialCheck::GUIDANCE);
        }
    }
    for column in &profile.columns {
        println!("\n#### {} ({})", column.name, column.type_name);
        println!(
            "count: {}  nulls: {}  distinct: {}",
            column.count, column.null_count, column.distinct_values
        );
        if let Some(stats) = &column.numeric {
            println!(
                "min: {}  q25: {}  median: {}  q75: {}  max: {}  mean: {:.4}  std: {:.4}",
                stats.min, stats.q25, stats.median, stats.q75, stats.max, stats.mean, stats.std
            );
        }
        if let Some(stats) = &column.categorical {
            if let Some(mode) = &stats.mode {
                println!("top: {mode} ({} rows)", stats.mode_count);
            }
            if let (Some(min), Some(max)) = (&stats.min, &stats.max) {
                println!("min: {min}  max: {max}");
            }
        }
        println!("{}", column.summary_line());
        match &column.display {
            DisplayStrategy::Proportion(series) | DisplayStrategy::ValueCounts(series) => {
                for (value, count) in series.iter().take(10) {
                    println!("  {value}: {count}");
                }
                if series.len() > 10 {
                    println!("  … {} more", series.len() - 10);
                }
            }
            DisplayStrategy::BinnedTrend(bins) => {
                let peak = bins.iter().map(|(_, n)| *n).max().unwrap_or(0);
                for (label, count) in bins {
                    if *count == peak && peak > 0 {
                        println!("  peak bin {label}: {count}");
                    }
                }
            }
            _ => {}
        }
    }
}
