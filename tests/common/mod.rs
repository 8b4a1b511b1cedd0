#![allow(dead_code)]

use lakestudio::{AppConfig, Database};
use std::path::Path;

/// Config pointing all working directories into a test-owned temp dir.
pub fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.download_folder = dir.join("downloads");
    config.storage.databases_folder = dir.join("databases");
    config
}

pub fn memory_db(dir: &Path) -> Database {
    Database::open_in_memory(&test_config(dir)).unwrap()
}

/// Write a small well-formed CSV fixture and return its path.
pub fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, rows.join("\n")).unwrap();
    path
}
