//! Input source detection for local paths vs remote URLs (S3, HTTP/HTTPS).

use std::path::{Path, PathBuf};

/// Where a dataset reference points. Remote sources are read directly by the
/// storage engine (httpfs) and are never deleted after ingestion; local
/// sources are cleaned up once their contents live in a table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InputSource {
    Local(PathBuf),
    S3(String),
    Http(String),
}

impl InputSource {
    /// The string handed to the engine's ingestion functions.
    pub fn as_engine_path(&self) -> String {
        match self {
            InputSource::Local(p) => p.to_string_lossy().into_owned(),
            InputSource::S3(rest) => format!("s3://{rest}"),
            InputSource::Http(url) => url.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, InputSource::Local(_))
    }
}

/// Classifies a reference as local, S3, or HTTP/HTTPS using string parsing
/// only (no filesystem calls). Unknown schemes are treated as local paths.
pub fn input_source(reference: &str) -> InputSource {
    if let Some(at) = reference.find("://") {
        let scheme = reference[..at].to_lowercase();
        let rest = reference[at + 3..].to_string();
        if scheme == "s3" || scheme == "s3a" {
            return InputSource::S3(rest);
        }
        if scheme == "http" || scheme == "https" {
            return InputSource::Http(reference.to_string());
        }
    }
    InputSource::Local(PathBuf::from(reference))
}

/// Lower-cased extension of the last path segment of a reference, for URL and
/// local-path format inference alike. For HTTP the host part is stripped
/// first so `https://host.com/data.csv` yields `csv`, not `com`.
pub fn reference_extension(reference: &str) -> Option<String> {
    let path_part = if let Some(at) = reference.find("://") {
        let scheme = reference[..at].to_lowercase();
        let after = &reference[at + 3..];
        if scheme == "http" || scheme == "https" {
            after.find('/').map(|i| &after[i + 1..]).unwrap_or("")
        } else {
            after
        }
    } else {
        reference
    };
    let last_segment = path_part.rsplit('/').next().unwrap_or(path_part);
    Path::new(last_segment)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// True when the last path segment ends with the given multi-part suffix,
/// e.g. `.pq.gz` (which plain extension extraction reports as just `gz`).
pub fn has_suffix(reference: &str, suffix: &str) -> bool {
    let last_segment = reference.rsplit('/').next().unwrap_or(reference);
    last_segment.to_lowercase().ends_with(suffix)
}

/// File stem of the last segment, used to name tables after their files.
pub fn reference_stem(reference: &str) -> String {
    let last_segment = reference.rsplit('/').next().unwrap_or(reference);
    Path::new(last_segment)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(last_segment)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path() {
        assert!(matches!(
            input_source("/tmp/file.parquet"),
            InputSource::Local(_)
        ));
        assert!(matches!(input_source("relative.csv"), InputSource::Local(_)));
        assert!(matches!(input_source("."), InputSource::Local(_)));
    }

    #[test]
    fn s3_reference() {
        match input_source("s3://bucket/key.parquet") {
            InputSource::S3(rest) => assert_eq!(rest, "bucket/key.parquet"),
            other => panic!("expected S3, got {other:?}"),
        }
        match input_source("S3://my-bucket/path/to/file.csv") {
            InputSource::S3(rest) => assert_eq!(rest, "my-bucket/path/to/file.csv"),
            other => panic!("expected S3, got {other:?}"),
        }
    }

    #[test]
    fn http_reference() {
        match input_source("https://example.com/data.parquet") {
            InputSource::Http(u) => assert_eq!(u, "https://example.com/data.parquet"),
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn unknown_scheme_stays_local() {
        assert!(matches!(
            input_source("file:///tmp/foo.parquet"),
            InputSource::Local(_)
        ));
    }

    #[test]
    fn engine_path_round_trips() {
        assert_eq!(
            input_source("s3://bucket/key.csv").as_engine_path(),
            "s3://bucket/key.csv"
        );
        assert_eq!(
            input_source("https://x.com/d.csv").as_engine_path(),
            "https://x.com/d.csv"
        );
    }

    #[test]
    fn remote_flag() {
        assert!(input_source("s3://b/k.csv").is_remote());
        assert!(input_source("http://h/p.csv").is_remote());
        assert!(!input_source("/tmp/x.csv").is_remote());
    }

    #[test]
    fn extension_of_urls() {
        assert_eq!(
            reference_extension("s3://bucket/key.parquet").as_deref(),
            Some("parquet")
        );
        assert_eq!(
            reference_extension("https://example.com/dir/file.CSV").as_deref(),
            Some("csv")
        );
        assert_eq!(reference_extension("https://example.com/").as_deref(), None);
        assert_eq!(reference_extension("/tmp/data.json").as_deref(), Some("json"));
    }

    #[test]
    fn multi_part_suffix() {
        assert!(has_suffix("s3://b/part-0.pq.gz", ".pq.gz"));
        assert!(has_suffix("/tmp/PART.PQ.GZ", ".pq.gz"));
        assert!(!has_suffix("/tmp/part.parquet", ".pq.gz"));
    }

    #[test]
    fn stem_of_reference() {
        assert_eq!(reference_stem("/data/iris.csv"), "iris");
        assert_eq!(reference_stem("s3://bucket/a/flights.parquet"), "flights");
    }
}
