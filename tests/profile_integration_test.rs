use lakestudio::profile::{profile_result, DisplayStrategy, SpatialCheck};

mod common;
use common::memory_db;

#[test]
fn engine_results_profile_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db(dir.path());
    db.execute(
        "CREATE TABLE readings AS \
         SELECT range AS id, \
                (range % 4)::INTEGER AS sensor, \
                'site_' || (range % 3)::VARCHAR AS site, \
                (range % 2 = 0) AS healthy \
         FROM range(1000)",
    )
    .unwrap();

    let result = db.query("SELECT * FROM readings").unwrap();
    let profile = profile_result(&result).unwrap();
    assert_eq!(profile.total_rows, 1000);
    assert_eq!(profile.spatial, SpatialCheck::NoSpatialData);

    // id: 1000 distinct integers -> binned trend over [p5, p95]
    let id = &profile.columns[0];
    match &id.display {
        DisplayStrategy::BinnedTrend(bins) => {
            assert_eq!(bins.len(), 100);
            let labels: std::collections::HashSet<&String> =
                bins.iter().map(|(l, _)| l).collect();
            assert_eq!(labels.len(), bins.len());
        }
        other => panic!("expected binned trend for id, got {other:?}"),
    }

    // sensor: 4 distinct values -> bar series summing to the row count
    let sensor = &profile.columns[1];
    match &sensor.display {
        DisplayStrategy::ValueCounts(series) => {
            assert_eq!(series.len(), 4);
            assert_eq!(series.iter().map(|(_, n)| n).sum::<usize>(), 1000);
        }
        other => panic!("expected value counts for sensor, got {other:?}"),
    }

    // site: categorical below the chart limit -> proportion series
    let site = &profile.columns[2];
    match &site.display {
        DisplayStrategy::Proportion(series) => {
            assert_eq!(series.len(), 3);
            assert_eq!(series.iter().map(|(_, n)| n).sum::<usize>(), 1000);
        }
        other => panic!("expected proportion for site, got {other:?}"),
    }

    // healthy: boolean -> proportion with two groups
    let healthy = &profile.columns[3];
    match &healthy.display {
        DisplayStrategy::Proportion(series) => assert_eq!(series.len(), 2),
        other => panic!("expected proportion for healthy, got {other:?}"),
    }
}

#[test]
fn high_cardinality_text_reports_count_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db(dir.path());
    let result = db
        .query("SELECT 'user_' || range::VARCHAR AS name FROM range(250)")
        .unwrap();
    let profile = profile_result(&result).unwrap();
    assert_eq!(profile.columns[0].display, DisplayStrategy::TooManyValues(250));
}

#[test]
fn constant_column_through_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db(dir.path());
    let result = db.query("SELECT 5 AS n FROM range(40)").unwrap();
    let profile = profile_result(&result).unwrap();
    assert_eq!(
        profile.columns[0].display,
        DisplayStrategy::Constant("5".to_string())
    );
}

#[test]
fn aliased_spatial_columns_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db(dir.path());
    db.execute(
        "CREATE TABLE places AS SELECT range * 1.0 AS y, range * 2.0 AS x FROM range(10)",
    )
    .unwrap();

    let result = db.query("SELECT * FROM places").unwrap();
    assert_eq!(
        profile_result(&result).unwrap().spatial,
        SpatialCheck::NoSpatialData
    );

    let result = db
        .query("SELECT y AS lat, x AS lon FROM places")
        .unwrap();
    assert!(matches!(
        profile_result(&result).unwrap().spatial,
        SpatialCheck::PointMap { .. }
    ));
}

#[test]
fn derived_grouping_columns_are_not_profiled() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db(dir.path());
    let result = db
        .query("SELECT range AS v, 'bucket' AS grp_v FROM range(10)")
        .unwrap();
    let profile = profile_result(&result).unwrap();
    assert_eq!(profile.columns.len(), 1);
    assert_eq!(profile.columns[0].name, "v");
}

#[test]
fn temporal_column_statistics_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db(dir.path());
    let result = db
        .query("SELECT DATE '2024-01-01' + INTERVAL (range) DAY AS day FROM range(30)")
        .unwrap();
    let profile = profile_result(&result).unwrap();
    assert_eq!(profile.columns[0].display, DisplayStrategy::StatisticsOnly);
}
