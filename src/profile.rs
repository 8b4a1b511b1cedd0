//! Column profiling: per-column summary statistics and an automatically
//! chosen display strategy, computed from one query-result snapshot.
//!
//! Pure classification + in-memory aggregation; the storage backend is never
//! touched. A profile is valid only for the snapshot it was computed from.

use crate::query::{Cell, ColumnKind, QueryResult};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::collections::{HashMap, HashSet};

/// Columns with this name prefix are derived grouping helpers and are
/// skipped when profiling.
pub const DERIVED_COLUMN_PREFIX: &str = "grp_";

/// Categorical columns with this many distinct values or more get a count
/// message instead of a proportion chart.
const CATEGORICAL_CHART_LIMIT: usize = 100;

/// Numeric columns below this distinct-value count chart as value bars;
/// at or above it they are binned.
const NUMERIC_BAR_LIMIT: usize = 500;

/// Equal-width bins spanning the 5th-95th percentile range.
const BIN_COUNT: usize = 100;

/// Profile of a whole query result.
#[derive(Clone, Debug)]
pub struct ResultProfile {
    pub total_rows: usize,
    pub spatial: SpatialCheck,
    pub columns: Vec<ColumnProfile>,
}

/// Whether the result rows can be placed on a point map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpatialCheck {
    PointMap { lat: String, lon: String },
    NoSpatialData,
}

impl SpatialCheck {
    /// Guidance shown when no spatial columns are present.
    pub const GUIDANCE: &'static str = "Spatial fields should be named 'lat' and 'lon' \
        (or 'latitude' and 'longitude') to be plotted on a map; use a SQL query to \
        rename them if needed, e.g. SELECT Latitude AS lat, Longitude AS lon";
}

#[derive(Clone, Debug)]
pub struct ColumnProfile {
    pub name: String,
    pub type_name: String,
    pub kind: ColumnKind,
    pub count: usize,
    pub null_count: usize,
    /// Distinct groups, counted the way GROUP BY would: nulls form one group.
    pub distinct_values: usize,
    pub numeric: Option<NumericSummary>,
    pub categorical: Option<CategoricalSummary>,
    pub display: DisplayStrategy,
}

/// Descriptive statistics of a numeric column (nulls excluded).
#[derive(Clone, Debug)]
pub struct NumericSummary {
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); 0.0 below two values.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
}

/// Descriptive statistics of a categorical or temporal column.
#[derive(Clone, Debug)]
pub struct CategoricalSummary {
    pub mode: Option<String>,
    pub mode_count: usize,
    /// Lexicographically smallest / largest non-null value.
    pub min: Option<String>,
    pub max: Option<String>,
}

/// How a column should be presented. Series labels use "NULL" for the null
/// group.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayStrategy {
    /// Value-to-count series for a proportion (pie) chart.
    Proportion(Vec<(String, usize)>),
    /// Too many distinct values to chart; only the count is reported.
    TooManyValues(usize),
    /// Statistics only; no chart for this column type.
    StatisticsOnly,
    /// Zero-variance numeric column: the constant value itself.
    Constant(String),
    /// Value-to-count series for a categorical bar chart.
    ValueCounts(Vec<(String, usize)>),
    /// Bin-label-to-count pairs, ordered by bin, for a trend line.
    BinnedTrend(Vec<(String, usize)>),
    /// Nothing to plot (e.g. a column of only nulls).
    NoPlot,
}

/// Profile every column of a result (derived `grp_` helpers excluded) and
/// run the whole-result spatial check.
///
/// Fails only on the binning precondition: duplicate bin labels are reported
/// as an error rather than silently mis-plotted.
pub fn profile_result(result: &QueryResult) -> Result<ResultProfile> {
    let mut columns = Vec::new();
    for (index, meta) in result.columns.iter().enumerate() {
        if meta.name.starts_with(DERIVED_COLUMN_PREFIX) {
            continue;
        }
        columns.push(profile_column(result, index)?);
    }
    Ok(ResultProfile {
        total_rows: result.height(),
        spatial: spatial_check(result),
        columns,
    })
}

/// Point-map detection: the result is plottable when `lat`+`lon` or
/// `latitude`+`longitude` (case-sensitive) are both present.
pub fn spatial_check(result: &QueryResult) -> SpatialCheck {
    for (lat, lon) in [("lat", "lon"), ("latitude", "longitude")] {
        if result.column_index(lat).is_some() && result.column_index(lon).is_some() {
            return SpatialCheck::PointMap {
                lat: lat.to_string(),
                lon: lon.to_string(),
            };
        }
    }
    SpatialCheck::NoSpatialData
}

fn profile_column(result: &QueryResult, index: usize) -> Result<ColumnProfile> {
    let meta = &result.columns[index];
    let count = result.height();
    let null_count = result.column_cells(index).filter(|c| c.is_null()).count();

    let groups = group_counts(result, index);
    let distinct_values = groups.len();

    let categorical = match meta.kind {
        ColumnKind::Text | ColumnKind::Boolean | ColumnKind::Temporal | ColumnKind::Other => {
            Some(categorical_summary(&groups))
        }
        _ => None,
    };

    let numeric = if meta.kind.is_numeric() {
        numeric_summary(result, index)
    } else {
        None
    };

    let display = match meta.kind {
        ColumnKind::Text | ColumnKind::Boolean => {
            if distinct_values < CATEGORICAL_CHART_LIMIT {
                DisplayStrategy::Proportion(ordered_by_count(groups))
            } else {
                DisplayStrategy::TooManyValues(distinct_values)
            }
        }
        ColumnKind::Temporal | ColumnKind::Other => DisplayStrategy::StatisticsOnly,
        ColumnKind::Integer | ColumnKind::Float => {
            numeric_display(result, index, meta.kind, distinct_values, &groups)?
        }
    };

    Ok(ColumnProfile {
        name: meta.name.clone(),
        type_name: meta.type_name.clone(),
        kind: meta.kind,
        count,
        null_count,
        distinct_values,
        numeric,
        categorical,
        display,
    })
}

fn numeric_display(
    result: &QueryResult,
    index: usize,
    kind: ColumnKind,
    distinct_values: usize,
    groups: &HashMap<Option<String>, usize>,
) -> Result<DisplayStrategy> {
    let values = numeric_values(result, index);
    if values.is_empty() {
        return Ok(DisplayStrategy::NoPlot);
    }
    let non_null_distinct: HashSet<String> = values.iter().map(|v| v.to_string()).collect();
    if non_null_distinct.len() == 1 {
        let constant = result
            .column_cells(index)
            .find(|c| !c.is_null())
            .map(|c| c.render())
            .unwrap_or_default();
        return Ok(DisplayStrategy::Constant(constant));
    }
    if distinct_values < NUMERIC_BAR_LIMIT {
        return Ok(DisplayStrategy::ValueCounts(ordered_by_count(
            groups.clone(),
        )));
    }
    let name = &result.columns[index].name;
    let bins = bin_values(&values, kind == ColumnKind::Integer)
        .map_err(|e| eyre!("Column '{name}': {e}"))?;
    Ok(DisplayStrategy::BinnedTrend(bins))
}

/// GROUP BY-equivalent counting: every rendered value is a group, and nulls
/// form one group of their own.
fn group_counts(result: &QueryResult, index: usize) -> HashMap<Option<String>, usize> {
    let mut groups: HashMap<Option<String>, usize> = HashMap::new();
    for cell in result.column_cells(index) {
        let key = match cell {
            Cell::Null => None,
            other => Some(other.render()),
        };
        *groups.entry(key).or_insert(0) += 1;
    }
    groups
}

/// Series ordered by count descending (ties by label) with the null group
/// labeled "NULL", as a grouped aggregation query would order it.
fn ordered_by_count(groups: HashMap<Option<String>, usize>) -> Vec<(String, usize)> {
    let mut series: Vec<(String, usize)> = groups
        .into_iter()
        .map(|(key, count)| (key.unwrap_or_else(|| "NULL".to_string()), count))
        .collect();
    series.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    series
}

fn categorical_summary(groups: &HashMap<Option<String>, usize>) -> CategoricalSummary {
    let mut mode: Option<String> = None;
    let mut mode_count = 0;
    let mut min: Option<String> = None;
    let mut max: Option<String> = None;
    for (key, count) in groups {
        let Some(value) = key else { continue };
        if *count > mode_count || (*count == mode_count && Some(value) < mode.as_ref()) {
            mode = Some(value.clone());
            mode_count = *count;
        }
        if min.as_ref().is_none_or(|m| value < m) {
            min = Some(value.clone());
        }
        if max.as_ref().is_none_or(|m| value > m) {
            max = Some(value.clone());
        }
    }
    CategoricalSummary {
        mode,
        mode_count,
        min,
        max,
    }
}

fn numeric_values(result: &QueryResult, index: usize) -> Vec<f64> {
    result
        .column_cells(index)
        .filter_map(|c| c.as_f64())
        .filter(|v| v.is_finite())
        .collect()
}

fn numeric_summary(result: &QueryResult, index: usize) -> Option<NumericSummary> {
    let values = numeric_values(result, index);
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        0.0
    } else {
        let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (sum_sq / (n - 1.0)).sqrt()
    };
    let mut sorted = values;
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(NumericSummary {
        mean,
        std,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        q25: percentile(&sorted, 25.0),
        median: percentile(&sorted, 50.0),
        q75: percentile(&sorted, 75.0),
    })
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Bucket values into equal-width bins spanning the 5th-95th percentile
/// range; values outside that range are clipped from the binning. Integral
/// columns get integer-aligned edges, others floating-point edges.
///
/// Returns bin-label to count pairs ordered by bin. Duplicate labels are a
/// precondition violation and produce an error instead of a chart.
fn bin_values(values: &[f64], integral: bool) -> Result<Vec<(String, usize)>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let p5 = percentile(&sorted, 5.0);
    let p95 = percentile(&sorted, 95.0);

    let (labels, assign): (Vec<String>, Box<dyn Fn(f64) -> usize>) = if integral {
        let lo = p5.floor() as i64;
        let step = ((((p95 - p5 + 1.0).floor()) as i64) / BIN_COUNT as i64).max(1);
        let mut edges = Vec::new();
        let mut edge = lo;
        while (edge as f64) < p95 + 2.0 {
            edges.push(edge);
            match edge.checked_add(step) {
                Some(next) => edge = next,
                None => break,
            }
        }
        let labels: Vec<String> = edges
            .windows(2)
            .map(|w| format!("{}-{}", w[0], w[0].saturating_add(step - 1)))
            .collect();
        let bins = labels.len();
        (
            labels,
            Box::new(move |v| {
                let idx = ((v - lo as f64) / step as f64).floor() as usize;
                idx.min(bins - 1)
            }),
        )
    } else {
        let width = (p95 - p5) / BIN_COUNT as f64;
        let labels: Vec<String> = (0..BIN_COUNT)
            .map(|i| {
                let start = p5 + i as f64 * width;
                format!("{:.4}-{:.4}", start, start + width)
            })
            .collect();
        (
            labels,
            Box::new(move |v| {
                if width > 0.0 {
                    (((v - p5) / width).floor() as usize).min(BIN_COUNT - 1)
                } else {
                    0
                }
            }),
        )
    };

    let mut seen = HashSet::new();
    if !labels.iter().all(|l| seen.insert(l.clone())) {
        return Err(eyre!("bin labels are not unique"));
    }

    let mut counts = vec![0usize; labels.len()];
    for &v in values {
        if v < p5 || v > p95 {
            continue;
        }
        counts[assign(v)] += 1;
    }
    Ok(labels.into_iter().zip(counts).collect())
}

impl ColumnProfile {
    /// One-line human summary of the chosen strategy, used by the CLI report.
    pub fn summary_line(&self) -> String {
        match &self.display {
            DisplayStrategy::Proportion(series) => {
                format!("{} Pie Chart ({} groups)", self.name, series.len())
            }
            DisplayStrategy::TooManyValues(n) => {
                format!("Too many values ({n}) in {} to plot a chart", self.name)
            }
            DisplayStrategy::StatisticsOnly => match self.kind {
                ColumnKind::Temporal => "Datetime column has no plots yet".to_string(),
                _ => format!("No chart for column {}", self.name),
            },
            DisplayStrategy::Constant(value) => {
                format!("Column {} has always the same value: {value}", self.name)
            }
            DisplayStrategy::ValueCounts(series) => {
                format!("{} Bar Chart ({} values)", self.name, series.len())
            }
            DisplayStrategy::BinnedTrend(bins) => {
                format!("{} Distribution ({} bins)", self.name, bins.len())
            }
            DisplayStrategy::NoPlot => format!("No data to plot in {}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Cell, ColumnMeta, QueryResult};
    use std::time::Duration;

    fn result_of(columns: Vec<(&str, &str, Vec<Cell>)>) -> QueryResult {
        let metas: Vec<ColumnMeta> = columns
            .iter()
            .map(|(name, type_name, _)| ColumnMeta {
                name: name.to_string(),
                type_name: type_name.to_string(),
                kind: crate::query::column_kind(type_name),
            })
            .collect();
        let height = columns.first().map(|(_, _, cells)| cells.len()).unwrap_or(0);
        let rows: Vec<Vec<Cell>> = (0..height)
            .map(|r| columns.iter().map(|(_, _, cells)| cells[r].clone()).collect())
            .collect();
        QueryResult {
            columns: metas,
            rows,
            elapsed: Duration::ZERO,
        }
    }

    fn int_cells(values: impl IntoIterator<Item = i64>) -> Vec<Cell> {
        values.into_iter().map(Cell::Int).collect()
    }

    #[test]
    fn categorical_below_limit_charts_a_proportion() {
        let cells: Vec<Cell> = (0..90)
            .map(|i| Cell::Text(format!("v{}", i % 3)))
            .collect();
        let result = result_of(vec![("c", "VARCHAR", cells)]);
        let profile = profile_result(&result).unwrap();
        match &profile.columns[0].display {
            DisplayStrategy::Proportion(series) => {
                assert_eq!(series.len(), 3);
                let total: usize = series.iter().map(|(_, n)| n).sum();
                assert_eq!(total, 90);
            }
            other => panic!("expected proportion, got {other:?}"),
        }
    }

    #[test]
    fn categorical_at_limit_reports_count_only() {
        let cells: Vec<Cell> = (0..100).map(|i| Cell::Text(format!("v{i}"))).collect();
        let result = result_of(vec![("c", "VARCHAR", cells)]);
        let profile = profile_result(&result).unwrap();
        assert_eq!(profile.columns[0].display, DisplayStrategy::TooManyValues(100));
    }

    #[test]
    fn null_group_counts_toward_the_total() {
        let mut cells: Vec<Cell> = (0..8).map(|_| Cell::Text("a".into())).collect();
        cells.push(Cell::Null);
        cells.push(Cell::Null);
        let result = result_of(vec![("c", "VARCHAR", cells)]);
        let profile = profile_result(&result).unwrap();
        assert_eq!(profile.columns[0].null_count, 2);
        assert_eq!(profile.columns[0].distinct_values, 2);
        match &profile.columns[0].display {
            DisplayStrategy::Proportion(series) => {
                let total: usize = series.iter().map(|(_, n)| n).sum();
                assert_eq!(total, 10);
                assert!(series.iter().any(|(label, n)| label == "NULL" && *n == 2));
            }
            other => panic!("expected proportion, got {other:?}"),
        }
    }

    #[test]
    fn zero_variance_numeric_reports_the_constant() {
        let result = result_of(vec![("n", "BIGINT", int_cells(std::iter::repeat(5).take(40)))]);
        let profile = profile_result(&result).unwrap();
        let column = &profile.columns[0];
        assert_eq!(column.display, DisplayStrategy::Constant("5".to_string()));
        assert_eq!(
            column.summary_line(),
            "Column n has always the same value: 5"
        );
    }

    #[test]
    fn low_cardinality_numeric_charts_value_bars() {
        let cells = int_cells((0..600).map(|i| i % 7));
        let result = result_of(vec![("n", "BIGINT", cells)]);
        let profile = profile_result(&result).unwrap();
        match &profile.columns[0].display {
            DisplayStrategy::ValueCounts(series) => assert_eq!(series.len(), 7),
            other => panic!("expected value counts, got {other:?}"),
        }
    }

    #[test]
    fn high_cardinality_integers_bin_into_100_unique_buckets() {
        // 1,000 integers uniformly distributed in [0, 1000)
        let cells = int_cells(0..1000);
        let result = result_of(vec![("n", "BIGINT", cells)]);
        let profile = profile_result(&result).unwrap();
        match &profile.columns[0].display {
            DisplayStrategy::BinnedTrend(bins) => {
                assert_eq!(bins.len(), 100);
                let labels: HashSet<&String> = bins.iter().map(|(l, _)| l).collect();
                assert_eq!(labels.len(), 100, "labels must be unique");
                // counts sum to the rows falling within [p5, p95]
                let p5 = 50.0;
                let p95 = 949.0;
                let in_range = (0..1000)
                    .filter(|&v| (v as f64) >= p5 && (v as f64) <= p95)
                    .count();
                let total: usize = bins.iter().map(|(_, n)| n).sum();
                assert_eq!(total, in_range);
            }
            other => panic!("expected binned trend, got {other:?}"),
        }
    }

    #[test]
    fn high_cardinality_floats_bin_with_float_labels() {
        let cells: Vec<Cell> = (0..1000).map(|i| Cell::Float(i as f64 / 3.0)).collect();
        let result = result_of(vec![("x", "DOUBLE", cells)]);
        let profile = profile_result(&result).unwrap();
        match &profile.columns[0].display {
            DisplayStrategy::BinnedTrend(bins) => {
                assert_eq!(bins.len(), 100);
                assert!(bins[0].0.contains('-'));
                assert!(bins[0].0.contains('.'));
            }
            other => panic!("expected binned trend, got {other:?}"),
        }
    }

    #[test]
    fn degenerate_float_range_is_a_reported_error() {
        // >=500 distinct values but the 5th-95th percentile range collapses
        // to a point: every bin label is identical, which must be reported.
        let mut cells: Vec<Cell> = std::iter::repeat(Cell::Float(1.0)).take(10_000).collect();
        for i in 0..250 {
            cells.push(Cell::Float(-1000.0 - i as f64));
            cells.push(Cell::Float(1000.0 + i as f64));
        }
        let result = result_of(vec![("x", "DOUBLE", cells)]);
        let err = profile_result(&result).unwrap_err();
        assert!(err.to_string().contains("not unique"));
    }

    #[test]
    fn temporal_columns_get_statistics_only() {
        let cells: Vec<Cell> = (1..30)
            .map(|d| Cell::Text(format!("2021-01-{d:02}")))
            .collect();
        let result = result_of(vec![("ts", "TIMESTAMP", cells)]);
        let profile = profile_result(&result).unwrap();
        let column = &profile.columns[0];
        assert_eq!(column.display, DisplayStrategy::StatisticsOnly);
        assert_eq!(column.summary_line(), "Datetime column has no plots yet");
        let stats = column.categorical.as_ref().unwrap();
        assert_eq!(stats.min.as_deref(), Some("2021-01-01"));
        assert_eq!(stats.max.as_deref(), Some("2021-01-29"));
    }

    #[test]
    fn derived_grouping_columns_are_skipped() {
        let result = result_of(vec![
            ("value", "BIGINT", int_cells(0..10)),
            ("grp_value", "VARCHAR", (0..10).map(|_| Cell::Text("b".into())).collect()),
        ]);
        let profile = profile_result(&result).unwrap();
        assert_eq!(profile.columns.len(), 1);
        assert_eq!(profile.columns[0].name, "value");
    }

    #[test]
    fn spatial_detection_is_case_sensitive() {
        let lat = vec![Cell::Float(40.4)];
        let lon = vec![Cell::Float(-3.7)];
        let result = result_of(vec![
            ("lat", "DOUBLE", lat.clone()),
            ("lon", "DOUBLE", lon.clone()),
        ]);
        assert_eq!(
            spatial_check(&result),
            SpatialCheck::PointMap {
                lat: "lat".to_string(),
                lon: "lon".to_string()
            }
        );
        let result = result_of(vec![
            ("LAT", "DOUBLE", lat.clone()),
            ("LON", "DOUBLE", lon.clone()),
        ]);
        assert_eq!(spatial_check(&result), SpatialCheck::NoSpatialData);
        let result = result_of(vec![
            ("latitude", "DOUBLE", lat),
            ("longitude", "DOUBLE", lon),
        ]);
        assert!(matches!(spatial_check(&result), SpatialCheck::PointMap { .. }));
    }

    #[test]
    fn numeric_summary_matches_hand_computed_values() {
        let result = result_of(vec![("n", "BIGINT", int_cells([1, 2, 3, 4, 100]))]);
        let profile = profile_result(&result).unwrap();
        let stats = profile.columns[0].numeric.as_ref().unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 100.0);
        assert!((stats.mean - 22.0).abs() < 1e-9);
        assert_eq!(stats.median, 3.0);
    }

    #[test]
    fn all_null_numeric_column_has_no_plot() {
        let cells = vec![Cell::Null, Cell::Null, Cell::Null];
        let result = result_of(vec![("n", "BIGINT", cells)]);
        let profile = profile_result(&result).unwrap();
        assert_eq!(profile.columns[0].display, DisplayStrategy::NoPlot);
        assert!(profile.columns[0].numeric.is_none());
    }
}
