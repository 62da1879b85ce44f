// LogScope - core/aggregate.rs
//
// Aggregates over a filtered view: time-bucketed series, top-N frequency
// tables, cross-tabulations, per-value counts, and scalar metrics.
// Empty cells count as missing values and are left out of every aggregate
// except the total row count.

use crate::core::filter::FilteredView;
use crate::core::table::{StructuredTable, EVENT_TEMPLATE};
use crate::util::constants;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Bucket width
// =============================================================================

/// Width of one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BucketWidth {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "15min")]
    FifteenMinutes,
    #[serde(rename = "30min")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "3h")]
    ThreeHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl BucketWidth {
    pub fn all() -> &'static [BucketWidth] {
        &[
            BucketWidth::OneMinute,
            BucketWidth::FiveMinutes,
            BucketWidth::FifteenMinutes,
            BucketWidth::ThirtyMinutes,
            BucketWidth::OneHour,
            BucketWidth::ThreeHours,
            BucketWidth::OneDay,
        ]
    }

    pub fn seconds(&self) -> i64 {
        match self {
            BucketWidth::OneMinute => 60,
            BucketWidth::FiveMinutes => 5 * 60,
            BucketWidth::FifteenMinutes => 15 * 60,
            BucketWidth::ThirtyMinutes => 30 * 60,
            BucketWidth::OneHour => 3_600,
            BucketWidth::ThreeHours => 3 * 3_600,
            BucketWidth::OneDay => 86_400,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BucketWidth::OneMinute => "1min",
            BucketWidth::FiveMinutes => "5min",
            BucketWidth::FifteenMinutes => "15min",
            BucketWidth::ThirtyMinutes => "30min",
            BucketWidth::OneHour => "1h",
            BucketWidth::ThreeHours => "3h",
            BucketWidth::OneDay => "1d",
        }
    }

    /// Pick a width from the covered span.
    pub fn infer(span: Duration) -> Self {
        let hours = span.num_seconds() as f64 / 3_600.0;
        if hours <= 1.0 {
            BucketWidth::OneMinute
        } else if hours <= 6.0 {
            BucketWidth::FiveMinutes
        } else if hours <= 24.0 {
            BucketWidth::FifteenMinutes
        } else if hours <= 72.0 {
            BucketWidth::ThirtyMinutes
        } else if hours <= 7.0 * 24.0 {
            BucketWidth::OneHour
        } else if hours <= 30.0 * 24.0 {
            BucketWidth::ThreeHours
        } else {
            BucketWidth::OneDay
        }
    }

    /// Start of the bucket containing `dt`.
    pub fn floor(&self, dt: NaiveDateTime) -> NaiveDateTime {
        let secs = dt.and_utc().timestamp();
        dt - Duration::seconds(secs.rem_euclid(self.seconds()))
            - Duration::nanoseconds(i64::from(dt.and_utc().timestamp_subsec_nanos()))
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BucketWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BucketWidth::all()
            .iter()
            .copied()
            .find(|w| w.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Result types
// =============================================================================

/// Occurrences of one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Occurrences of one observed (a, b) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairCount {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// Cross-tabulation of two columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub column_a: String,
    pub column_b: String,
    pub pairs: Vec<PairCount>,
}

/// Count for one (bucket, series) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub bucket: NaiveDateTime,
    /// Split value; `None` for an unsplit series.
    pub series: Option<String>,
    pub count: usize,
}

/// Time-bucketed counts, ordered by bucket then series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    pub width: BucketWidth,
    pub split_column: Option<String>,
    /// Series labels in display order.
    pub series: Vec<String>,
    pub points: Vec<SeriesPoint>,
    /// Rows left out for lacking a datetime.
    pub skipped_rows: usize,
}

/// Scalar metrics over a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total_rows: usize,
    /// Distinct `EventTemplate` values; `None` if the column is absent.
    pub unique_templates: Option<usize>,
    /// Distinct-value counts for each present key column.
    pub unique_counts: Vec<ValueCount>,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    /// `"{d}D, {hh}h, {mm}m"`, days omitted when zero.
    pub time_span: String,
    pub unparsed_datetimes: usize,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Per-value counts of `column`, most frequent first. Ties keep the order in
/// which values first appear in the whole table, filtered-out rows included.
/// `None` if the column is absent.
pub fn value_counts(
    table: &StructuredTable,
    view: &FilteredView,
    column: &str,
) -> Option<Vec<ValueCount>> {
    let col = table.column_index(column)?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &row in &view.indices {
        let value = table.cell(row, col);
        if !value.is_empty() {
            *counts.entry(value).or_default() += 1;
        }
    }

    let mut first_seen: HashMap<&str, usize> = HashMap::with_capacity(counts.len());
    for row in 0..table.len() {
        if first_seen.len() == counts.len() {
            break;
        }
        let value = table.cell(row, col);
        if counts.contains_key(value) {
            first_seen.entry(value).or_insert(row);
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|&(value, count)| {
        (
            std::cmp::Reverse(count),
            first_seen.get(value).copied().unwrap_or(usize::MAX),
        )
    });
    Some(
        ranked
            .into_iter()
            .map(|(value, count)| ValueCount {
                value: value.to_string(),
                count,
            })
            .collect(),
    )
}

/// The `n` most frequent values of `column`.
pub fn top_n(
    table: &StructuredTable,
    view: &FilteredView,
    column: &str,
    n: usize,
) -> Option<Vec<ValueCount>> {
    let mut counts = value_counts(table, view, column)?;
    counts.truncate(n);
    Some(counts)
}

/// Counts of each observed (a, b) pair in first-encountered order.
pub fn cross_tab(
    table: &StructuredTable,
    view: &FilteredView,
    column_a: &str,
    column_b: &str,
) -> Option<CrossTab> {
    let col_a = table.column_index(column_a)?;
    let col_b = table.column_index(column_b)?;
    let mut pairs: Vec<PairCount> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    for &row in &view.indices {
        let a = table.cell(row, col_a);
        let b = table.cell(row, col_b);
        if a.is_empty() || b.is_empty() {
            continue;
        }
        match index.get(&(a, b)) {
            Some(&i) => pairs[i].count += 1,
            None => {
                index.insert((a, b), pairs.len());
                pairs.push(PairCount {
                    a: a.to_string(),
                    b: b.to_string(),
                    count: 1,
                });
            }
        }
    }
    Some(CrossTab {
        column_a: column_a.to_string(),
        column_b: column_b.to_string(),
        pairs,
    })
}

/// Count rows per time bucket, optionally split by `split_column`.
///
/// Rows without a datetime are skipped. `width` of `None` infers one from
/// the span of the view. With `top_series`, split values outside the N most
/// frequent are merged into "Other". Returns `None` when the split column is
/// absent or no row carries a datetime.
pub fn time_buckets(
    table: &StructuredTable,
    view: &FilteredView,
    datetimes: &[Option<NaiveDateTime>],
    split_column: Option<&str>,
    width: Option<BucketWidth>,
    top_series: Option<usize>,
) -> Option<TimeSeries> {
    let split_col = match split_column {
        Some(name) => Some(table.column_index(name)?),
        None => None,
    };

    let timed: Vec<(usize, NaiveDateTime)> = view
        .indices
        .iter()
        .filter_map(|&row| datetimes.get(row).copied().flatten().map(|dt| (row, dt)))
        .collect();
    let skipped_rows = view.len() - timed.len();
    let first = timed.iter().map(|(_, dt)| *dt).min()?;
    let last = timed.iter().map(|(_, dt)| *dt).max()?;

    let width = width.unwrap_or_else(|| BucketWidth::infer(last - first));

    // Series labels: every split value, or the top N plus "Other".
    let keep: Option<Vec<String>> = match (split_column, top_series) {
        (Some(name), Some(n)) => top_n(table, view, name, n)
            .map(|top| top.into_iter().map(|vc| vc.value).collect()),
        _ => None,
    };
    let label_of = |row: usize| -> Option<String> {
        let col = split_col?;
        let value = table.cell(row, col);
        match &keep {
            Some(kept) if !kept.iter().any(|k| k == value) => {
                Some(constants::OTHER_SERIES_LABEL.to_string())
            }
            _ => Some(value.to_string()),
        }
    };

    let mut series: Vec<String> = Vec::new();
    let mut counts: HashMap<(NaiveDateTime, Option<String>), usize> = HashMap::new();
    for &(row, dt) in &timed {
        let label = label_of(row);
        if let Some(l) = &label {
            if !series.contains(l) {
                series.push(l.clone());
            }
        }
        *counts.entry((width.floor(dt), label)).or_default() += 1;
    }
    if let Some(pos) = series
        .iter()
        .position(|s| s == constants::OTHER_SERIES_LABEL)
    {
        let other = series.remove(pos);
        series.push(other);
    }

    let start = width.floor(first);
    let end = width.floor(last);
    let bucket_count = ((end - start).num_seconds() / width.seconds() + 1) as usize;
    let lanes: Vec<Option<String>> = if split_col.is_some() {
        series.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };

    let points = if bucket_count.saturating_mul(lanes.len()) <= constants::MAX_TIME_BUCKETS {
        // Dense: every bucket in range, zero-filled.
        let mut points = Vec::with_capacity(bucket_count * lanes.len());
        let mut bucket = start;
        while bucket <= end {
            for lane in &lanes {
                let count = counts
                    .get(&(bucket, lane.clone()))
                    .copied()
                    .unwrap_or(0);
                points.push(SeriesPoint {
                    bucket,
                    series: lane.clone(),
                    count,
                });
            }
            bucket += Duration::seconds(width.seconds());
        }
        points
    } else {
        tracing::warn!(
            buckets = bucket_count,
            width = width.label(),
            "Too many buckets for a dense series; emitting occupied buckets only"
        );
        let mut points: Vec<SeriesPoint> = counts
            .into_iter()
            .map(|((bucket, series), count)| SeriesPoint {
                bucket,
                series,
                count,
            })
            .collect();
        points.sort_by(|a, b| {
            a.bucket.cmp(&b.bucket).then_with(|| {
                let pos = |s: &Option<String>| {
                    s.as_ref()
                        .and_then(|s| series.iter().position(|x| x == s))
                };
                pos(&a.series).cmp(&pos(&b.series))
            })
        });
        points
    };

    Some(TimeSeries {
        width,
        split_column: split_column.map(str::to_string),
        series,
        points,
        skipped_rows,
    })
}

/// Scalar metrics for a view.
pub fn metrics(
    table: &StructuredTable,
    view: &FilteredView,
    datetimes: &[Option<NaiveDateTime>],
    key_columns: &[String],
) -> Metrics {
    let distinct = |col: usize| {
        let mut seen = std::collections::HashSet::new();
        for &row in &view.indices {
            let value = table.cell(row, col);
            if !value.is_empty() {
                seen.insert(value);
            }
        }
        seen.len()
    };

    let unique_templates = table.column_index(EVENT_TEMPLATE).map(distinct);
    let unique_counts = key_columns
        .iter()
        .filter_map(|name| {
            table.column_index(name).map(|col| ValueCount {
                value: name.clone(),
                count: distinct(col),
            })
        })
        .collect();

    let timed: Vec<NaiveDateTime> = view
        .indices
        .iter()
        .filter_map(|&row| datetimes.get(row).copied().flatten())
        .collect();
    let first = timed.iter().min().copied();
    let last = timed.iter().max().copied();
    let time_span = match (first, last) {
        (Some(a), Some(b)) => format_span(b - a),
        _ => constants::TIME_SPAN_UNAVAILABLE.to_string(),
    };

    Metrics {
        total_rows: view.len(),
        unique_templates,
        unique_counts,
        first,
        last,
        time_span,
        unparsed_datetimes: view.len() - timed.len(),
    }
}

/// Format a span as `"{d}D, {hh}h, {mm}m"`, omitting days when zero.
pub fn format_span(span: Duration) -> String {
    let total_minutes = span.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{days}D, {hours:02}h, {minutes:02}m")
    } else {
        format!("{hours:02}h, {minutes:02}m")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
    }

    fn sample() -> (StructuredTable, Vec<Option<NaiveDateTime>>) {
        let columns = ["Level", "Component", "EventTemplate"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = [
            ["Info", "CBS", "t1"],
            ["Error", "CSI", "t2"],
            ["Info", "CSI", "t1"],
            ["Error", "CBS", "t3"],
            ["Info", "", "t1"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        (
            StructuredTable::new(columns, rows),
            vec![at(10, 0), at(10, 0), at(10, 2), None, at(10, 3)],
        )
    }

    #[test]
    fn test_value_counts_sorted_with_stable_ties() {
        let (t, _) = sample();
        let view = FilteredView::all(&t);
        let counts = value_counts(&t, &view, "Component").unwrap();
        // CBS and CSI tie at 2; CBS appears first. Empty cell left out.
        assert_eq!(
            counts,
            vec![
                ValueCount { value: "CBS".into(), count: 2 },
                ValueCount { value: "CSI".into(), count: 2 },
            ]
        );
        assert!(value_counts(&t, &view, "PID").is_none());
    }

    #[test]
    fn test_value_count_ties_follow_whole_table_order() {
        let (t, _) = sample();
        // Row 0 (CBS) is filtered out; CSI is seen first in the view but CBS
        // still appears first in the table.
        let view = FilteredView {
            indices: vec![1, 3],
            warnings: Vec::new(),
        };
        let counts = value_counts(&t, &view, "Component").unwrap();
        assert_eq!(
            counts,
            vec![
                ValueCount { value: "CBS".into(), count: 1 },
                ValueCount { value: "CSI".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_top_n_truncates() {
        let (t, _) = sample();
        let view = FilteredView::all(&t);
        let top = top_n(&t, &view, "EventTemplate", 1).unwrap();
        assert_eq!(top, vec![ValueCount { value: "t1".into(), count: 3 }]);
    }

    #[test]
    fn test_cross_tab_first_encountered_order() {
        let (t, _) = sample();
        let view = FilteredView::all(&t);
        let tab = cross_tab(&t, &view, "Component", "Level").unwrap();
        let pairs: Vec<_> = tab
            .pairs
            .iter()
            .map(|p| (p.a.as_str(), p.b.as_str(), p.count))
            .collect();
        assert_eq!(
            pairs,
            vec![("CBS", "Info", 1), ("CSI", "Error", 1), ("CSI", "Info", 1), ("CBS", "Error", 1)]
        );
        assert!(cross_tab(&t, &view, "Component", "PID").is_none());
    }

    #[test]
    fn test_time_buckets_split_and_zero_filled() {
        let (t, dts) = sample();
        let view = FilteredView::all(&t);
        let ts = time_buckets(&t, &view, &dts, Some("Level"), None, None).unwrap();
        assert_eq!(ts.width, BucketWidth::OneMinute);
        assert_eq!(ts.series, vec!["Info", "Error"]);
        assert_eq!(ts.skipped_rows, 1);
        // 10:00..=10:03 is four buckets, two lanes each.
        assert_eq!(ts.points.len(), 8);
        let total: usize = ts.points.iter().map(|p| p.count).sum();
        assert_eq!(total, 4);
        let first_info = &ts.points[0];
        assert_eq!(first_info.series.as_deref(), Some("Info"));
        assert_eq!(first_info.count, 1);
    }

    #[test]
    fn test_time_buckets_collapse_to_other() {
        let (t, dts) = sample();
        let view = FilteredView::all(&t);
        let ts = time_buckets(
            &t,
            &view,
            &dts,
            Some("EventTemplate"),
            Some(BucketWidth::OneHour),
            Some(1),
        )
        .unwrap();
        assert_eq!(ts.series, vec!["t1", "Other"]);
        assert_eq!(ts.points.len(), 2);
        assert_eq!(ts.points[0].count, 3);
        assert_eq!(ts.points[1].count, 1);
    }

    #[test]
    fn test_time_buckets_without_datetimes() {
        let (t, _) = sample();
        let view = FilteredView::all(&t);
        let none = vec![None; t.len()];
        assert!(time_buckets(&t, &view, &none, None, None, None).is_none());
    }

    #[test]
    fn test_bucket_inference_thresholds() {
        assert_eq!(BucketWidth::infer(Duration::minutes(60)), BucketWidth::OneMinute);
        assert_eq!(BucketWidth::infer(Duration::hours(6)), BucketWidth::FiveMinutes);
        assert_eq!(BucketWidth::infer(Duration::hours(20)), BucketWidth::FifteenMinutes);
        assert_eq!(BucketWidth::infer(Duration::days(3)), BucketWidth::ThirtyMinutes);
        assert_eq!(BucketWidth::infer(Duration::days(7)), BucketWidth::OneHour);
        assert_eq!(BucketWidth::infer(Duration::days(30)), BucketWidth::ThreeHours);
        assert_eq!(BucketWidth::infer(Duration::days(31)), BucketWidth::OneDay);
    }

    #[test]
    fn test_bucket_floor() {
        let dt = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_milli_opt(10, 17, 42, 250)
            .unwrap();
        assert_eq!(BucketWidth::FifteenMinutes.floor(dt), at(10, 15).unwrap());
        assert_eq!(BucketWidth::ThreeHours.floor(dt), at(9, 0).unwrap());
    }

    #[test]
    fn test_bucket_width_parse() {
        assert_eq!("15MIN".parse::<BucketWidth>(), Ok(BucketWidth::FifteenMinutes));
        assert_eq!("1D".parse::<BucketWidth>(), Ok(BucketWidth::OneDay));
        assert!("2h".parse::<BucketWidth>().is_err());
    }

    #[test]
    fn test_metrics() {
        let (t, dts) = sample();
        let view = FilteredView::all(&t);
        let m = metrics(&t, &view, &dts, &["Component".to_string(), "PID".to_string()]);
        assert_eq!(m.total_rows, 5);
        assert_eq!(m.unique_templates, Some(3));
        assert_eq!(m.unique_counts, vec![ValueCount { value: "Component".into(), count: 2 }]);
        assert_eq!(m.unparsed_datetimes, 1);
        assert_eq!(m.time_span, "00h, 03m");
    }

    #[test]
    fn test_metrics_without_datetimes() {
        let (t, _) = sample();
        let view = FilteredView::all(&t);
        let m = metrics(&t, &view, &vec![None; t.len()], &[]);
        assert_eq!(m.time_span, constants::TIME_SPAN_UNAVAILABLE);
        assert_eq!(m.unparsed_datetimes, 5);
    }

    #[test]
    fn test_format_span() {
        assert_eq!(format_span(Duration::minutes(125)), "02h, 05m");
        assert_eq!(
            format_span(Duration::days(2) + Duration::hours(3) + Duration::minutes(4)),
            "2D, 03h, 04m"
        );
    }
}
