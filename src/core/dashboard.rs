// LogScope - core/dashboard.rs
//
// Assembles a source kind's dashboard from its profile definition:
// filter choices, scalar metrics, per-value counts, the time series and
// heatmap, the top-N table, and cross-tabulations.

use crate::core::aggregate::{self, BucketWidth, CrossTab, Metrics, TimeSeries, ValueCount};
use crate::core::filter::{self, FilterOutcome, FilterSelection, FilteredView};
use crate::core::model::{SourceKind, SourceProfile};
use crate::core::table::StructuredTable;
use crate::util::constants;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Caller-tunable knobs for dashboard assembly.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    /// Fixed bucket width; `None` infers one from the span.
    pub bucket: Option<BucketWidth>,
    /// N for the top-N table.
    pub top_n: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            bucket: None,
            top_n: constants::DEFAULT_TOP_N,
        }
    }
}

/// Values offered by one filter widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChoices {
    pub column: String,
    pub values: Vec<String>,
}

/// Everything a dashboard shows for one filtered view.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub kind: SourceKind,
    pub filters: Vec<FilterChoices>,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub metrics: Metrics,
    pub value_counts: Option<(String, Vec<ValueCount>)>,
    pub series: Option<TimeSeries>,
    /// Per-value counts of the heatmap column over time.
    pub heatmap: Option<TimeSeries>,
    pub top: Option<(String, Vec<ValueCount>)>,
    pub crosstabs: Vec<CrossTab>,
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub view: FilteredView,
}

/// Result of assembling a dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardOutcome {
    Report(Box<DashboardReport>),
    /// No rows matched the selection; nothing was aggregated.
    Empty {
        filters: Vec<FilterChoices>,
        warnings: Vec<String>,
    },
}

/// Filter `table` by `selection` and aggregate the surviving rows as the
/// profile's dashboard definition describes.
///
/// Filter choices are drawn from the unfiltered table. Referenced columns
/// the table lacks are skipped and reported in `warnings`.
pub fn build_dashboard(
    table: &StructuredTable,
    datetimes: &[Option<NaiveDateTime>],
    profile: &SourceProfile,
    selection: &FilterSelection,
    options: &DashboardOptions,
) -> DashboardOutcome {
    let def = &profile.dashboard;

    let filters: Vec<FilterChoices> = def
        .filter_columns
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| FilterChoices {
            column: c.clone(),
            values: filter::available_values(table, c),
        })
        .collect();

    let view = match filter::apply(table, datetimes, selection) {
        FilterOutcome::Rows(view) => view,
        FilterOutcome::Empty { warnings } => {
            tracing::info!(kind = profile.kind.id(), "No rows match the current filters");
            return DashboardOutcome::Empty { filters, warnings };
        }
    };

    let mut warnings = view.warnings.clone();
    let mut missing = |column: &str| {
        let message = format!("Column '{column}' is not present; widget skipped");
        if !warnings.contains(&message) {
            warnings.push(message);
        }
    };

    for column in def.filter_columns.iter().chain(&def.metric_columns) {
        if !table.has_column(column) {
            missing(column.as_str());
        }
    }

    let metrics = aggregate::metrics(table, &view, datetimes, &def.metric_columns);

    let value_counts = def.count_column.as_ref().and_then(|column| {
        let counts = aggregate::value_counts(table, &view, column);
        if counts.is_none() {
            missing(column.as_str());
        }
        counts.map(|c| (column.clone(), c))
    });

    let series = match &def.series_column {
        Some(column) if !table.has_column(column) => {
            missing(column.as_str());
            None
        }
        column => aggregate::time_buckets(
            table,
            &view,
            datetimes,
            column.as_deref(),
            options.bucket,
            def.series_top_n,
        ),
    };

    let heatmap = def.heatmap_column.as_ref().and_then(|column| {
        if !table.has_column(column) {
            missing(column.as_str());
            return None;
        }
        aggregate::time_buckets(table, &view, datetimes, Some(column.as_str()), options.bucket, None)
    });

    let top = aggregate::top_n(table, &view, &def.top_column, options.top_n)
        .map(|counts| (def.top_column.clone(), counts));
    if top.is_none() {
        missing(def.top_column.as_str());
    }

    let mut crosstabs = Vec::with_capacity(def.crosstabs.len());
    for (a, b) in &def.crosstabs {
        match aggregate::cross_tab(table, &view, a, b) {
            Some(tab) => crosstabs.push(tab),
            None => {
                if !table.has_column(a) {
                    missing(a.as_str());
                }
                if !table.has_column(b) {
                    missing(b.as_str());
                }
            }
        }
    }

    tracing::debug!(
        kind = profile.kind.id(),
        rows = view.len(),
        crosstabs = crosstabs.len(),
        warnings = warnings.len(),
        "Dashboard assembled"
    );

    DashboardOutcome::Report(Box::new(DashboardReport {
        kind: profile.kind,
        filters,
        date_bounds: filter::date_bounds(datetimes),
        metrics,
        value_counts,
        series,
        heatmap,
        top,
        crosstabs,
        warnings,
        view,
    }))
}

// =============================================================================
// Tests
// =============================================================================
