// LogScope - core/filter.rs
//
// Filter engine over a structured table.
// Categorical column filters and the date range are AND-combined.
// Core layer: pure logic, no I/O or UI dependencies.

use crate::core::table::StructuredTable;
use crate::util::constants;
use crate::util::error::FilterError;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Values a categorical filter lets through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedValues {
    /// Every observed value. Equivalent to not filtering the column.
    All,
    /// Exactly these values. An empty set lets nothing through.
    Only(BTreeSet<String>),
}

impl AllowedValues {
    /// Interpret a user pick: no choice, or a choice containing `ALL`,
    /// means every value.
    pub fn from_pick<I, S>(pick: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = pick.into_iter().map(Into::into).collect();
        if values.is_empty() || values.contains(constants::ALL_SENTINEL) {
            AllowedValues::All
        } else {
            AllowedValues::Only(values)
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            AllowedValues::All => true,
            AllowedValues::Only(set) => set.contains(value),
        }
    }
}

/// Complete filter state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    /// Categorical column -> allowed values.
    pub columns: BTreeMap<String, AllowedValues>,

    /// Inclusive calendar-date range on the derived datetime.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterSelection {
    /// Returns true if no filter would drop a row.
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self
                .columns
                .values()
                .all(|allowed| *allowed == AllowedValues::All)
    }

    /// Builder-style column filter.
    pub fn with_column(mut self, column: impl Into<String>, allowed: AllowedValues) -> Self {
        self.columns.insert(column.into(), allowed);
        self
    }

    /// Set the inclusive date range; rejects a start after the end.
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> Result<(), FilterError> {
        if start > end {
            return Err(FilterError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        self.date_range = Some((start, end));
        Ok(())
    }

    /// Parse a `Column=v1,v2` command-line filter and add it.
    pub fn add_spec(&mut self, spec: &str) -> Result<(), FilterError> {
        let (column, values) = spec
            .split_once('=')
            .filter(|(c, _)| !c.trim().is_empty())
            .ok_or_else(|| FilterError::InvalidSpec {
                spec: spec.to_string(),
            })?;
        let pick = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        self.columns
            .insert(column.trim().to_string(), AllowedValues::from_pick(pick));
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date bound.
pub fn parse_date(value: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| FilterError::InvalidDate {
        value: value.to_string(),
        source: e,
    })
}

/// Rows that passed a selection, as indices into the source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    pub indices: Vec<usize>,
    /// Referenced columns the table lacks; each was skipped.
    pub warnings: Vec<String>,
}

impl FilteredView {
    /// View of every row.
    pub fn all(table: &StructuredTable) -> Self {
        Self {
            indices: (0..table.len()).collect(),
            warnings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Result of applying a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Rows(FilteredView),
    /// No row survived. Aggregates are not computed.
    Empty { warnings: Vec<String> },
}

impl FilterOutcome {
    pub fn view(&self) -> Option<&FilteredView> {
        match self {
            FilterOutcome::Rows(view) => Some(view),
            FilterOutcome::Empty { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            FilterOutcome::Rows(view) => &view.warnings,
            FilterOutcome::Empty { warnings } => warnings,
        }
    }
}

/// Apply `selection` to every row of `table`.
///
/// `datetimes` holds the derived datetime per row (same length as the table).
pub fn apply(
    table: &StructuredTable,
    datetimes: &[Option<NaiveDateTime>],
    selection: &FilterSelection,
) -> FilterOutcome {
    refine(table, datetimes, 0..table.len(), selection)
}

/// Apply `selection` to the rows of an existing view only.
pub fn apply_to_view(
    table: &StructuredTable,
    datetimes: &[Option<NaiveDateTime>],
    view: &FilteredView,
    selection: &FilterSelection,
) -> FilterOutcome {
    refine(table, datetimes, view.indices.iter().copied(), selection)
}

fn refine(
    table: &StructuredTable,
    datetimes: &[Option<NaiveDateTime>],
    candidates: impl Iterator<Item = usize>,
    selection: &FilterSelection,
) -> FilterOutcome {
    let mut warnings = Vec::new();
    let mut active: Vec<(usize, &AllowedValues)> = Vec::new();

    for (column, allowed) in &selection.columns {
        match table.column_index(column) {
            None => {
                tracing::warn!(column = %column, "Filter column not present; skipped");
                warnings.push(format!("Column '{column}' is not present; filter skipped"));
            }
            Some(col) if *allowed != AllowedValues::All => active.push((col, allowed)),
            Some(_) => {}
        }
    }

    let indices: Vec<usize> = candidates
        .filter(|&row| {
            active
                .iter()
                .all(|(col, allowed)| allowed.allows(table.cell(row, *col)))
        })
        .filter(|&row| match (selection.date_range, datetimes.get(row).copied().flatten()) {
            (Some((start, end)), Some(dt)) => {
                let day = dt.date();
                day >= start && day <= end
            }
            _ => true,
        })
        .collect();

    tracing::debug!(
        matched = indices.len(),
        columns = selection.columns.len(),
        date_range = ?selection.date_range,
        "Filter applied"
    );

    if indices.is_empty() {
        FilterOutcome::Empty { warnings }
    } else {
        FilterOutcome::Rows(FilteredView { indices, warnings })
    }
}

/// Distinct non-empty values of `column` in first-encountered order.
/// Empty when the column is absent.
pub fn available_values(table: &StructuredTable, column: &str) -> Vec<String> {
    let Some(col) = table.column_index(column) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in 0..table.len() {
        let value = table.cell(row, col);
        if !value.is_empty() && seen.insert(value) {
            values.push(value.to_string());
        }
    }
    values
}

/// Observed calendar-date bounds of the derived datetimes.
pub fn date_bounds(datetimes: &[Option<NaiveDateTime>]) -> Option<(NaiveDate, NaiveDate)> {
    let mut days = datetimes.iter().flatten().map(|dt| dt.date());
    let first = days.next()?;
    Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (StructuredTable, Vec<Option<NaiveDateTime>>) {
        let columns = ["Level", "Component", "EventTemplate"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = [
            ["Info", "CBS", "a"],
            ["Error", "CSI", "b"],
            ["Info", "CSI", "a"],
            ["Warning", "CBS", "c"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        let day = |d: u32| {
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
        };
        (
            StructuredTable::new(columns, rows),
            vec![day(1), day(2), None, day(4)],
        )
    }

    fn rows(outcome: &FilterOutcome) -> Vec<usize> {
        outcome.view().map(|v| v.indices.clone()).unwrap_or_default()
    }

    fn only(values: &[&str]) -> AllowedValues {
        AllowedValues::Only(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_empty_selection_keeps_everything() {
        let (t, dts) = sample();
        let outcome = apply(&t, &dts, &FilterSelection::default());
        assert_eq!(rows(&outcome), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_from_pick_all_sentinel_and_empty() {
        assert_eq!(AllowedValues::from_pick(Vec::<String>::new()), AllowedValues::All);
        assert_eq!(AllowedValues::from_pick(["Info", "ALL"]), AllowedValues::All);
        assert_eq!(AllowedValues::from_pick(["Info"]), only(&["Info"]));
    }

    #[test]
    fn test_allows() {
        assert!(AllowedValues::All.allows("anything"));
        assert!(only(&["Info"]).allows("Info"));
        assert!(!only(&["Info"]).allows("Error"));
        assert!(!AllowedValues::Only(BTreeSet::new()).allows(""));
    }

    #[test]
    fn test_categorical_filters_are_and_combined() {
        let (t, dts) = sample();
        let sel = FilterSelection::default()
            .with_column("Level", only(&["Info", "Error"]))
            .with_column("Component", only(&["CSI"]));
        assert_eq!(rows(&apply(&t, &dts, &sel)), vec![1, 2]);
    }

    #[test]
    fn test_all_equivalent_to_omitting_column() {
        let (t, dts) = sample();
        let base = FilterSelection::default().with_column("Level", only(&["Info"]));
        let with_all = base.clone().with_column("Component", AllowedValues::All);
        let every_value = base.clone().with_column("Component", only(&["CBS", "CSI"]));
        let expected = rows(&apply(&t, &dts, &base));
        assert_eq!(rows(&apply(&t, &dts, &with_all)), expected);
        assert_eq!(rows(&apply(&t, &dts, &every_value)), expected);
    }

    #[test]
    fn test_explicit_empty_set_yields_empty() {
        let (t, dts) = sample();
        let sel = FilterSelection::default().with_column("Level", AllowedValues::Only(BTreeSet::new()));
        assert!(matches!(apply(&t, &dts, &sel), FilterOutcome::Empty { .. }));
    }

    #[test]
    fn test_date_range_inclusive_and_keeps_unparsed_rows() {
        let (t, dts) = sample();
        let mut sel = FilterSelection::default();
        sel.set_date_range(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        )
        .unwrap();
        assert_eq!(rows(&apply(&t, &dts, &sel)), vec![1, 2, 3]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut sel = FilterSelection::default();
        let result = sel.set_date_range(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(matches!(result, Err(FilterError::InvertedRange { .. })));
    }

    #[test]
    fn test_missing_column_skipped_with_warning() {
        let (t, dts) = sample();
        let sel = FilterSelection::default().with_column("PID", only(&["42"]));
        let outcome = apply(&t, &dts, &sel);
        assert_eq!(rows(&outcome), vec![0, 1, 2, 3]);
        assert_eq!(outcome.warnings().len(), 1);
        assert!(outcome.warnings()[0].contains("PID"));
    }

    #[test]
    fn test_refiltering_is_idempotent() {
        let (t, dts) = sample();
        let sel = FilterSelection::default().with_column("Component", only(&["CSI"]));
        let first = apply(&t, &dts, &sel);
        let view = first.view().unwrap();
        let again = apply_to_view(&t, &dts, view, &sel);
        assert_eq!(rows(&again), view.indices);

        let superset = FilterSelection::default().with_column("Component", only(&["CSI", "CBS"]));
        assert_eq!(rows(&apply_to_view(&t, &dts, view, &superset)), view.indices);
    }

    #[test]
    fn test_add_spec_parses_column_values() {
        let mut sel = FilterSelection::default();
        sel.add_spec("Level=Info, Error").unwrap();
        sel.add_spec("Component=ALL").unwrap();
        assert_eq!(sel.columns["Level"], only(&["Info", "Error"]));
        assert_eq!(sel.columns["Component"], AllowedValues::All);
        assert!(sel.add_spec("novalue").is_err());
        assert!(sel.add_spec("=x").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert!(matches!(parse_date("05/03/2024"), Err(FilterError::InvalidDate { .. })));
    }

    #[test]
    fn test_available_values_first_seen_order() {
        let (t, _) = sample();
        assert_eq!(available_values(&t, "Component"), vec!["CBS", "CSI"]);
        assert!(available_values(&t, "Nope").is_empty());
    }

    #[test]
    fn test_date_bounds() {
        let (_, dts) = sample();
        let (lo, hi) = date_bounds(&dts).unwrap();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(date_bounds(&[None]), None);
    }
}
