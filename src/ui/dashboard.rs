// LogScope - ui/dashboard.rs
//
// Plain-text rendering of a dashboard outcome and of the run that produced
// it. Presentation only: everything shown here was computed by the core
// layer.

use crate::app::session::SessionResults;
use crate::core::aggregate::{CrossTab, Metrics, TimeSeries, ValueCount};
use crate::core::dashboard::{DashboardOutcome, DashboardReport, FilterChoices};
use crate::core::table::TemplateSummary;
use std::io::{self, Write};

/// Buckets listed before the series table is elided.
const MAX_RENDERED_BUCKETS: usize = 48;

/// Pairs listed per cross-tab before the rest is summarised.
const MAX_RENDERED_PAIRS: usize = 25;

/// Templates listed before the rest is summarised.
const MAX_RENDERED_TEMPLATES: usize = 25;

/// Header describing the run: kind, algorithm, parameters, table sizes.
pub fn render_run<W: Write>(out: &mut W, results: &SessionResults) -> io::Result<()> {
    writeln!(
        out,
        "{} logs parsed with {}",
        results.kind.label(),
        results.algorithm.label()
    )?;
    if !results.parameters.is_empty() {
        let params: Vec<String> = results
            .parameters
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect();
        writeln!(out, "Parameters: {}", params.join(", "))?;
    }
    writeln!(
        out,
        "Structured rows: {}   Templates: {} ({} occurrences)",
        results.structured.len(),
        results.templates.len(),
        results.templates.total_occurrences()
    )?;
    writeln!(out)
}

/// Template summary, most frequent first. Unaffected by dashboard filters.
pub fn render_templates<W: Write>(out: &mut W, templates: &TemplateSummary) -> io::Result<()> {
    if templates.is_empty() {
        return Ok(());
    }
    section(out, "Log templates")?;
    let ranked = templates.ranked();
    let count_width = ranked
        .first()
        .map_or(1, |r| r.occurrences.to_string().len());
    let id_width = ranked
        .iter()
        .take(MAX_RENDERED_TEMPLATES)
        .map(|r| r.event_id.len())
        .max()
        .unwrap_or(0);
    for row in ranked.iter().take(MAX_RENDERED_TEMPLATES) {
        writeln!(
            out,
            "  {:>count_width$}  {:<id_width$}  {}",
            row.occurrences, row.event_id, row.template
        )?;
    }
    if ranked.len() > MAX_RENDERED_TEMPLATES {
        writeln!(
            out,
            "  ... {} more templates (use --export-templates for all)",
            ranked.len() - MAX_RENDERED_TEMPLATES
        )?;
    }
    Ok(())
}

/// Render either the full report or the empty-result notice.
pub fn render_outcome<W: Write>(out: &mut W, outcome: &DashboardOutcome) -> io::Result<()> {
    match outcome {
        DashboardOutcome::Report(report) => render_report(out, report),
        DashboardOutcome::Empty { filters, warnings } => {
            render_warnings(out, warnings)?;
            writeln!(out, "No rows match the current filters.")?;
            render_filters(out, filters)
        }
    }
}

fn render_report<W: Write>(out: &mut W, report: &DashboardReport) -> io::Result<()> {
    render_warnings(out, &report.warnings)?;
    render_metrics(out, &report.metrics)?;

    if let Some((column, counts)) = &report.value_counts {
        section(out, &format!("Rows per {column}"))?;
        render_counts(out, counts)?;
    }

    if let Some(series) = &report.series {
        render_series(out, series, "Rows")?;
    }

    if let Some(heatmap) = &report.heatmap {
        render_series(out, heatmap, "Heatmap: rows")?;
    }

    if let Some((column, counts)) = &report.top {
        section(out, &format!("Top {} {column}", counts.len()))?;
        render_counts(out, counts)?;
    }

    for tab in &report.crosstabs {
        render_crosstab(out, tab)?;
    }

    render_filters(out, &report.filters)?;
    if let Some((start, end)) = report.date_bounds {
        writeln!(out, "  date range: {start} .. {end}")?;
    }
    Ok(())
}

fn section<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

fn render_warnings<W: Write>(out: &mut W, warnings: &[String]) -> io::Result<()> {
    for w in warnings {
        writeln!(out, "warning: {w}")?;
    }
    Ok(())
}

fn render_metrics<W: Write>(out: &mut W, metrics: &Metrics) -> io::Result<()> {
    section(out, "Summary")?;
    writeln!(out, "  Total rows:        {}", metrics.total_rows)?;
    if let Some(unique) = metrics.unique_templates {
        writeln!(out, "  Unique templates:  {unique}")?;
    }
    for uc in &metrics.unique_counts {
        writeln!(out, "  Unique {:<11} {}", format!("{}:", uc.value), uc.count)?;
    }
    writeln!(out, "  Time span:         {}", metrics.time_span)?;
    if let (Some(first), Some(last)) = (metrics.first, metrics.last) {
        writeln!(out, "  First / last:      {first} / {last}")?;
    }
    if metrics.unparsed_datetimes > 0 {
        writeln!(out, "  No timestamp:      {}", metrics.unparsed_datetimes)?;
    }
    Ok(())
}

fn render_counts<W: Write>(out: &mut W, counts: &[ValueCount]) -> io::Result<()> {
    let width = counts.iter().map(|c| c.count.to_string().len()).max().unwrap_or(1);
    for c in counts {
        writeln!(out, "  {:>width$}  {}", c.count, c.value)?;
    }
    Ok(())
}

fn render_series<W: Write>(out: &mut W, series: &TimeSeries, heading: &str) -> io::Result<()> {
    let title = match &series.split_column {
        Some(column) => format!("{heading} per {} by {column}", series.width),
        None => format!("{heading} per {}", series.width),
    };
    section(out, &title)?;

    // Points are ordered by bucket then series; fold each bucket to one line.
    let mut lines: Vec<(String, Vec<String>, usize)> = Vec::new();
    for point in &series.points {
        let bucket = point.bucket.format("%Y-%m-%d %H:%M").to_string();
        if lines.last().map(|(b, _, _)| b != &bucket).unwrap_or(true) {
            lines.push((bucket, Vec::new(), 0));
        }
        if let Some((_, cells, total)) = lines.last_mut() {
            *total += point.count;
            if let (Some(name), true) = (&point.series, point.count > 0) {
                cells.push(format!("{name}={}", point.count));
            }
        }
    }
    lines.retain(|(_, _, total)| *total > 0);

    for (bucket, cells, total) in lines.iter().take(MAX_RENDERED_BUCKETS) {
        if cells.is_empty() {
            writeln!(out, "  {bucket}  {total}")?;
        } else {
            writeln!(out, "  {bucket}  {total}  ({})", cells.join(", "))?;
        }
    }
    if lines.len() > MAX_RENDERED_BUCKETS {
        writeln!(
            out,
            "  ... {} more non-empty buckets (use --json for all)",
            lines.len() - MAX_RENDERED_BUCKETS
        )?;
    }
    if series.skipped_rows > 0 {
        writeln!(out, "  ({} rows without a timestamp not shown)", series.skipped_rows)?;
    }
    Ok(())
}

fn render_crosstab<W: Write>(out: &mut W, tab: &CrossTab) -> io::Result<()> {
    section(out, &format!("{} x {}", tab.column_a, tab.column_b))?;
    let width = tab
        .pairs
        .iter()
        .map(|p| p.count.to_string().len())
        .max()
        .unwrap_or(1);
    for pair in tab.pairs.iter().take(MAX_RENDERED_PAIRS) {
        writeln!(out, "  {:>width$}  {} | {}", pair.count, pair.a, pair.b)?;
    }
    if tab.pairs.len() > MAX_RENDERED_PAIRS {
        writeln!(out, "  ... {} more pairs", tab.pairs.len() - MAX_RENDERED_PAIRS)?;
    }
    Ok(())
}

fn render_filters<W: Write>(out: &mut W, filters: &[FilterChoices]) -> io::Result<()> {
    if filters.is_empty() {
        return Ok(());
    }
    section(out, "Available filters")?;
    for f in filters {
        writeln!(out, "  {} ({} values): {}", f.column, f.values.len(), preview_values(&f.values))?;
    }
    Ok(())
}

fn preview_values(values: &[String]) -> String {
    const SHOWN: usize = 8;
    let mut shown = values.iter().take(SHOWN).cloned().collect::<Vec<_>>().join(", ");
    if values.len() > SHOWN {
        shown.push_str(", ...");
    }
    shown
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::{BucketWidth, PairCount, SeriesPoint};
    use crate::core::filter::FilteredView;
    use crate::core::model::SourceKind;
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn report() -> DashboardReport {
        DashboardReport {
            kind: SourceKind::Linux,
            filters: vec![FilterChoices {
                column: "Level".into(),
                values: vec!["combo".into()],
            }],
            date_bounds: None,
            metrics: Metrics {
                total_rows: 3,
                unique_templates: Some(2),
                unique_counts: vec![ValueCount {
                    value: "PID".into(),
                    count: 2,
                }],
                first: None,
                last: None,
                time_span: "N/A".into(),
                unparsed_datetimes: 0,
            },
            value_counts: None,
            heatmap: Some(TimeSeries {
                width: BucketWidth::OneMinute,
                split_column: Some("Component".into()),
                series: vec!["su".into()],
                points: vec![SeriesPoint {
                    bucket: dt("2024-06-14 15:16:00"),
                    series: Some("su".into()),
                    count: 1,
                }],
                skipped_rows: 0,
            }),
            series: Some(TimeSeries {
                width: BucketWidth::OneMinute,
                split_column: Some("Level".into()),
                series: vec!["combo".into()],
                points: vec![
                    SeriesPoint {
                        bucket: dt("2024-06-14 15:16:00"),
                        series: Some("combo".into()),
                        count: 2,
                    },
                    SeriesPoint {
                        bucket: dt("2024-06-14 15:17:00"),
                        series: Some("combo".into()),
                        count: 0,
                    },
                ],
                skipped_rows: 1,
            }),
            top: Some((
                "EventTemplate".into(),
                vec![ValueCount {
                    value: "auth <*>".into(),
                    count: 2,
                }],
            )),
            crosstabs: vec![CrossTab {
                column_a: "Level".into(),
                column_b: "Component".into(),
                pairs: vec![PairCount {
                    a: "combo".into(),
                    b: "su".into(),
                    count: 1,
                }],
            }],
            warnings: vec!["Column 'User' is not present; widget skipped".into()],
            view: FilteredView::default(),
        }
    }

    #[test]
    fn test_report_text_contains_widgets() {
        let mut buf = Vec::new();
        render_outcome(&mut buf, &DashboardOutcome::Report(Box::new(report()))).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("warning: Column 'User'"));
        assert!(text.contains("Unique templates:  2"));
        assert!(text.contains("2024-06-14 15:16  2  (combo=2)"));
        assert!(!text.contains("15:17"), "empty buckets are folded away");
        assert!(text.contains("1 rows without a timestamp"));
        assert!(text.contains("Heatmap: rows per 1min by Component"));
        assert!(text.contains("2024-06-14 15:16  1  (su=1)"));
        assert!(text.contains("Top 1 EventTemplate"));
        assert!(text.contains("combo | su"));
    }

    #[test]
    fn test_templates_listed_by_occurrence() {
        let csv = "EventId,EventTemplate,Occurrences\n\
                   E1,session opened for user <*>,2\n\
                   E2,authentication failure; rhost=<*>,12\n";
        let templates =
            TemplateSummary::from_reader(csv.as_bytes(), std::path::Path::new("t.csv")).unwrap();
        let mut buf = Vec::new();
        render_templates(&mut buf, &templates).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Log templates"));
        assert!(text.contains("  12  E2  authentication failure; rhost=<*>\n"));
        assert!(text.contains("   2  E1  session opened for user <*>\n"));
        assert!(text.find("E2").unwrap() < text.find("E1").unwrap());
    }

    #[test]
    fn test_templates_capped() {
        let mut csv = String::from("EventId,EventTemplate,Occurrences\n");
        for i in 0..MAX_RENDERED_TEMPLATES + 3 {
            csv.push_str(&format!("E{i},t{i} <*>,1\n"));
        }
        let templates =
            TemplateSummary::from_reader(csv.as_bytes(), std::path::Path::new("t.csv")).unwrap();
        let mut buf = Vec::new();
        render_templates(&mut buf, &templates).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("... 3 more templates"));
    }

    #[test]
    fn test_empty_outcome_text() {
        let mut buf = Vec::new();
        let outcome = DashboardOutcome::Empty {
            filters: Vec::new(),
            warnings: Vec::new(),
        };
        render_outcome(&mut buf, &outcome).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "No rows match the current filters.\n"
        );
    }
}
