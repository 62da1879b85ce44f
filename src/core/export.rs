// LogScope - core/export.rs
//
// CSV and JSON export of filtered structured rows, of the template summary
// and of dashboard reports. Writers take any Write trait object; the
// `*_to_path` helpers open the destination file themselves.

use crate::core::dashboard::DashboardOutcome;
use crate::core::filter::FilteredView;
use crate::core::table::{StructuredTable, TemplateSummary, EVENT_ID, EVENT_TEMPLATE, OCCURRENCES};
use crate::util::constants;
use crate::util::error::ExportError;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File format for row exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Csv,
    Json,
}

fn check_row_limit(count: usize, max: usize) -> Result<(), ExportError> {
    if count > max {
        return Err(ExportError::TooManyRows { count, max });
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ExportError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Export the rows of `view` to CSV. The header is the table's columns.
pub fn export_csv<W: Write>(
    table: &StructuredTable,
    view: &FilteredView,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_row_limit(view.len(), constants::MAX_EXPORT_ROWS)?;
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&table.columns).map_err(csv_err)?;

    let mut count = 0;
    for &row in &view.indices {
        let record = (0..table.columns.len()).map(|col| table.cell(row, col));
        csv_writer.write_record(record).map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %export_path.display(), rows = count, "Exported CSV");
    Ok(count)
}

/// Serialises one row as a JSON object keyed by column name.
struct RowObject<'a> {
    table: &'a StructuredTable,
    row: usize,
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.columns.len()))?;
        for (col, name) in self.table.columns.iter().enumerate() {
            map.serialize_entry(name, self.table.cell(self.row, col))?;
        }
        map.end()
    }
}

struct RowArray<'a> {
    table: &'a StructuredTable,
    view: &'a FilteredView,
}

impl Serialize for RowArray<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.view.len()))?;
        for &row in &self.view.indices {
            seq.serialize_element(&RowObject {
                table: self.table,
                row,
            })?;
        }
        seq.end()
    }
}

/// Export the rows of `view` to JSON (array of objects).
pub fn export_json<W: Write>(
    table: &StructuredTable,
    view: &FilteredView,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_row_limit(view.len(), constants::MAX_EXPORT_ROWS)?;
    serde_json::to_writer_pretty(writer, &RowArray { table, view }).map_err(|e| {
        ExportError::Json {
            path: export_path.to_path_buf(),
            source: e,
        }
    })?;
    tracing::info!(path = %export_path.display(), rows = view.len(), "Exported JSON");
    Ok(view.len())
}

/// Export the rows of `view` to a new file at `path`.
///
/// The row limit is checked first, so an oversized export leaves no file
/// behind.
pub fn export_rows_to_path(
    table: &StructuredTable,
    view: &FilteredView,
    format: RowFormat,
    path: &Path,
) -> Result<usize, ExportError> {
    rows_to_path(table, view, format, path, constants::MAX_EXPORT_ROWS)
}

fn rows_to_path(
    table: &StructuredTable,
    view: &FilteredView,
    format: RowFormat,
    path: &Path,
    max_rows: usize,
) -> Result<usize, ExportError> {
    check_row_limit(view.len(), max_rows)?;
    let writer = create(path)?;
    match format {
        RowFormat::Csv => export_csv(table, view, writer, path),
        RowFormat::Json => export_json(table, view, writer, path),
    }
}

/// Export the template summary to CSV, most frequent template first.
pub fn export_templates_csv<W: Write>(
    summary: &TemplateSummary,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record([EVENT_ID, EVENT_TEMPLATE, OCCURRENCES])
        .map_err(csv_err)?;
    let ranked = summary.ranked();
    for row in &ranked {
        let occurrences = row.occurrences.to_string();
        csv_writer
            .write_record([row.event_id.as_str(), row.template.as_str(), occurrences.as_str()])
            .map_err(csv_err)?;
    }
    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %export_path.display(), templates = ranked.len(), "Exported templates");
    Ok(ranked.len())
}

/// Export the template summary to a new CSV file at `path`.
pub fn export_templates_to_path(summary: &TemplateSummary, path: &Path) -> Result<usize, ExportError> {
    export_templates_csv(summary, create(path)?, path)
}

/// Export a dashboard outcome (report or empty state) to JSON.
pub fn export_dashboard_json<W: Write>(
    outcome: &DashboardOutcome,
    writer: W,
    export_path: &Path,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, outcome).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })
}
