// LogScope - core/table.rs
//
// The two result tables a mining run produces: per-line structured records
// and per-template summaries. Both are read from the CSV files the miner
// writes. Column sets vary by source kind, so structured rows stay untyped
// and every consumer checks column presence before use.

use crate::util::error::TableError;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Column every structured table carries.
pub const EVENT_TEMPLATE: &str = "EventTemplate";
/// Template identifier column.
pub const EVENT_ID: &str = "EventId";
/// Count column of the template summary.
pub const OCCURRENCES: &str = "Occurrences";

// =============================================================================
// Structured records
// =============================================================================

/// One row per input line the algorithm kept. Columns are the template's
/// field names plus `EventId`, `EventTemplate`, and whatever else the
/// algorithm emits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StructuredTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` among the columns.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `col`); missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Cell of `row` in column `name`, if the column exists.
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        self.column_index(name).map(|col| self.cell(row, col))
    }

    /// Read a structured table from CSV. The `EventTemplate` column is required.
    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table = Self::from_reader(file, path)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "Read structured table"
        );
        Ok(table)
    }

    /// Read from any reader. `path` is used for error messages only.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, TableError> {
        let (columns, rows) = read_records(reader, path)?;
        if !columns.iter().any(|c| c == EVENT_TEMPLATE) {
            return Err(TableError::MissingColumn {
                path: path.to_path_buf(),
                column: EVENT_TEMPLATE.to_string(),
            });
        }
        Ok(Self { columns, rows })
    }
}

// =============================================================================
// Template summary
// =============================================================================

/// One distinct template with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRow {
    pub event_id: String,
    pub template: String,
    pub occurrences: u64,
}

/// One row per distinct `EventTemplate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub rows: Vec<TemplateRow>,
}

impl TemplateSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of all occurrence counts.
    pub fn total_occurrences(&self) -> u64 {
        self.rows.iter().map(|r| r.occurrences).sum()
    }

    /// Rows by descending occurrence count; ties keep file order.
    pub fn ranked(&self) -> Vec<&TemplateRow> {
        let mut rows: Vec<&TemplateRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        rows
    }

    /// Read a template summary from CSV. `EventId`, `EventTemplate` and
    /// `Occurrences` are required.
    pub fn read_csv(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(file, path)
    }

    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, TableError> {
        let (columns, records) = read_records(reader, path)?;
        let index_of = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| TableError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let id_col = index_of(EVENT_ID)?;
        let template_col = index_of(EVENT_TEMPLATE)?;
        let count_col = index_of(OCCURRENCES)?;

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            let raw_count = record[count_col].trim();
            let occurrences = parse_count(raw_count).ok_or_else(|| TableError::InvalidValue {
                path: path.to_path_buf(),
                row: i + 1,
                column: OCCURRENCES.to_string(),
                value: raw_count.to_string(),
            })?;
            rows.push(TemplateRow {
                event_id: record[id_col].clone(),
                template: record[template_col].clone(),
                occurrences,
            });
        }
        Ok(Self { rows })
    }
}

/// Counts may be written as integers or as whole floats ("3.0").
fn parse_count(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    })
}

/// Read header and records, padding short records to the header width.
fn read_records<R: Read>(
    reader: R,
    path: &Path,
) -> Result<(Vec<String>, Vec<Vec<String>>), TableError> {
    let csv_err = |e| TableError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(columns.len(), String::new());
        rows.push(row);
    }
    Ok((columns, rows))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("upload.log_structured.csv")
    }

    #[test]
    fn test_read_structured_table() {
        let csv = "LineId,Level,Content,EventId,EventTemplate\n\
                   1,Info,start 1,E1,start <*>\n\
                   2,Error,\"boom, again\",E2,boom <*>\n";
        let table = StructuredTable::from_reader(csv.as_bytes(), &path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("Level"), Some(1));
        assert_eq!(table.value(1, "Content"), Some("boom, again"));
        assert_eq!(table.value(0, "Missing"), None);
    }

    #[test]
    fn test_structured_requires_event_template() {
        let csv = "LineId,Content\n1,hello\n";
        match StructuredTable::from_reader(csv.as_bytes(), &path()) {
            Err(TableError::MissingColumn { column, .. }) => assert_eq!(column, EVENT_TEMPLATE),
            other => panic!("Expected MissingColumn, got: {other:?}"),
        }
    }

    #[test]
    fn test_short_rows_padded() {
        let csv = "A,B,EventTemplate\nx,y\n";
        let table = StructuredTable::from_reader(csv.as_bytes(), &path()).unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.value(0, EVENT_TEMPLATE), Some(""));
    }

    #[test]
    fn test_read_template_summary() {
        let csv = "EventId,EventTemplate,Occurrences\nE1,start <*>,3\nE2,boom <*>,2.0\n";
        let summary = TemplateSummary::from_reader(csv.as_bytes(), &path()).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.rows[0].event_id, "E1");
        assert_eq!(summary.total_occurrences(), 5);
    }

    #[test]
    fn test_ranked_templates_most_frequent_first() {
        let csv = "EventId,EventTemplate,Occurrences\nE1,a <*>,1\nE2,b <*>,4\nE3,c <*>,1\n";
        let summary = TemplateSummary::from_reader(csv.as_bytes(), &path()).unwrap();
        let ids: Vec<&str> = summary.ranked().iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["E2", "E1", "E3"]);
    }

    #[test]
    fn test_template_summary_rejects_bad_count() {
        let csv = "EventId,EventTemplate,Occurrences\nE1,start <*>,many\n";
        assert!(matches!(
            TemplateSummary::from_reader(csv.as_bytes(), &path()),
            Err(TableError::InvalidValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.csv");
        assert!(matches!(
            StructuredTable::read_csv(&missing),
            Err(TableError::Io { .. })
        ));
    }
}
