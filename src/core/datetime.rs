// LogScope - core/datetime.rs
//
// Derived datetime per structured row. Source kinds spread the timestamp
// over several fields (and some omit the year entirely), so each profile
// carries a recipe that composes the fields into one string and tries a
// list of chrono formats against it.

use crate::core::model::DatetimeRecipe;
use crate::core::table::StructuredTable;
use crate::util::constants;
use chrono::{NaiveDate, NaiveDateTime};

enum Piece {
    Literal(String),
    Column(Option<usize>),
    Year,
}

/// Derive one optional datetime per row of `table`.
///
/// `reference_year` stands in for `{@year}` in the recipe. A row whose
/// composed string matches none of the formats, or that references a
/// column the table lacks, gets `None`.
pub fn derive_all(
    table: &StructuredTable,
    recipe: &DatetimeRecipe,
    reference_year: i32,
) -> Vec<Option<NaiveDateTime>> {
    let pieces = plan(table, &recipe.compose);
    let year = reference_year.to_string();

    let derived: Vec<Option<NaiveDateTime>> = (0..table.len())
        .map(|row| {
            let mut composed = String::new();
            for piece in &pieces {
                match piece {
                    Piece::Literal(text) => composed.push_str(text),
                    Piece::Year => composed.push_str(&year),
                    Piece::Column(Some(col)) => composed.push_str(table.cell(row, *col).trim()),
                    Piece::Column(None) => return None,
                }
            }
            parse_with(&composed, &recipe.formats)
        })
        .collect();

    let unparsed = derived.iter().filter(|d| d.is_none()).count();
    if unparsed > 0 {
        tracing::debug!(
            rows = table.len(),
            unparsed,
            compose = %recipe.compose,
            "Some rows have no derivable datetime"
        );
    }

    derived
}

/// Try each format in order; date-only formats yield midnight.
pub fn parse_with(value: &str, formats: &[String]) -> Option<NaiveDateTime> {
    formats.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt).ok().or_else(|| {
            NaiveDate::parse_from_str(value, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
    })
}

/// Split the compose pattern into literal text and column lookups.
fn plan(table: &StructuredTable, compose: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut rest = compose;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        if open > 0 {
            pieces.push(Piece::Literal(rest[..open].to_string()));
        }
        let name = &after[..close];
        if name == constants::REFERENCE_YEAR_PLACEHOLDER {
            pieces.push(Piece::Year);
        } else {
            pieces.push(Piece::Column(table.column_index(name)));
        }
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest.to_string()));
    }
    pieces
}

// =============================================================================
// Tests
// =============================================================================
