// LogScope - app/preview.rs
//
// Dry run of a profile against sample lines: which fields the log format
// extracts and what the mask pipeline leaves of the message. No algorithm
// is invoked.

use crate::core::model::SourceProfile;
use crate::core::template::FieldMap;
use crate::util::logging;
use serde::Serialize;

/// Field holding the free-text message that masking applies to.
const CONTENT_FIELD: &str = "Content";

/// Result of matching one sample line.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewLine {
    /// 1-based line number within the sample.
    pub line_no: usize,
    pub line: String,
    /// `None` when the line does not match the log format.
    pub fields: Option<FieldMap>,
    /// Masked `Content` field, when the format has one and the line matched.
    pub masked_content: Option<String>,
}

/// Preview the first `max_lines` of `lines` against `profile`.
pub fn preview<'a, I>(profile: &SourceProfile, lines: I, max_lines: usize) -> Vec<PreviewLine>
where
    I: IntoIterator<Item = &'a str>,
{
    let result: Vec<PreviewLine> = lines
        .into_iter()
        .take(max_lines)
        .enumerate()
        .map(|(i, line)| {
            let line = line.trim_end_matches(['\r', '\n']);
            let fields = profile.matcher.match_line(line);
            if fields.is_none() {
                tracing::debug!(
                    line_no = i + 1,
                    line = logging::preview(line),
                    "Line does not match log format"
                );
            }
            let masked_content = fields
                .as_ref()
                .and_then(|f| f.get(CONTENT_FIELD))
                .map(|content| profile.masker.mask(content));
            PreviewLine {
                line_no: i + 1,
                line: line.to_string(),
                fields,
                masked_content,
            }
        })
        .collect();

    tracing::info!(
        kind = profile.kind.id(),
        lines = result.len(),
        matched = result.iter().filter(|l| l.fields.is_some()).count(),
        "Preview complete"
    );

    result
}

// =============================================================================
// Tests
// =============================================================================
