// LogScope - ui/listing.rs
//
// Plain-text output for the `preview` and `defaults` commands.

use crate::app::preview::PreviewLine;
use crate::core::model::{Algorithm, SourceProfile};
use std::io::{self, Write};

/// One block per sample line: the fields it yielded or a no-match marker.
pub fn render_preview<W: Write>(
    out: &mut W,
    profile: &SourceProfile,
    lines: &[PreviewLine],
) -> io::Result<()> {
    writeln!(out, "{} ({})", profile.name, profile.kind.id())?;
    writeln!(out, "Format: {}", profile.log_format)?;
    writeln!(out, "Mask rules: {}", profile.mask_rules.len())?;

    for line in lines {
        writeln!(out)?;
        writeln!(out, "[{}] {}", line.line_no, line.line)?;
        match &line.fields {
            None => writeln!(out, "    (does not match the log format)")?,
            Some(fields) => {
                let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
                for (name, value) in fields.iter() {
                    writeln!(out, "    {name:<width$}  {value}")?;
                }
                if let Some(masked) = &line.masked_content {
                    writeln!(out, "    {:<width$}  {masked}", "(masked)")?;
                }
            }
        }
    }

    let matched = lines.iter().filter(|l| l.fields.is_some()).count();
    writeln!(out)?;
    writeln!(out, "{matched} of {} lines matched", lines.len())
}

/// Default parameter table for the given profiles and algorithms.
pub fn render_defaults<W: Write>(
    out: &mut W,
    profiles: &[&SourceProfile],
    algorithms: &[Algorithm],
) -> io::Result<()> {
    for profile in profiles {
        writeln!(out, "{} ({})", profile.name, profile.kind.id())?;
        for algorithm in algorithms {
            let specs = algorithm.parameter_specs();
            if specs.is_empty() {
                writeln!(out, "  {:<11} (no parameters)", algorithm.label())?;
                continue;
            }
            let defaults = profile.defaults_for(*algorithm);
            let params: Vec<String> = specs
                .iter()
                .map(|spec| {
                    let value = defaults
                        .and_then(|d| d.get(spec.name))
                        .map(String::as_str)
                        .unwrap_or("?");
                    format!("{}={value} ({})", spec.name, spec.ty.name())
                })
                .collect();
            writeln!(out, "  {:<11} {}", algorithm.label(), params.join(", "))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::SourceKind;
    use crate::core::registry;

    #[test]
    fn test_defaults_listing() {
        let registry = registry::load_builtin_registry().unwrap();
        let linux = registry.get(SourceKind::Linux).unwrap();
        let mut buf = Vec::new();
        render_defaults(&mut buf, &[linux], Algorithm::all()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Drain       depth=4 (integer), threshold=0.39 (float)"));
        assert!(text.contains("LogCluster  rsupport=40 (integer)"));
        assert!(text.contains("MoLFI       (no parameters)"));
    }

    #[test]
    fn test_preview_listing_marks_non_matching() {
        let registry = registry::load_builtin_registry().unwrap();
        let linux = registry.get(SourceKind::Linux).unwrap();
        let lines = crate::app::preview::preview(linux, ["not a syslog line"], 5);
        let mut buf = Vec::new();
        render_preview(&mut buf, linux, &lines).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("(does not match the log format)"));
        assert!(text.ends_with("0 of 1 lines matched\n"));
    }
}
