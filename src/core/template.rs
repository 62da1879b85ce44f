// LogScope - core/template.rs
//
// Field-extraction template compiler.
//
// A template such as `<Date> <Time>, <Level> <Component> <Content>` is turned
// into an anchored regex with one named capture per `<Field>` placeholder.
// Grammar:
//   <Name>      field placeholder, lazy capture
//   \x          literal x
//   ( ... )     group, `( ... )?` optional; groups nest
//   whitespace  one or more whitespace characters
//   other       literal

use crate::util::constants;
use crate::util::error::TemplateError;
use regex::{Regex, RegexBuilder};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Compiled field-extraction template.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    fields: Vec<String>,
    template: String,
}

/// Field values extracted from one line, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    /// Value of `name`, if it is a declared field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Matcher {
    /// Match a full line. A match that does not span the whole line is a
    /// non-match. Fields inside an optional group that did not participate
    /// are returned as empty strings.
    pub fn match_line(&self, line: &str) -> Option<FieldMap> {
        let caps = self.regex.captures(line)?;
        let values = self
            .fields
            .iter()
            .map(|name| {
                let value = caps.name(name).map_or("", |m| m.as_str());
                (name.clone(), value.to_string())
            })
            .collect();
        Some(FieldMap(values))
    }

    /// Declared field names in template order.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// Generated regex source.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// The template this matcher was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Compile a field-extraction template into an anchored matcher.
pub fn compile(template: &str) -> Result<Matcher, TemplateError> {
    if template.len() > constants::MAX_TEMPLATE_LENGTH {
        return Err(TemplateError::TooLong {
            length: template.len(),
            max_length: constants::MAX_TEMPLATE_LENGTH,
        });
    }

    let chars: Vec<(usize, char)> = template.char_indices().collect();
    let mut pattern = String::with_capacity(template.len() * 2 + 2);
    let mut fields: Vec<String> = Vec::new();
    let mut open_groups: Vec<usize> = Vec::new();
    let mut i = 0;

    pattern.push('^');

    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            '<' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&(_, ch)| ch == '>')
                    .map(|offset| i + 1 + offset)
                    .ok_or(TemplateError::UnterminatedPlaceholder { position: pos })?;
                let name: String = chars[i + 1..close].iter().map(|&(_, ch)| ch).collect();
                if !is_valid_field_name(&name) {
                    return Err(TemplateError::InvalidFieldName {
                        name,
                        position: pos,
                    });
                }
                if fields.contains(&name) {
                    return Err(TemplateError::DuplicateField { name });
                }
                pattern.push_str("(?P<");
                pattern.push_str(&name);
                pattern.push_str(">.*?)");
                fields.push(name);
                i = close + 1;
            }
            '\\' => {
                let (_, escaped) = *chars.get(i + 1).ok_or(TemplateError::TrailingEscape)?;
                push_literal(&mut pattern, escaped);
                i += 2;
            }
            '(' => {
                open_groups.push(pos);
                pattern.push_str("(?:");
                i += 1;
            }
            ')' => {
                if open_groups.pop().is_none() {
                    return Err(TemplateError::UnbalancedParentheses { position: pos });
                }
                pattern.push(')');
                if matches!(chars.get(i + 1), Some(&(_, '?'))) {
                    pattern.push('?');
                    i += 2;
                } else {
                    i += 1;
                }
            }
            c if c.is_whitespace() => {
                while i < chars.len() && chars[i].1.is_whitespace() {
                    i += 1;
                }
                pattern.push_str(r"\s+");
            }
            other => {
                push_literal(&mut pattern, other);
                i += 1;
            }
        }
    }

    if let Some(position) = open_groups.pop() {
        return Err(TemplateError::UnbalancedParentheses { position });
    }
    if fields.is_empty() {
        return Err(TemplateError::NoFields);
    }

    pattern.push('$');

    let regex = RegexBuilder::new(&pattern)
        .size_limit(constants::MAX_COMPILED_REGEX_SIZE)
        .build()
        .map_err(|e| TemplateError::Regex {
            pattern: pattern.clone(),
            source: e,
        })?;

    tracing::debug!(
        template,
        pattern = %regex.as_str(),
        fields = fields.len(),
        "Compiled log format"
    );

    Ok(Matcher {
        regex,
        fields,
        template: template.to_string(),
    })
}

fn push_literal(pattern: &mut String, c: char) {
    let mut buf = [0u8; 4];
    pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOWS: &str = "<Date> <Time>, <Level> <Component> <Content>";
    const LINUX: &str = r"<Month> <Date> <Time> <Level> (<Component>)?(\[<PID>\])?: <Content>";
    const MAC: &str = r"<Month>  <Date> <Time> <User> <Component>\[<PID>\]( \(<Address>\))?: <Content>";

    #[test]
    fn test_field_names_in_template_order() {
        let m = compile(WINDOWS).unwrap();
        assert_eq!(
            m.field_names(),
            &["Date", "Time", "Level", "Component", "Content"]
        );
    }

    #[test]
    fn test_match_windows_line() {
        let m = compile(WINDOWS).unwrap();
        let fields = m
            .match_line("2016-09-28 04:30:30, Info                  CBS    Loaded Servicing Stack v6.1.7601.23505")
            .unwrap();
        assert_eq!(fields.get("Date"), Some("2016-09-28"));
        assert_eq!(fields.get("Time"), Some("04:30:30"));
        assert_eq!(fields.get("Level"), Some("Info"));
        assert_eq!(fields.get("Component"), Some("CBS"));
        assert_eq!(
            fields.get("Content"),
            Some("Loaded Servicing Stack v6.1.7601.23505")
        );
    }

    #[test]
    fn test_optional_groups_present() {
        let m = compile(LINUX).unwrap();
        let fields = m
            .match_line("Jun 14 15:16:01 combo sshd(pam_unix)[19939]: authentication failure")
            .unwrap();
        assert_eq!(fields.get("Level"), Some("combo"));
        assert_eq!(fields.get("Component"), Some("sshd(pam_unix)"));
        assert_eq!(fields.get("PID"), Some("19939"));
        assert_eq!(fields.get("Content"), Some("authentication failure"));
    }

    #[test]
    fn test_optional_group_absent_yields_empty_field() {
        let m = compile(LINUX).unwrap();
        let fields = m
            .match_line("Jun 15 04:06:18 combo su: session opened for user cyrus")
            .unwrap();
        assert_eq!(fields.get("Component"), Some("su"));
        assert_eq!(fields.get("PID"), Some(""));
        assert_eq!(fields.len(), 7);
    }

    #[test]
    fn test_mac_optional_address() {
        let m = compile(MAC).unwrap();
        let with = m
            .match_line("Jul  1 09:00:55 calvisitor-10-105-160-95 kernel[0] (0x1f): AppleThunderboltNHI resumed")
            .unwrap();
        assert_eq!(with.get("Address"), Some("0x1f"));
        let without = m
            .match_line("Jul  1 09:01:05 calvisitor-10-105-160-95 com.apple.CDScheduler[43]: Thermal pressure state: 1")
            .unwrap();
        assert_eq!(without.get("Address"), Some(""));
        assert_eq!(without.get("Component"), Some("com.apple.CDScheduler"));
        assert_eq!(without.get("PID"), Some("43"));
    }

    #[test]
    fn test_prefix_match_is_non_match() {
        let m = compile("<Level>: <Code>!").unwrap();
        assert!(m.match_line("WARN: 12!").is_some());
        assert!(m.match_line("WARN: 12! trailing").is_none());
        assert!(m.match_line("no colon here").is_none());
    }

    #[test]
    fn test_round_trip_substituted_values() {
        let m = compile(r"\[<A>\] <B>-<C> {<D>}").unwrap();
        let line = "[alpha] beta-gamma {delta}";
        let fields = m.match_line(line).unwrap();
        let values: Vec<_> = fields.iter().collect();
        assert_eq!(
            values,
            vec![("A", "alpha"), ("B", "beta"), ("C", "gamma"), ("D", "delta")]
        );
    }

    #[test]
    fn test_literals_are_escaped() {
        let m = compile("<A>.<B>*").unwrap();
        assert!(m.match_line("x.y*").is_some());
        assert!(m.match_line("xzy*").is_none());
    }

    #[test]
    fn test_whitespace_run_matches_any_spacing() {
        let m = compile("<A>  <B>").unwrap();
        assert!(m.match_line("a b").is_some());
        assert!(m.match_line("a \t  b").is_some());
        assert!(m.pattern().contains(r"\s+"));
    }

    #[test]
    fn test_no_fields_rejected() {
        assert!(matches!(compile("plain text"), Err(TemplateError::NoFields)));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        match compile("<A> <A>") {
            Err(TemplateError::DuplicateField { name }) => assert_eq!(name, "A"),
            other => panic!("Expected DuplicateField, got: {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_parentheses_rejected() {
        assert!(matches!(
            compile("(<A>"),
            Err(TemplateError::UnbalancedParentheses { position: 0 })
        ));
        assert!(matches!(
            compile("<A>)"),
            Err(TemplateError::UnbalancedParentheses { position: 3 })
        ));
    }

    #[test]
    fn test_malformed_placeholders_rejected() {
        assert!(matches!(
            compile("<A> <B"),
            Err(TemplateError::UnterminatedPlaceholder { position: 4 })
        ));
        assert!(matches!(
            compile("<1st>"),
            Err(TemplateError::InvalidFieldName { .. })
        ));
        assert!(matches!(
            compile("<>"),
            Err(TemplateError::InvalidFieldName { .. })
        ));
    }

    #[test]
    fn test_trailing_escape_rejected() {
        assert!(matches!(
            compile(r"<A>\"),
            Err(TemplateError::TrailingEscape)
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        let long = "<A>".to_string() + &"x".repeat(constants::MAX_TEMPLATE_LENGTH);
        assert!(matches!(compile(&long), Err(TemplateError::TooLong { .. })));
    }
}
