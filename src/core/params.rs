// LogScope - core/params.rs
//
// Resolution of algorithm tuning parameters: registry defaults overlaid with
// user overrides, each converted to the parameter's declared scalar type.

use crate::core::model::{Algorithm, ParserParameter, ScalarType, TypedValue};
use crate::util::error::ConfigError;
use std::collections::BTreeMap;

/// Convert a raw string to `ty`. Surrounding whitespace is ignored;
/// non-finite floats are rejected.
pub fn convert(raw: &str, ty: ScalarType) -> Option<TypedValue> {
    let trimmed = raw.trim();
    match ty {
        ScalarType::Int => trimmed.parse::<i64>().ok().map(TypedValue::Int),
        ScalarType::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(TypedValue::Float),
    }
}

/// Resolve the full parameter list for `algorithm`.
///
/// Every declared parameter takes its override when one is given, otherwise
/// its default. Override keys the algorithm does not declare are ignored.
/// A parameter with neither an override nor a default, or whose value does
/// not convert, is a configuration error.
pub fn resolve(
    algorithm: Algorithm,
    defaults: Option<&BTreeMap<String, String>>,
    overrides: &BTreeMap<String, String>,
) -> Result<Vec<ParserParameter>, ConfigError> {
    let specs = algorithm.parameter_specs();

    for key in overrides.keys() {
        if !specs.iter().any(|s| s.name == key) {
            tracing::debug!(
                algorithm = algorithm.id(),
                parameter = %key,
                "Ignoring unrecognised parameter override"
            );
        }
    }

    let mut resolved = Vec::with_capacity(specs.len());
    for spec in specs {
        let raw = overrides
            .get(spec.name)
            .or_else(|| defaults.and_then(|d| d.get(spec.name)))
            .cloned()
            .unwrap_or_default();

        let value = convert(&raw, spec.ty).ok_or_else(|| ConfigError::InvalidParameter {
            algorithm: algorithm.label().to_string(),
            parameter: spec.name.to_string(),
            value: raw.clone(),
            expected: spec.ty.name(),
        })?;

        resolved.push(ParserParameter {
            name: spec.name.to_string(),
            ty: spec.ty,
            raw,
            value,
        });
    }

    tracing::debug!(
        algorithm = algorithm.id(),
        params = ?resolved.iter().map(|p| (&p.name, p.value)).collect::<Vec<_>>(),
        "Resolved parameters"
    );

    Ok(resolved)
}

/// Parse `key=value` override strings as typed on the command line.
/// A pair without `=` or with an empty key is rejected.
pub fn parse_overrides<S: AsRef<str>>(
    pairs: &[S],
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let pair = pair.as_ref();
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(ConfigError::MalformedOverride {
                    pair: pair.to_string(),
                })
            }
        }
    }
    Ok(map)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_convert_int_and_float() {
        assert_eq!(convert(" 4 ", ScalarType::Int), Some(TypedValue::Int(4)));
        assert_eq!(convert("0.39", ScalarType::Float), Some(TypedValue::Float(0.39)));
        assert_eq!(convert("4.0", ScalarType::Int), None);
        assert_eq!(convert("abc", ScalarType::Float), None);
        assert_eq!(convert("inf", ScalarType::Float), None);
        assert_eq!(convert("", ScalarType::Int), None);
    }

    #[test]
    fn test_defaults_used_without_overrides() {
        let defaults = map(&[("depth", "4"), ("threshold", "0.39")]);
        let params = resolve(Algorithm::Drain, Some(&defaults), &BTreeMap::new()).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "depth");
        assert_eq!(params[0].value, TypedValue::Int(4));
        assert_eq!(params[1].value, TypedValue::Float(0.39));
    }

    #[test]
    fn test_override_wins_and_unknown_keys_ignored() {
        let defaults = map(&[("threshold", "0.7")]);
        let overrides = map(&[("threshold", "0.5"), ("bogus", "1")]);
        let params = resolve(Algorithm::Spell, Some(&defaults), &overrides).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].raw, "0.5");
        assert_eq!(params[0].value, TypedValue::Float(0.5));
    }

    #[test]
    fn test_bad_override_names_parameter() {
        let defaults = map(&[("depth", "4"), ("threshold", "0.39")]);
        let overrides = map(&[("depth", "abc")]);
        match resolve(Algorithm::Drain, Some(&defaults), &overrides) {
            Err(ConfigError::InvalidParameter {
                parameter,
                value,
                expected,
                ..
            }) => {
                assert_eq!(parameter, "depth");
                assert_eq!(value, "abc");
                assert_eq!(expected, "integer");
            }
            other => panic!("Expected InvalidParameter, got: {other:?}"),
        }
    }

    #[test]
    fn test_missing_default_is_error() {
        let result = resolve(Algorithm::LogCluster, None, &BTreeMap::new());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_molfi_has_no_parameters() {
        let params = resolve(Algorithm::Molfi, None, &map(&[("x", "1")])).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_parse_overrides() {
        let parsed = parse_overrides(&["depth=5", " threshold = 0.4 "]).unwrap();
        assert_eq!(parsed.get("depth").map(String::as_str), Some("5"));
        assert_eq!(parsed.get("threshold").map(String::as_str), Some("0.4"));
        assert!(matches!(
            parse_overrides(&["novalue"]),
            Err(ConfigError::MalformedOverride { pair }) if pair == "novalue"
        ));
        assert!(matches!(
            parse_overrides(&["=3"]),
            Err(ConfigError::MalformedOverride { .. })
        ));
    }
}
