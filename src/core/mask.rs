// LogScope - core/mask.rs
//
// Ordered masking pipeline. Each rule rewrites every span its regex matches
// into a replacement token, in list order; later rules see the output of
// earlier ones. Rules may use look-around, so they compile with fancy-regex.

use crate::core::model::MaskRule;
use crate::util::constants;
use crate::util::error::MaskError;
use crate::util::logging;
use fancy_regex::{Regex as FancyRegex, RegexBuilder as FancyRegexBuilder};

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: FancyRegex,
    replacement: String,
}

/// Compiled, ordered list of mask rules.
#[derive(Debug, Clone)]
pub struct MaskPipeline {
    rules: Vec<CompiledRule>,
}

impl MaskPipeline {
    /// Compile `rules`, keeping their order.
    pub fn new(rules: &[MaskRule]) -> Result<Self, MaskError> {
        if rules.len() > constants::MAX_MASK_RULES {
            return Err(MaskError::TooManyRules {
                count: rules.len(),
                max: constants::MAX_MASK_RULES,
            });
        }

        let mut compiled = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            if rule.pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
                return Err(MaskError::RegexTooLong {
                    index,
                    length: rule.pattern.len(),
                    max_length: constants::MAX_REGEX_PATTERN_LENGTH,
                });
            }
            let regex = FancyRegexBuilder::new(&rule.pattern)
                .backtrack_limit(constants::MASK_BACKTRACK_LIMIT)
                .build()
                .map_err(|e| MaskError::InvalidRegex {
                    index,
                    pattern: rule.pattern.clone(),
                    source: Box::new(e),
                })?;
            compiled.push(CompiledRule {
                regex,
                replacement: rule.replacement.clone(),
            });
        }

        Ok(Self { rules: compiled })
    }

    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order to `line`.
    ///
    /// Replacement tokens are inserted literally. A rule that exceeds the
    /// backtracking limit stops at the failing position and the remainder of
    /// the line is kept unchanged for that rule.
    pub fn mask(&self, line: &str) -> String {
        let mut current = line.to_string();
        for (index, rule) in self.rules.iter().enumerate() {
            current = apply_rule(index, rule, &current);
        }
        current
    }
}

fn apply_rule(index: usize, rule: &CompiledRule, input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for found in rule.regex.find_iter(input) {
        match found {
            Ok(m) => {
                out.push_str(&input[last..m.start()]);
                out.push_str(&rule.replacement);
                last = m.end();
            }
            Err(e) => {
                tracing::debug!(
                    rule = index,
                    error = %e,
                    line = logging::preview(input),
                    "Mask rule aborted; keeping remainder of line"
                );
                break;
            }
        }
    }
    out.push_str(&input[last..]);
    out
}

// =============================================================================
// Tests
// =============================================================================
