//! Value replacement stage
//!
//! Interprets `match:replacement` rule lists against table cells. Three rule
//! kinds are dispatched in priority order per cell:
//!
//! 1. regex rules (`^…$` patterns) with gsub-style substitution and `\1`
//!    capture references
//! 2. numeric comparisons (`<`, `<=`, `>`, `>=`, `<>`, `=` plus a number),
//!    where `\1` references the original value
//! 3. exact string equality
//!
//! Rule structure is validated before any row is touched; failures during a
//! single cell's evaluation degrade to visible error text in that cell.

use regex::Regex;

use crate::transform::error::{TransformError, TransformResult};
use crate::transform::table::{Cell, Table};

/// Numeric comparison operators accepted in replace rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    Eq,
}

impl CompareOp {
    fn holds(self, value: f64, operand: f64) -> bool {
        match self {
            Self::Lt => value < operand,
            Self::Le => value <= operand,
            Self::Gt => value > operand,
            Self::Ge => value >= operand,
            Self::Ne => value != operand,
            Self::Eq => value == operand,
        }
    }
}

/// How a rule matches a cell
#[derive(Debug)]
enum Matcher {
    /// Full-pattern regex, pre-compiled; a compile failure is carried as the
    /// error message every targeted cell will display
    Pattern(Result<Regex, String>),
    /// Numeric comparison against the coerced cell value
    Compare(CompareOp, f64),
    /// Exact string equality
    Exact(String),
}

/// One `match:replacement` rule
#[derive(Debug)]
struct ReplaceRule {
    matcher: Matcher,
    replacement: String,
}

/// Parsed replace-values spec: target columns plus the ordered rule list
#[derive(Debug)]
pub struct ReplaceSpec {
    /// 1-based target column numbers; empty means all columns
    columns: Vec<usize>,
    rules: Vec<ReplaceRule>,
}

impl ReplaceSpec {
    /// Parse a spec from its option key and value.
    ///
    /// Trailing `_<digits>` groups of the key select 1-based target columns
    /// (`replace_values_2` targets column 2 only); a bare `replace_values`
    /// key targets all columns. The value is a comma-separated rule list in
    /// which `\,` and `\:` escape the delimiters. A rule without exactly one
    /// unescaped `:` fails here, before any row is modified.
    pub fn parse(key: &str, value: &str) -> TransformResult<Self> {
        let mut columns = Vec::new();
        for part in key
            .trim_start_matches("replace_values")
            .split('_')
            .filter(|s| !s.is_empty())
        {
            let column = part
                .parse::<usize>()
                .map_err(|_| TransformError::InvalidColumnSelector(key.to_string()))?;
            columns.push(column);
        }

        let mut rules = Vec::new();
        for raw_rule in split_unescaped(value, ',') {
            let parts = split_unescaped(&raw_rule, ':');
            let [matcher, replacement] = parts.as_slice() else {
                return Err(TransformError::MalformedReplaceRule(raw_rule));
            };
            rules.push(ReplaceRule::new(
                &unescape(matcher),
                unescape(replacement),
            ));
        }

        Ok(Self { columns, rules })
    }
}

impl ReplaceRule {
    fn new(matcher: &str, replacement: String) -> Self {
        let matcher = if matcher.starts_with('^') && matcher.ends_with('$') {
            Matcher::Pattern(Regex::new(matcher).map_err(|e| e.to_string()))
        } else if let Some((op, operand)) = parse_comparison(matcher) {
            Matcher::Compare(op, operand)
        } else {
            Matcher::Exact(matcher.to_string())
        };
        Self {
            matcher,
            replacement,
        }
    }

    /// Apply this rule to the string form of a cell, returning the possibly
    /// changed value; failures return the error message as the new value
    fn apply(&self, value: &str) -> String {
        match &self.matcher {
            Matcher::Pattern(Ok(regex)) => {
                let replacement = capture_replacement(&self.replacement);
                regex.replace_all(value, replacement.as_str()).into_owned()
            }
            Matcher::Pattern(Err(message)) => message.clone(),
            Matcher::Compare(op, operand) => {
                // non-numeric cells are silently skipped
                let Ok(numeric) = value.trim().parse::<f64>() else {
                    return value.to_string();
                };
                if op.holds(numeric, *operand) {
                    self.replacement.replace("\\1", value)
                } else {
                    value.to_string()
                }
            }
            Matcher::Exact(expected) => {
                if value == expected {
                    self.replacement.clone()
                } else {
                    value.to_string()
                }
            }
        }
    }
}

/// Apply a parsed replace spec to every targeted cell
pub fn replace_values(mut table: Table, spec: &ReplaceSpec) -> Table {
    for row in &mut table.content {
        for (index, cell) in row.iter_mut().enumerate() {
            if !spec.columns.is_empty() && !spec.columns.contains(&(index + 1)) {
                continue;
            }
            let original = cell.to_string();
            let mut value = original.clone();
            for rule in &spec.rules {
                value = rule.apply(&value);
            }
            if value != original {
                *cell = Cell::Text(value);
            }
        }
    }
    table
}

/// Parse a comparison matcher like `<=10` or `<>0`
fn parse_comparison(matcher: &str) -> Option<(CompareOp, f64)> {
    let trimmed = matcher.trim();
    let (op, rest) = if let Some(rest) = trimmed.strip_prefix("<=") {
        (CompareOp::Le, rest)
    } else if let Some(rest) = trimmed.strip_prefix(">=") {
        (CompareOp::Ge, rest)
    } else if let Some(rest) = trimmed.strip_prefix("<>") {
        (CompareOp::Ne, rest)
    } else if let Some(rest) = trimmed.strip_prefix('<') {
        (CompareOp::Lt, rest)
    } else if let Some(rest) = trimmed.strip_prefix('>') {
        (CompareOp::Gt, rest)
    } else if let Some(rest) = trimmed.strip_prefix('=') {
        (CompareOp::Eq, rest)
    } else {
        return None;
    };
    rest.trim().parse::<f64>().ok().map(|operand| (op, operand))
}

/// Split on a delimiter, honoring backslash escapes
fn split_unescaped(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == delimiter {
            parts.push(String::new());
            continue;
        }
        let Some(part) = parts.last_mut() else { break };
        if c == '\\' {
            part.push('\\');
            if let Some(next) = chars.next() {
                part.push(next);
            }
        } else {
            part.push(c);
        }
    }
    parts
}

/// Remove the escapes for the two rule delimiters, leaving all other
/// backslash sequences (regex syntax, capture references) intact
fn unescape(input: &str) -> String {
    input.replace("\\,", ",").replace("\\:", ":")
}

/// Translate `\1`-style capture references into the regex crate's `${1}`
/// replacement syntax, keeping `$` literals safe
fn capture_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => {
                let digit = chars.next().unwrap_or('0');
                out.push_str("${");
                out.push(digit);
                out.push('}');
            }
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_row(cells: Vec<Cell>) -> Table {
        Table::new(vec![], vec![cells])
    }

    fn apply(key: &str, value: &str, cells: Vec<Cell>) -> Vec<Cell> {
        let spec = ReplaceSpec::parse(key, value).unwrap();
        replace_values(table_row(cells), &spec).content.remove(0)
    }

    #[test]
    fn test_exact_replacement() {
        let row = apply("replace_values", "null:N/A", vec![Cell::from("null"), Cell::from("ok")]);
        assert_eq!(row, vec![Cell::from("N/A"), Cell::from("ok")]);
    }

    #[test]
    fn test_comparison_with_column_targeting() {
        // 1-based column 2 only affects 0-based index 1
        let row = apply(
            "replace_values_2",
            "<=10:OK",
            vec![Cell::Number(5.0), Cell::Number(10.0), Cell::Number(20.0)],
        );
        assert_eq!(
            row,
            vec![Cell::Number(5.0), Cell::from("OK"), Cell::Number(20.0)]
        );
    }

    #[test]
    fn test_multiple_target_columns() {
        let row = apply(
            "replace_values_1_3",
            ">=10:high",
            vec![Cell::Number(20.0), Cell::Number(20.0), Cell::Number(20.0)],
        );
        assert_eq!(
            row,
            vec![Cell::from("high"), Cell::Number(20.0), Cell::from("high")]
        );
    }

    #[test]
    fn test_comparison_keeps_original_via_backreference() {
        let row = apply(
            "replace_values",
            ">90:\\1 (critical)",
            vec![Cell::Number(95.0), Cell::Number(50.0)],
        );
        assert_eq!(
            row,
            vec![Cell::from("95 (critical)"), Cell::Number(50.0)]
        );
    }

    #[test]
    fn test_comparison_skips_non_numeric() {
        let row = apply("replace_values", "<10:low", vec![Cell::from("n/a")]);
        assert_eq!(row, vec![Cell::from("n/a")]);
    }

    #[test]
    fn test_regex_substitution() {
        let row = apply(
            "replace_values",
            "^(\\d+)ms$:\\1 milliseconds",
            vec![Cell::from("250ms")],
        );
        assert_eq!(row, vec![Cell::from("250 milliseconds")]);
    }

    #[test]
    fn test_not_equal_comparison() {
        let row = apply(
            "replace_values",
            "<>0:nonzero",
            vec![Cell::Number(0.0), Cell::Number(3.0)],
        );
        assert_eq!(row, vec![Cell::Number(0.0), Cell::from("nonzero")]);
    }

    #[test]
    fn test_escaped_delimiters() {
        let row = apply(
            "replace_values",
            "a\\,b:x\\:y",
            vec![Cell::from("a,b")],
        );
        assert_eq!(row, vec![Cell::from("x:y")]);
    }

    #[test]
    fn test_rules_apply_in_sequence() {
        let row = apply(
            "replace_values",
            "down:0,0:offline",
            vec![Cell::from("down")],
        );
        assert_eq!(row, vec![Cell::from("offline")]);
    }

    #[test]
    fn test_malformed_rule_rejected_before_any_change() {
        let result = ReplaceSpec::parse("replace_values", "ok:fine,broken");
        assert!(matches!(
            result,
            Err(TransformError::MalformedReplaceRule(ref s)) if s == "broken"
        ));
    }

    #[test]
    fn test_too_many_colons_rejected() {
        assert!(ReplaceSpec::parse("replace_values", "a:b:c").is_err());
    }

    #[test]
    fn test_non_numeric_column_suffix_rejected() {
        // must not silently widen the target to all columns
        assert!(matches!(
            ReplaceSpec::parse("replace_values_x", "a:b"),
            Err(TransformError::InvalidColumnSelector(ref k)) if k == "replace_values_x"
        ));
    }

    #[test]
    fn test_bad_regex_becomes_cell_error_text() {
        let row = apply("replace_values", "^(unclosed$:x", vec![Cell::from("v")]);
        match &row[0] {
            Cell::Text(s) => assert!(s.contains("regex")),
            other => panic!("expected error text, got {other:?}"),
        }
    }
}
