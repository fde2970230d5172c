//! Variable substitution engine
//!
//! Replaces `$name`, `${name}` and `${name:format}` placeholders in arbitrary
//! strings using a [`VariableCollection`]. The scan is re-run up to a fixed
//! bound so variables can reference other variables; unrelated dollar signs
//! (literal currency amounts, shell syntax) pass through untouched.

use crate::variables::collection::VariableCollection;

/// Upper bound on substitution passes for variables-within-variables.
/// Reaching the bound yields the best-effort partial result, not an error.
const MAX_PASSES: usize = 3;

/// Substitute all known variable placeholders in `template`.
///
/// The bare `$name` form does not match when immediately preceded by `.`, so
/// member-access-like syntax in embedded query languages survives. The
/// result is idempotent once no placeholder names match remaining `$`
/// sequences.
pub fn substitute(template: &str, variables: &VariableCollection) -> String {
    let mut result = template.to_string();
    for pass in 0..MAX_PASSES {
        if !result.contains('$') {
            break;
        }
        let next = substitute_pass(&result, variables);
        if next == result {
            break;
        }
        tracing::trace!(pass, "substitution pass changed template");
        result = next;
    }
    result
}

/// One left-to-right scan over the template
fn substitute_pass(input: &str, variables: &VariableCollection) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        // ${name} / ${name:format}
        if chars.get(i + 1) == Some(&'{') {
            if let Some(close) = chars[i + 2..].iter().position(|&c| c == '}') {
                let inner: String = chars[i + 2..i + 2 + close].iter().collect();
                let (name, format) = match inner.split_once(':') {
                    Some((name, format)) => (name, format),
                    None => (inner.as_str(), ""),
                };
                if let Some(variable) = variables.placeholder(name) {
                    out.push_str(&variable.formatted(format));
                    i += close + 3;
                    continue;
                }
            }
            out.push('$');
            i += 1;
            continue;
        }

        // bare $name; a preceding `.` marks member access, not a placeholder
        if i > 0 && chars[i - 1] == '.' {
            out.push('$');
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
            end += 1;
        }
        if end > start {
            let name: String = chars[start..end].iter().collect();
            if let Some(variable) = variables.placeholder(&name) {
                out.push_str(&variable.formatted(""));
                i = end;
                continue;
            }
        }
        out.push('$');
        i += 1;
    }

    out
}
