//! Format-aware variable stringification
//!
//! Implements the output formats a variable can be rendered in when it is
//! substituted into a query or document. The escaping rules are consumed by
//! downstream SQL engines, Lucene, regex engines and URL parsers, so each
//! rule is implemented bit-exact:
//!
//! | format | scalar | multi |
//! |---|---|---|
//! | csv | as-is | joined with `,` |
//! | distributed | as-is | joined with `,<name>=` |
//! | doublequote | `"…"` | each quoted, joined with `,` |
//! | json | JSON string | JSON array |
//! | percentencode | URL-encoded | `{a,b}` URL-encoded |
//! | pipe | as-is | joined with `\|` |
//! | raw | as-is | `{a,b}` |
//! | regex | escaped | `(a\|b)` |
//! | singlequote | `'…'` | each quoted, joined with `,` |
//! | sqlstring | `'…'` (doubled `'`) | each quoted, joined with `,` |
//! | lucene | escaped | `("a" OR "b")` |
//! | date[:pattern] | formatted timestamp | passthrough |
//! | default | `'` doubled | each singlequoted, joined with `,` |
//!
//! An "All" selection expands to the full option list before any of the
//! rules apply; without options the backing query string short-circuits the
//! formatting entirely.

use chrono::{SecondsFormat, TimeZone, Utc};

use crate::variables::variable::{Variable, ALL_SENTINEL};

/// Known date-pattern tokens mapped to strftime directives, ordered longest
/// first so the tokenizer always takes the greedy match.
const DATE_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("dddd", "%A"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("M", "%-m"),
    ("D", "%-d"),
    ("H", "%-H"),
    ("h", "%-I"),
    ("m", "%-M"),
    ("s", "%-S"),
    ("A", "%p"),
    ("a", "%P"),
    ("X", "%s"),
];

/// Effective value of a variable after "All" resolution
enum EffectiveValue {
    /// Values to format (and whether the multi rules apply)
    Values(Vec<String>, bool),
    /// Raw query string returned verbatim, bypassing all format rules
    Query(String),
}

impl Variable {
    /// Render the variable in the requested output format.
    ///
    /// Unrecognized or empty format names use the default rule (single
    /// quotes doubled). The escaping rules are documented in the module
    /// docs; report consumers depend on them being exact.
    pub fn formatted(&self, format: &str) -> String {
        let (values, multi) = match self.effective_values() {
            EffectiveValue::Query(query) => return query,
            EffectiveValue::Values(values, multi) => (values, multi),
        };
        let scalar = values.first().cloned().unwrap_or_default();

        match format {
            "csv" => {
                if multi {
                    values.join(",")
                } else {
                    scalar
                }
            }
            "distributed" => {
                if multi {
                    let separator = format!(",{}=", self.name().unwrap_or_default());
                    values.join(&separator)
                } else {
                    scalar
                }
            }
            "doublequote" => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("\"{}\"", escape_doublequote(v)))
                    .collect();
                if multi {
                    quoted.join(",")
                } else {
                    quoted.into_iter().next().unwrap_or_default()
                }
            }
            "json" => {
                if multi {
                    serde_json::to_string(&values).unwrap_or_default()
                } else {
                    serde_json::Value::String(scalar).to_string()
                }
            }
            "percentencode" => {
                if multi {
                    urlencoding::encode(&format!("{{{}}}", values.join(","))).into_owned()
                } else {
                    urlencoding::encode(&scalar).into_owned()
                }
            }
            "pipe" => {
                if multi {
                    values.join("|")
                } else {
                    scalar
                }
            }
            "raw" => {
                if multi {
                    format!("{{{}}}", values.join(","))
                } else {
                    scalar
                }
            }
            "regex" => {
                let escaped: Vec<String> = values.iter().map(|v| escape_regex(v)).collect();
                if multi {
                    format!("({})", escaped.join("|"))
                } else {
                    escaped.into_iter().next().unwrap_or_default()
                }
            }
            "singlequote" => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "\\'")))
                    .collect();
                if multi {
                    quoted.join(",")
                } else {
                    quoted.into_iter().next().unwrap_or_default()
                }
            }
            "sqlstring" => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "''")))
                    .collect();
                quoted.join(",")
            }
            "lucene" => {
                if multi {
                    let quoted: Vec<String> = values
                        .iter()
                        .map(|v| format!("\"{}\"", escape_lucene(v)))
                        .collect();
                    format!("({})", quoted.join(" OR "))
                } else {
                    escape_lucene(&scalar)
                }
            }
            f if f == "date" || f.starts_with("date:") => self.format_date(f, &scalar, multi),
            "" => default_format(&values, multi),
            other => {
                tracing::debug!(format = %other, "unrecognized variable format, using default");
                default_format(&values, multi)
            }
        }
    }

    /// Resolve the effective values for formatting, expanding an "All"
    /// selection from the option list or falling back to the raw query.
    fn effective_values(&self) -> EffectiveValue {
        if self.is_all_selection() {
            let option_values: Vec<String> = self
                .options()
                .iter()
                .filter(|o| o.value != ALL_SENTINEL && o.value != "All")
                .map(|o| o.value.clone())
                .collect();
            if !option_values.is_empty() {
                return EffectiveValue::Values(option_values, true);
            }
            if let Some(query) = self.query() {
                return EffectiveValue::Query(query.to_string());
            }
        }
        EffectiveValue::Values(self.raw_value().values(), self.multi())
    }

    /// Format an epoch-millisecond value as a date string.
    ///
    /// `date:seconds` truncates to epoch seconds, `date` and `date:iso`
    /// render ISO-8601 UTC with millisecond precision, anything else is
    /// interpreted as a date pattern. Multi-values and non-numeric values
    /// pass through unchanged.
    fn format_date(&self, format: &str, scalar: &str, multi: bool) -> String {
        if multi {
            return self.raw_value_string();
        }
        let Ok(millis) = scalar.parse::<i64>() else {
            return scalar.to_string();
        };
        let pattern = format.strip_prefix("date").and_then(|r| r.strip_prefix(':'));

        match pattern {
            Some("seconds") => (millis / 1000).to_string(),
            None | Some("iso") => match Utc.timestamp_millis_opt(millis).single() {
                Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
                None => scalar.to_string(),
            },
            Some(pattern) => match Utc.timestamp_millis_opt(millis).single() {
                Some(dt) => dt.format(&strftime_pattern(pattern)).to_string(),
                None => scalar.to_string(),
            },
        }
    }
}

/// Default rule: single quotes doubled; multi-values singlequoted and joined
fn default_format(values: &[String], multi: bool) -> String {
    if multi {
        let quoted: Vec<String> = values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect();
        quoted.join(",")
    } else {
        values
            .first()
            .map(|v| v.replace('\'', "''"))
            .unwrap_or_default()
    }
}

fn escape_doublequote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '/' | '$' | '.' | '|' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_lucene(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | ' ' | '|' | '=' | '/' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Translate a date pattern into a strftime format string, greedily matching
/// the longest known token at each position; unknown characters pass through
/// literally.
fn strftime_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    'scan: while !rest.is_empty() {
        for (token, directive) in DATE_TOKENS {
            if rest.starts_with(token) {
                out.push_str(directive);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let Some(c) = rest.chars().next() else { break };
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}
