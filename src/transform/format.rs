//! Column formatting stage
//!
//! Applies printf-style format strings positionally to table columns. A
//! formatting failure on a single cell (type mismatch, malformed spec)
//! replaces that cell's value with the error message so the problem is
//! visible to the report reader instead of aborting the run.

use crate::transform::table::{Cell, Table};

/// Format columns positionally from a comma-separated list of printf-style
/// specs; empty entries leave their column unchanged
pub fn format_columns(mut table: Table, format_spec: &str) -> Table {
    let specs: Vec<&str> = format_spec.split(',').collect();
    tracing::debug!(columns = specs.len(), "applying column formats");

    for row in &mut table.content {
        for (index, cell) in row.iter_mut().enumerate() {
            let Some(spec) = specs.get(index) else { break };
            if spec.is_empty() {
                continue;
            }
            let formatted = match sprintf(spec, cell) {
                Ok(s) => s,
                Err(message) => message,
            };
            *cell = Cell::Text(formatted);
        }
    }
    table
}

#[derive(Debug, Default)]
struct Directive {
    minus: bool,
    plus: bool,
    space: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

/// Render one cell through a printf-style format string.
///
/// Supports `%[flags][width][.precision]conv` with flags `-+0 ` and
/// conversions `d i u f e E g s x X o %`. At most one value-consuming
/// directive is allowed per spec, matching single-argument printf usage.
pub(crate) fn sprintf(spec: &str, cell: &Cell) -> Result<String, String> {
    let mut out = String::with_capacity(spec.len());
    let mut chars = spec.chars().peekable();
    let mut consumed_value = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                ' ' => directive.space = true,
                '0' => directive.zero = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(&digit) = chars.peek() {
            if !digit.is_ascii_digit() {
                break;
            }
            directive.width = directive.width * 10 + (digit as usize - '0' as usize);
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0usize;
            while let Some(&digit) = chars.peek() {
                if !digit.is_ascii_digit() {
                    break;
                }
                precision = precision * 10 + (digit as usize - '0' as usize);
                chars.next();
            }
            directive.precision = Some(precision);
        }
        directive.conv = chars
            .next()
            .ok_or_else(|| format!("incomplete format specifier in '{spec}'"))?;

        if consumed_value {
            return Err(format!("too few arguments for format '{spec}'"));
        }
        consumed_value = true;
        out.push_str(&apply_directive(&directive, cell)?);
    }

    Ok(out)
}

fn apply_directive(directive: &Directive, cell: &Cell) -> Result<String, String> {
    let numeric = |cell: &Cell| {
        cell.as_f64()
            .ok_or_else(|| format!("invalid value for format '%{}': '{}'", directive.conv, cell))
    };

    let body = match directive.conv {
        's' => {
            let mut s = cell.to_string();
            if let Some(precision) = directive.precision {
                s = s.chars().take(precision).collect();
            }
            return Ok(pad_text(s, directive));
        }
        'd' | 'i' | 'u' => {
            let n = numeric(cell)?.trunc() as i64;
            signed_body(n < 0, n.unsigned_abs().to_string(), directive)
        }
        'x' => format!("{:x}", numeric(cell)?.trunc() as i64),
        'X' => format!("{:X}", numeric(cell)?.trunc() as i64),
        'o' => format!("{:o}", numeric(cell)?.trunc() as i64),
        'f' => {
            let v = numeric(cell)?;
            let precision = directive.precision.unwrap_or(6);
            signed_body(
                v.is_sign_negative(),
                format!("{:.*}", precision, v.abs()),
                directive,
            )
        }
        'e' | 'E' => {
            let v = numeric(cell)?;
            let precision = directive.precision.unwrap_or(6);
            let s = c_style_exponent(format!("{:.*e}", precision, v.abs()));
            let s = if directive.conv == 'E' {
                s.to_uppercase()
            } else {
                s
            };
            signed_body(v.is_sign_negative(), s, directive)
        }
        'g' => {
            let v = numeric(cell)?;
            format!("{v}")
        }
        other => return Err(format!("unsupported format conversion '%{other}'")),
    };

    Ok(pad_number(body, directive))
}

fn signed_body(negative: bool, digits: String, directive: &Directive) -> String {
    let sign = if negative {
        "-"
    } else if directive.plus {
        "+"
    } else if directive.space {
        " "
    } else {
        ""
    };
    format!("{sign}{digits}")
}

/// Rewrite Rust's `1.5e3` exponent form into C's `1.5e+03`
fn c_style_exponent(formatted: String) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(rest) => ('-', rest),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

fn pad_text(s: String, directive: &Directive) -> String {
    // width counts characters, not bytes
    let length = s.chars().count();
    if length >= directive.width {
        return s;
    }
    let padding = " ".repeat(directive.width - length);
    if directive.minus {
        format!("{s}{padding}")
    } else {
        format!("{padding}{s}")
    }
}

fn pad_number(s: String, directive: &Directive) -> String {
    let length = s.chars().count();
    if length >= directive.width {
        return s;
    }
    if directive.zero && !directive.minus {
        // zeros go after the sign
        let fill = directive.width - length;
        let (sign, digits) = match s.strip_prefix(['-', '+', ' ']) {
            Some(rest) => (&s[..1], rest),
            None => ("", s.as_str()),
        };
        return format!("{sign}{}{digits}", "0".repeat(fill));
    }
    pad_text(s, directive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::table::Cell;

    #[test]
    fn test_float_precision() {
        assert_eq!(sprintf("%.2f", &Cell::Number(3.14159)).unwrap(), "3.14");
        assert_eq!(sprintf("%.0f", &Cell::Number(2.7)).unwrap(), "3");
    }

    #[test]
    fn test_integer() {
        assert_eq!(sprintf("%d", &Cell::Number(42.9)).unwrap(), "42");
        assert_eq!(sprintf("%5d", &Cell::Number(42.0)).unwrap(), "   42");
        assert_eq!(sprintf("%05d", &Cell::Number(-42.0)).unwrap(), "-0042");
        assert_eq!(sprintf("%+d", &Cell::Number(42.0)).unwrap(), "+42");
    }

    #[test]
    fn test_string() {
        assert_eq!(sprintf("%s ms", &Cell::Number(5.0)).unwrap(), "5 ms");
        assert_eq!(sprintf("%-6s|", &Cell::from("ab")).unwrap(), "ab    |");
        assert_eq!(sprintf("%.2s", &Cell::from("abcd")).unwrap(), "ab");
    }

    #[test]
    fn test_width_counts_characters_not_bytes() {
        // "été" is three characters but five bytes
        assert_eq!(sprintf("%5s", &Cell::from("été")).unwrap(), "  été");
        assert_eq!(sprintf("%-5s|", &Cell::from("été")).unwrap(), "été  |");
    }

    #[test]
    fn test_hex_and_octal() {
        assert_eq!(sprintf("%x", &Cell::Number(255.0)).unwrap(), "ff");
        assert_eq!(sprintf("%X", &Cell::Number(255.0)).unwrap(), "FF");
        assert_eq!(sprintf("%o", &Cell::Number(8.0)).unwrap(), "10");
    }

    #[test]
    fn test_exponent() {
        assert_eq!(sprintf("%.2e", &Cell::Number(1234.5)).unwrap(), "1.23e+03");
        assert_eq!(sprintf("%.1E", &Cell::Number(0.042)).unwrap(), "4.2E-02");
    }

    #[test]
    fn test_percent_literal() {
        assert_eq!(sprintf("%d%%", &Cell::Number(95.0)).unwrap(), "95%");
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let err = sprintf("%d", &Cell::from("abc")).unwrap_err();
        assert!(err.contains("invalid value"));
        assert!(err.contains("abc"));
    }

    #[test]
    fn test_format_columns_positional() {
        let table = Table::new(
            vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]],
            vec![vec![Cell::Number(1.234), Cell::Number(2.0), Cell::Number(3.0)]],
        );
        let result = format_columns(table, "%.1f,,%d s");
        assert_eq!(result.content[0][0], Cell::from("1.2"));
        // empty entry leaves the column untouched
        assert_eq!(result.content[0][1], Cell::Number(2.0));
        assert_eq!(result.content[0][2], Cell::from("3 s"));
    }

    #[test]
    fn test_format_columns_error_becomes_cell_text() {
        let table = Table::new(vec![], vec![vec![Cell::from("n/a")]]);
        let result = format_columns(table, "%.2f");
        match &result.content[0][0] {
            Cell::Text(s) => assert!(s.contains("invalid value")),
            other => panic!("expected error text, got {other:?}"),
        }
    }
}
