//! Transform pipeline driver
//!
//! Chains the four result transformations in their fixed, documented order:
//!
//! ```text
//! format -> replace_values -> filter_columns -> transpose
//! ```
//!
//! Each stage runs only when its control variable is present and truthy, so
//! report authors opt in per stage. The stages are pure functions over the
//! in-memory table; nothing here performs I/O or touches shared state.

use crate::transform::error::TransformResult;
use crate::transform::format::format_columns;
use crate::transform::replace::{replace_values, ReplaceSpec};
use crate::transform::table::{Cell, Table};
use crate::variables::VariableCollection;

/// Run all requested transform stages over a table.
///
/// Replace-value specs are parsed and validated up front; a malformed rule
/// aborts before any row is modified.
pub fn apply(mut table: Table, variables: &VariableCollection) -> TransformResult<Table> {
    if let Some(spec) = variables.option_value("format") {
        table = format_columns(table, &spec);
    }

    // validate every spec before the first one touches a row
    let mut specs = Vec::new();
    for (key, variable) in variables.iter() {
        if key == "replace_values" || key.starts_with("replace_values_") {
            let value = variable.raw_value_string();
            if value.is_empty() {
                continue;
            }
            specs.push(ReplaceSpec::parse(key, &value)?);
        }
    }
    for spec in &specs {
        table = replace_values(table, spec);
    }

    if let Some(names) = variables.option_value("filter_columns") {
        table = filter_columns(table, &names);
    }

    if variables.option_value("transpose").as_deref() == Some("true") {
        table = transpose(table);
    }

    Ok(table)
}

/// Remove the named columns from every header row and every content row.
/// Names are matched against the title row; unknown names are ignored.
pub fn filter_columns(mut table: Table, names: &str) -> Table {
    let Some(titles) = table.column_titles() else {
        return table;
    };

    let mut indices: Vec<usize> = names
        .split(',')
        .filter_map(|name| titles.iter().position(|title| title == name))
        .collect();
    indices.sort_unstable();
    indices.dedup();
    tracing::debug!(removed = indices.len(), "filtering columns");

    // remove back to front so earlier indices stay valid
    for &index in indices.iter().rev() {
        for row in &mut table.header {
            if index < row.len() {
                row.remove(index);
            }
        }
        for row in &mut table.content {
            if index < row.len() {
                row.remove(index);
            }
        }
    }
    table
}

/// Swap rows and columns of the content. The header is left untouched by
/// design; callers relying on header-to-column alignment afterwards must
/// recompute it themselves.
pub fn transpose(mut table: Table) -> Table {
    let rows = table.content.len();
    let columns = table.content.first().map(Vec::len).unwrap_or(0);

    let mut transposed: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows); columns];
    for row in table.content {
        for (index, cell) in row.into_iter().enumerate() {
            if let Some(target) = transposed.get_mut(index) {
                target.push(cell);
            }
        }
    }
    table.content = transposed;
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::error::TransformError;
    use crate::variables::Variable;

    fn sample_table() -> Table {
        Table::new(
            vec![vec![
                "host".to_string(),
                "cpu".to_string(),
                "memory".to_string(),
            ]],
            vec![
                vec![Cell::from("web-1"), Cell::Number(5.0), Cell::Number(10.0)],
                vec![Cell::from("web-2"), Cell::Number(20.0), Cell::Number(30.0)],
            ],
        )
    }

    fn vars(items: &[(&str, &str)]) -> VariableCollection {
        let mut vars = VariableCollection::new();
        for (key, value) in items {
            vars.insert(*key, Variable::new(*value));
        }
        vars
    }

    #[test]
    fn test_all_stages_absent_is_identity() {
        let table = sample_table();
        let result = apply(table.clone(), &VariableCollection::new()).unwrap();
        assert_eq!(result, table);
    }

    #[test]
    fn test_filter_columns_by_name() {
        let result = filter_columns(sample_table(), "cpu");
        assert_eq!(result.column_titles().unwrap(), ["host", "memory"]);
        assert_eq!(
            result.content[0],
            vec![Cell::from("web-1"), Cell::Number(10.0)]
        );
    }

    #[test]
    fn test_filter_unknown_names_ignored() {
        let table = sample_table();
        let result = filter_columns(table.clone(), "nonexistent");
        assert_eq!(result, table);
    }

    #[test]
    fn test_filter_empty_list_is_identity() {
        let table = sample_table();
        let result = filter_columns(table.clone(), "");
        assert_eq!(result, table);
    }

    #[test]
    fn test_transpose_content_only() {
        let result = transpose(sample_table());
        // header untouched by design
        assert_eq!(result.column_titles().unwrap(), ["host", "cpu", "memory"]);
        assert_eq!(
            result.content,
            vec![
                vec![Cell::from("web-1"), Cell::from("web-2")],
                vec![Cell::Number(5.0), Cell::Number(20.0)],
                vec![Cell::Number(10.0), Cell::Number(30.0)],
            ]
        );
    }

    #[test]
    fn test_transpose_roundtrip() {
        let table = sample_table();
        let result = transpose(transpose(table.clone()));
        assert_eq!(result, table);
    }

    #[test]
    fn test_stage_order_format_before_replace() {
        // format renders 5.0 as "5.0", then replace matches the formatted text
        let variables = vars(&[
            ("format", ",%.1f"),
            ("replace_values_2", "5.0:low"),
            ("transpose", "false"),
        ]);
        let result = apply(sample_table(), &variables).unwrap();
        assert_eq!(result.content[0][1], Cell::from("low"));
        assert_eq!(result.content[1][1], Cell::from("20.0"));
    }

    #[test]
    fn test_filter_runs_before_transpose() {
        let variables = vars(&[("filter_columns", "memory"), ("transpose", "true")]);
        let result = apply(sample_table(), &variables).unwrap();
        // two remaining columns become two rows
        assert_eq!(result.content.len(), 2);
        assert_eq!(
            result.content[0],
            vec![Cell::from("web-1"), Cell::from("web-2")]
        );
    }

    #[test]
    fn test_malformed_replace_spec_aborts() {
        let variables = vars(&[("replace_values", "no-colon-here")]);
        assert!(matches!(
            apply(sample_table(), &variables),
            Err(TransformError::MalformedReplaceRule(_))
        ));
    }

    #[test]
    fn test_row_length_invariant_through_pipeline() {
        let variables = vars(&[("format", "%s"), ("filter_columns", "cpu")]);
        let result = apply(sample_table(), &variables).unwrap();
        let titles = result.column_titles().unwrap().len();
        for row in &result.content {
            assert_eq!(row.len(), titles);
        }
    }
}
