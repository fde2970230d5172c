//! Tabular result shape
//!
//! All datasource queries normalize to `{header, content}`: the header is an
//! ordered sequence of column-name rows (row 0 carries the titles), the
//! content an ordered sequence of rows with heterogeneous cells. Every
//! pipeline stage maintains the invariant that all content rows have equal
//! length, matching the title row when a header is present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of a tabular result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Missing value
    Null,
    /// Numeric value
    Number(f64),
    /// Textual value
    Text(String),
}

impl Cell {
    /// Numeric view of the cell, coercing numeric-looking text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Null => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => {
                // whole numbers print without a trailing .0
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Tabular query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column name rows; row 0 carries the column titles
    #[serde(default)]
    pub header: Vec<Vec<String>>,
    /// Data rows, all of equal length
    #[serde(default)]
    pub content: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table from a header and content rows
    pub fn new(header: Vec<Vec<String>>, content: Vec<Vec<Cell>>) -> Self {
        Self { header, content }
    }

    /// Create an empty table
    pub fn empty() -> Self {
        Self::default()
    }

    /// Column titles (header row 0), if a header is present
    pub fn column_titles(&self) -> Option<&[String]> {
        self.header.first().map(|row| row.as_slice())
    }

    /// Number of content rows
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if there are no content rows
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// First cell of the first row, for single-value result coercion
    pub fn single_value(&self) -> Option<&Cell> {
        self.content.first().and_then(|row| row.first())
    }

    /// Content rows with every cell stringified
    pub fn rows_as_strings(&self) -> Vec<Vec<String>> {
        self.content
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(5.0).to_string(), "5");
        assert_eq!(Cell::Number(5.5).to_string(), "5.5");
        assert_eq!(Cell::Text("a".to_string()).to_string(), "a");
        assert_eq!(Cell::Null.to_string(), "");
    }

    #[test]
    fn test_cell_numeric_coercion() {
        assert_eq!(Cell::Number(3.0).as_f64(), Some(3.0));
        assert_eq!(Cell::Text(" 4.5 ".to_string()).as_f64(), Some(4.5));
        assert_eq!(Cell::Text("abc".to_string()).as_f64(), None);
        assert_eq!(Cell::Null.as_f64(), None);
    }

    #[test]
    fn test_table_deserialization() {
        let json = r#"{
            "header": [["time", "value"]],
            "content": [[1595962683000.0, 7.5], ["2020-07-28", null]]
        }"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.column_titles().unwrap(), ["time", "value"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.content[1][1], Cell::Null);
    }

    #[test]
    fn test_single_value() {
        let table = Table::new(vec![], vec![vec![Cell::from(42.0), Cell::from("x")]]);
        assert_eq!(table.single_value(), Some(&Cell::Number(42.0)));
        assert_eq!(Table::empty().single_value(), None);
    }
}
