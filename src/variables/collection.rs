//! Per-query variable collection
//!
//! Maps string keys to variables. Dashboard template variables use the
//! `var-<name>` key convention; report options use bare names like `format`
//! or `filter_columns`. Merging attribute tiers produces a new collection,
//! so concurrent report runs never share mutable state.

use std::collections::BTreeMap;

use crate::variables::variable::{Variable, VariableValue};

/// Report option keys accepted by the attribute merge, besides `var-`
/// prefixed template variables and `replace_values` specs.
const ACCEPTED_OPTIONS: &[&str] = &[
    "format",
    "instant",
    "timeout",
    "from",
    "to",
    "from_timezone",
    "to_timezone",
    "filter_columns",
    "transpose",
    "column_divider",
    "row_divider",
    "include_headline",
    "result_type",
];

/// Ordered mapping from string key to [`Variable`], keys unique
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableCollection {
    vars: BTreeMap<String, Variable>,
}

impl VariableCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable under the given key
    pub fn insert(&mut self, key: impl Into<String>, variable: Variable) {
        self.vars.insert(key.into(), variable);
    }

    /// Look up a variable by exact key
    pub fn get(&self, key: &str) -> Option<&Variable> {
        self.vars.get(key)
    }

    /// Look up a variable by placeholder name, checking the `var-` prefixed
    /// key first and then the bare key
    pub fn placeholder(&self, name: &str) -> Option<&Variable> {
        self.vars
            .get(&format!("var-{name}"))
            .or_else(|| self.vars.get(name))
    }

    /// Raw string value of an option variable, if present and non-empty
    pub fn option_value(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.raw_value_string())
            .filter(|v| !v.is_empty())
    }

    /// Iterate keys and variables in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.vars.iter()
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Merge attribute tiers into a new collection.
    ///
    /// `document` attributes are applied first, `item` attributes override
    /// them (last write wins). Only allow-listed keys are accepted; a write
    /// to an existing variable replaces its raw value while preserving the
    /// option metadata, so "All" selections stay resolvable.
    pub fn merged_with(
        &self,
        document: &[(String, String)],
        item: &[(String, String)],
    ) -> VariableCollection {
        let mut merged = self.clone();
        for (key, value) in document.iter().chain(item.iter()) {
            if !is_accepted_key(key) {
                tracing::debug!(key = %key, "ignoring attribute not in variable allow-list");
                continue;
            }
            merged.assign(key, value);
        }
        merged
    }

    fn assign(&mut self, key: &str, value: &str) {
        match self.vars.get_mut(key) {
            Some(existing) => {
                existing.set_raw_value(VariableValue::Scalar(value.to_string()));
            }
            None => {
                let name = key.strip_prefix("var-").unwrap_or(key);
                self.vars
                    .insert(key.to_string(), Variable::new(value).with_name(name));
            }
        }
    }
}

/// True if the key names a template variable or a known report option
fn is_accepted_key(key: &str) -> bool {
    if key.starts_with("var-") {
        return true;
    }
    if ACCEPTED_OPTIONS.contains(&key) {
        return true;
    }
    // replace_values plus optional `_<digits>` column suffixes
    if let Some(rest) = key.strip_prefix("replace_values") {
        return rest.is_empty()
            || (rest.starts_with('_')
                && rest[1..]
                    .split('_')
                    .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::variable::{
        CurrentSelection, OneOrMany, VariableDefinition, VariableOption,
    };

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_placeholder_lookup_strips_var_prefix() {
        let mut vars = VariableCollection::new();
        vars.insert("var-host", Variable::new("web-1").with_name("host"));
        vars.insert("format", Variable::new("csv"));

        assert!(vars.placeholder("host").is_some());
        assert!(vars.placeholder("format").is_some());
        assert!(vars.placeholder("missing").is_none());
    }

    #[test]
    fn test_merge_priority_tiers() {
        let vars = VariableCollection::new();
        let document = pairs(&[("var-host", "doc-host"), ("format", "csv")]);
        let item = pairs(&[("var-host", "item-host")]);

        let merged = vars.merged_with(&document, &item);
        assert_eq!(
            merged.get("var-host").unwrap().raw_value_string(),
            "item-host"
        );
        assert_eq!(merged.get("format").unwrap().raw_value_string(), "csv");
    }

    #[test]
    fn test_merge_rejects_unknown_keys() {
        let vars = VariableCollection::new();
        let merged = vars.merged_with(&pairs(&[("render_width", "500")]), &[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_merge_accepts_replace_values_keys() {
        let vars = VariableCollection::new();
        let merged = vars.merged_with(
            &pairs(&[
                ("replace_values", "a:b"),
                ("replace_values_2", "c:d"),
                ("replace_values_x", "e:f"),
            ]),
            &[],
        );
        assert!(merged.get("replace_values").is_some());
        assert!(merged.get("replace_values_2").is_some());
        assert!(merged.get("replace_values_x").is_none());
    }

    #[test]
    fn test_merge_preserves_option_metadata() {
        let def = VariableDefinition {
            name: Some("env".to_string()),
            multi: false,
            options: vec![VariableOption::with_text("1", "prod")],
            query: None,
            current: Some(CurrentSelection {
                value: OneOrMany::One("1".to_string()),
                text: None,
            }),
        };
        let mut vars = VariableCollection::new();
        vars.insert("var-env", Variable::from_definition(&def));

        let merged = vars.merged_with(&pairs(&[("var-env", "1")]), &[]);
        let var = merged.get("var-env").unwrap();
        // Text re-derived from the preserved option list
        assert_eq!(var.text(), "prod");
    }

    #[test]
    fn test_merge_does_not_mutate_original() {
        let mut vars = VariableCollection::new();
        vars.insert("var-env", Variable::new("original"));

        let _ = vars.merged_with(&pairs(&[("var-env", "changed")]), &[]);
        assert_eq!(vars.get("var-env").unwrap().raw_value_string(), "original");
    }
}
