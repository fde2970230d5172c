//! Variable value carrier
//!
//! A [`Variable`] holds one named (or anonymous) value from a dashboard
//! template variable or a report option. Values are either scalar strings or
//! ordered sequences of strings; the display `text` is derived from the
//! backing option list whenever the raw value changes.

use serde::Deserialize;

/// Sentinel value the dashboard server stores for an "All" selection.
pub const ALL_SENTINEL: &str = "$__all";

/// Raw value of a variable: a single string or an ordered sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableValue {
    /// Single value
    Scalar(String),
    /// Ordered multi-value selection
    Multi(Vec<String>),
}

impl VariableValue {
    /// Stringified form (multi-values joined with commas)
    pub fn to_joined_string(&self) -> String {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Multi(values) => values.join(","),
        }
    }

    /// All values as a sequence (a scalar becomes a one-element sequence)
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::Scalar(v) => vec![v.clone()],
            Self::Multi(values) => values.clone(),
        }
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// One selectable option of a dashboard template variable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariableOption {
    /// Stored value
    pub value: String,
    /// Display text (defaults to the value)
    #[serde(default)]
    pub text: Option<String>,
}

impl VariableOption {
    /// Create an option whose text equals its value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: None,
        }
    }

    /// Create an option with distinct value and display text
    pub fn with_text(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: Some(text.into()),
        }
    }

    /// Display text, falling back to the value
    pub fn display_text(&self) -> &str {
        self.text.as_deref().unwrap_or(&self.value)
    }
}

/// A string or a list of strings, as the dashboard server serializes the
/// current selection of a template variable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single selection
    One(String),
    /// Multi selection
    Many(Vec<String>),
}

impl From<OneOrMany> for VariableValue {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(v) => VariableValue::Scalar(v),
            OneOrMany::Many(values) => VariableValue::Multi(values),
        }
    }
}

/// Currently selected value/text pair of a template variable
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentSelection {
    /// Selected value(s)
    pub value: OneOrMany,
    /// Display text of the selection
    #[serde(default)]
    pub text: Option<OneOrMany>,
}

/// Snapshot of a dashboard template variable definition, as supplied by the
/// dashboard metadata collaborator
#[derive(Debug, Clone, Deserialize)]
pub struct VariableDefinition {
    /// Variable name
    #[serde(default)]
    pub name: Option<String>,
    /// Explicit multi-select flag
    #[serde(default)]
    pub multi: bool,
    /// Selectable options
    #[serde(default)]
    pub options: Vec<VariableOption>,
    /// Backing query, used as fallback for dynamic "All" resolution
    #[serde(default)]
    pub query: Option<String>,
    /// Currently selected value
    #[serde(default)]
    pub current: Option<CurrentSelection>,
}

/// Named or anonymous value carrier with format-aware stringification
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: Option<String>,
    raw_value: VariableValue,
    text: String,
    multi: bool,
    options: Vec<VariableOption>,
    query: Option<String>,
}

impl Variable {
    /// Create an anonymous scalar variable from a bare value
    pub fn new(value: impl Into<String>) -> Self {
        let raw_value = VariableValue::Scalar(value.into());
        let text = raw_value.to_joined_string();
        Self {
            name: None,
            raw_value,
            text,
            multi: false,
            options: Vec::new(),
            query: None,
        }
    }

    /// Create an anonymous multi-value variable
    pub fn new_multi(values: Vec<String>) -> Self {
        let raw_value = VariableValue::Multi(values);
        let text = raw_value.to_joined_string();
        Self {
            name: None,
            raw_value,
            text,
            multi: true,
            options: Vec::new(),
            query: None,
        }
    }

    /// Build a variable from a dashboard template variable definition
    pub fn from_definition(def: &VariableDefinition) -> Self {
        let raw_value = def
            .current
            .as_ref()
            .map(|c| c.value.clone().into())
            .unwrap_or_else(|| VariableValue::Scalar(String::new()));

        let mut variable = Self {
            name: def.name.clone(),
            raw_value: VariableValue::Scalar(String::new()),
            text: String::new(),
            multi: def.multi,
            options: def.options.clone(),
            query: def.query.clone(),
        };
        variable.set_raw_value(raw_value);
        variable
    }

    /// Variable name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set or replace the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Raw value
    pub fn raw_value(&self) -> &VariableValue {
        &self.raw_value
    }

    /// Stringified raw value (multi-values joined with commas)
    pub fn raw_value_string(&self) -> String {
        self.raw_value.to_joined_string()
    }

    /// Display text of the current value
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True iff the raw value is a sequence or the explicit multi flag is set
    pub fn multi(&self) -> bool {
        self.multi || matches!(self.raw_value, VariableValue::Multi(_))
    }

    /// Backing option list
    pub fn options(&self) -> &[VariableOption] {
        &self.options
    }

    /// Backing query, used as fallback for dynamic "All" resolution
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Replace the raw value, re-deriving the display text from a matching
    /// option or falling back to the stringified value
    pub fn set_raw_value(&mut self, value: impl Into<VariableValue>) {
        let value = value.into();
        self.text = self.derive_text(&value);
        self.raw_value = value;
    }

    fn derive_text(&self, value: &VariableValue) -> String {
        if let VariableValue::Scalar(v) = value {
            if let Some(option) = self.options.iter().find(|o| &o.value == v) {
                return option.display_text().to_string();
            }
        }
        value.to_joined_string()
    }

    /// True if the current selection is the dashboard "All" choice
    pub(crate) fn is_all_selection(&self) -> bool {
        match &self.raw_value {
            VariableValue::Scalar(v) => v == "All" || v == ALL_SENTINEL || self.text == "All",
            VariableValue::Multi(values) => {
                values.len() == 1 && (values[0] == "All" || values[0] == ALL_SENTINEL)
            }
        }
    }
}
