//! Variables and template substitution
//!
//! Everything a report needs to carry values from a dashboard into queries
//! and documents:
//!
//! - **Variable**: named or anonymous value carrier with format-aware
//!   stringification (13+ output formats with exact escaping rules)
//! - **VariableCollection**: per-query keyed variable map with allow-listed
//!   two-tier attribute merging
//! - **substitute**: bounded multi-pass `$name` / `${name:format}`
//!   placeholder replacement
//!
//! # Examples
//!
//! ```rust
//! use dashreport::variables::{substitute, Variable, VariableCollection};
//!
//! let mut vars = VariableCollection::new();
//! vars.insert("var-env", Variable::new_multi(vec!["prod".into(), "staging".into()]).with_name("env"));
//!
//! let sql = substitute("SELECT * FROM t WHERE env IN (${env:sqlstring})", &vars);
//! assert_eq!(sql, "SELECT * FROM t WHERE env IN ('prod','staging')");
//! ```

mod collection;
mod format;
mod substitute;
mod variable;

pub use collection::VariableCollection;
pub use substitute::substitute;
pub use variable::{
    CurrentSelection, OneOrMany, Variable, VariableDefinition, VariableOption, VariableValue,
    ALL_SENTINEL,
};
