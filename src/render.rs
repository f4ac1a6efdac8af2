//! Renderers over a resolved, populated graph: Go declarations, schema
//! documents and documentation tables.
pub mod go;
pub mod readme;
pub mod schema;

use serde_json::Value;

pub const GROUP_NAME: &str = "values.helm.io";
pub const VERSION_NAME: &str = "v1alpha1";

/// Reads a default literal the way YAML would; `None` for text YAML rejects.
pub(crate) fn parse_literal(text: &str) -> Option<Value> {
    serde_yaml::from_str(text).ok()
}
