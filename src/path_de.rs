//! YAML deserialization with document-path context in error messages.
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Deserialize with the path of the failing node (e.g. `backup.enabled`) in the error.
pub fn from_yaml_str<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = serde_yaml::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        Error::Values {
            path,
            message: err.into_inner().to_string(),
        }
    })
}

/// The configuration document as a generic tree. A file made only of
/// comments and blank lines is an empty (null) document.
pub fn values_document(src: &str) -> Result<Value> {
    let has_content = src.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    });
    if !has_content {
        return Ok(Value::Null);
    }
    from_yaml_str(src)
}
