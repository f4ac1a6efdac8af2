//! Error types shared by every pipeline stage.
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Type names referenced by some annotation that never got fields or enum values.
    #[error("undefined types: {}", .0.join(", "))]
    UndefinedTypes(Vec<String>),

    #[error("{}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("invalid type expression `{expr}`: {reason}")]
    TypeExpr { expr: String, reason: String },

    #[error("failed to parse values at `{path}`: {message}")]
    Values { path: String, message: String },

    #[error("schema compiler failed for {}: {message}", .path.display())]
    Compiler { path: PathBuf, message: String },

    #[error("schema document: {0}")]
    Schema(String),

    #[error("{heading} section not found")]
    SectionNotFound { heading: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One problem found while checking a values document against the declared parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("parameter '{0}' is not defined in schema")]
    UnknownParameter(String),
    #[error("field '{0}' is not defined in schema")]
    UndeclaredField(String),
    #[error("type '{name}' referenced at '{path}' has no schema")]
    NoSchema { name: String, path: String },
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
