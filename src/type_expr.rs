//! Type-expression grammar.
//!
//! ```text
//! expr := '*' expr | '[]' expr | 'map[string]' expr | Name
//! ```
//!
//! Inline modifiers written after the expression inside an annotation's braces
//! (`enum:"a,b"`, `default=...`) are not part of the grammar and are cut off
//! with [`strip_modifiers`] before parsing.
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static RE_MODIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(?:enum|default)\s*[:=]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Pointer(Box<TypeExpr>),
    Array(Box<TypeExpr>),
    /// Keys are always strings.
    Map(Box<TypeExpr>),
    Named(String),
}

impl TypeExpr {
    /// Parses an annotation's type block, ignoring trailing modifiers.
    pub fn parse(src: &str) -> Result<Self> {
        parse_at(src, strip_modifiers(src))
    }

    /// Innermost name, e.g. `Foo` for `*[]map[string]Foo`.
    pub fn base(&self) -> &str {
        match self {
            Self::Pointer(inner) | Self::Array(inner) | Self::Map(inner) => inner.base(),
            Self::Named(name) => name,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }

    /// Drops one leading pointer, if any.
    pub fn strip_pointer(&self) -> &TypeExpr {
        match self {
            Self::Pointer(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::Array(inner) => write!(f, "[]{inner}"),
            Self::Map(inner) => write!(f, "map[string]{inner}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// The type part of a braced block: `string enum:"a,b"` → `string`.
pub fn strip_modifiers(block: &str) -> &str {
    let block = block.trim();
    match RE_MODIFIER.find(block) {
        Some(m) => block[..m.start()].trim(),
        None => block,
    }
}

fn parse_at(whole: &str, src: &str) -> Result<TypeExpr> {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix('*') {
        return Ok(TypeExpr::Pointer(Box::new(parse_at(whole, rest)?)));
    }
    if let Some(rest) = src.strip_prefix("[]") {
        return Ok(TypeExpr::Array(Box::new(parse_at(whole, rest)?)));
    }
    if let Some(rest) = src.strip_prefix("map[") {
        let Some(close) = rest.find(']') else {
            return Err(invalid(whole, "unterminated map key"));
        };
        let key = rest[..close].trim();
        if key != "string" {
            return Err(invalid(whole, format!("unsupported map key type `{key}`")));
        }
        return Ok(TypeExpr::Map(Box::new(parse_at(whole, &rest[close + 1..])?)));
    }
    if src.is_empty() {
        return Err(invalid(whole, "missing type name"));
    }
    if let Some(c) = src
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(invalid(whole, format!("unexpected character `{c}`")));
    }
    Ok(TypeExpr::Named(src.to_string()))
}

fn invalid(expr: &str, reason: impl Into<String>) -> Error {
    Error::TypeExpr {
        expr: expr.trim().to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Box<TypeExpr> {
        Box::new(TypeExpr::Named(name.to_string()))
    }

    #[test]
    fn parses_nested_wrappers() {
        let expr = TypeExpr::parse("*[]map[string]Foo").unwrap();
        assert_eq!(
            expr,
            TypeExpr::Pointer(Box::new(TypeExpr::Array(Box::new(TypeExpr::Map(named("Foo"))))))
        );
        assert_eq!(expr.base(), "Foo");
        assert_eq!(expr.to_string(), "*[]map[string]Foo");
    }

    #[test]
    fn tolerates_spaces_and_modifiers() {
        assert_eq!(
            TypeExpr::parse("map[string] database").unwrap(),
            TypeExpr::Map(named("database"))
        );
        assert_eq!(
            TypeExpr::parse(r#"string enum:"a,b""#).unwrap(),
            TypeExpr::Named("string".into())
        );
        assert_eq!(strip_modifiers("[]int default=[1, 2]"), "[]int");
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(TypeExpr::parse("").is_err());
        assert!(TypeExpr::parse("[]").is_err());
        assert!(TypeExpr::parse("map[int]string").is_err());
        assert!(TypeExpr::parse("map[string").is_err());
        let err = TypeExpr::parse("foo bar").unwrap_err();
        assert!(err.to_string().contains("unexpected character"), "{err}");
    }

    #[test]
    fn strip_pointer_only_removes_one_level() {
        let expr = TypeExpr::parse("**int").unwrap();
        assert!(expr.is_pointer());
        assert!(expr.strip_pointer().is_pointer());
    }
}
