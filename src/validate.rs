//! Checks a values document against the declared parameters and types.
//!
//! Every top-level key must be a parameter, and every key inside a value of a
//! named type must be one of that type's fields. Arrays and maps recurse into
//! their elements, pointers are transparent, and primitive or semantic leaves
//! (including `object`) accept anything below them. All issues are collected
//! before failing.
use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Error, Result, ValidationIssue};
use crate::graph::NodeId;
use crate::ir::ResolvedType;
use crate::resolve::{Resolver, Unresolved};

pub fn validate(resolver: &Resolver<'_>, values: &Value) -> Result<()> {
    let mut validator = Validator {
        resolver,
        issues: Vec::new(),
        reported: HashSet::new(),
    };
    if let Value::Object(map) = values {
        for (key, value) in sorted(map) {
            match resolver.graph().param(key) {
                Some(id) => validator.check_node(id, key, value),
                None => validator
                    .issues
                    .push(ValidationIssue::UnknownParameter(key.clone())),
            }
        }
    }
    if validator.issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(validator.issues))
    }
}

struct Validator<'r, 'g> {
    resolver: &'r Resolver<'g>,
    issues: Vec<ValidationIssue>,
    /// Types already reported as having no schema.
    reported: HashSet<String>,
}

impl Validator<'_, '_> {
    fn check_node(&mut self, id: NodeId, path: &str, value: &Value) {
        match self.resolver.resolve_node(id) {
            Ok(ty) => self.check(&ty, path, value),
            Err(Unresolved(name)) => {
                if self.reported.insert(name.clone()) {
                    self.issues.push(ValidationIssue::NoSchema {
                        name,
                        path: path.to_string(),
                    });
                }
            }
        }
    }

    fn check(&mut self, ty: &ResolvedType, path: &str, value: &Value) {
        match ty {
            ResolvedType::Pointer(inner) => self.check(inner, path, value),
            ResolvedType::Array(elem) => {
                if let Value::Array(items) = value {
                    for (i, item) in items.iter().enumerate() {
                        self.check(elem, &format!("{path}[{i}]"), item);
                    }
                }
            }
            ResolvedType::Map(elem) => {
                if let Value::Object(map) = value {
                    for (key, item) in sorted(map) {
                        self.check(elem, &format!("{path}.{key}"), item);
                    }
                }
            }
            ResolvedType::Named(named) => {
                let Value::Object(map) = value else {
                    return;
                };
                let graph = self.resolver.graph();
                for (key, item) in sorted(map) {
                    let field_path = format!("{path}.{key}");
                    match graph.child(named.node, key) {
                        Some(child) => self.check_node(child, &field_path, item),
                        None => self.issues.push(ValidationIssue::UndeclaredField(field_path)),
                    }
                }
            }
            ResolvedType::Primitive(_)
            | ResolvedType::StringFormat(_)
            | ResolvedType::Semantic(_)
            | ResolvedType::Enum(_) => {}
        }
    }
}

fn sorted(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}
