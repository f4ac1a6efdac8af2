//! Go type declarations with kubebuilder markers.
//!
//! The output is one file: the `Config` root object wrapping `ConfigSpec`
//! (one field per parameter), a struct per named type, enum types, and the
//! empty `Emptyobject` struct when referenced.
use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::error::Result;
use crate::graph::NodeId;
use crate::ir::{ResolvedType, SemanticAlias};
use crate::render::{GROUP_NAME, VERSION_NAME, parse_literal};
use crate::resolve::{EMPTY_OBJECT_TYPE, ROOT_SPEC_TYPE, ROOT_TYPE, Resolver, camel};
use crate::scan::literal::unquote;

const META_V1: (&str, &str) = ("k8s.io/apimachinery/pkg/apis/meta/v1", "metav1");
const RESOURCE: (&str, &str) = ("k8s.io/apimachinery/pkg/api/resource", "resource");
const RUNTIME: (&str, &str) = ("k8s.io/apimachinery/pkg/runtime", "k8sRuntime");

pub fn emit_go(resolver: &Resolver<'_>, package: &str) -> Result<String> {
    let mut emitter = GoEmitter {
        resolver,
        imports: BTreeMap::new(),
        empty_object: false,
        body: String::new(),
    };
    emitter.emit_root()?;
    for named in resolver.struct_types() {
        emitter.emit_struct(&named.ident, named.node)?;
    }
    for e in resolver.enum_types() {
        let doc = &resolver.graph().node(e.node).doc;
        if !doc.is_empty() {
            emitter.body.push_str(&format!("// {} {doc}\n", e.ident));
        }
        let values = quote_enums(&e.values);
        emitter
            .body
            .push_str(&format!("// +kubebuilder:validation:Enum={values}\n"));
        emitter
            .body
            .push_str(&format!("type {} {}\n\n", e.ident, e.base.name()));
    }
    if emitter.empty_object {
        emitter
            .body
            .push_str(&format!("type {EMPTY_OBJECT_TYPE} struct{{}}\n\n"));
    }
    Ok(emitter.finish(package))
}

struct GoEmitter<'r, 'g> {
    resolver: &'r Resolver<'g>,
    /// Import path → alias.
    imports: BTreeMap<&'static str, &'static str>,
    empty_object: bool,
    body: String,
}

impl GoEmitter<'_, '_> {
    fn emit_root(&mut self) -> Result<()> {
        self.import(META_V1);
        self.body.push_str(&format!(
            "type {ROOT_TYPE} struct {{\n\
             \tmetav1.TypeMeta   `json:\",inline\"`\n\
             \tmetav1.ObjectMeta `json:\"metadata,omitempty\"`\n\n\
             \tSpec {ROOT_SPEC_TYPE} `json:\"spec,omitempty\"`\n\
             }}\n\n"
        ));
        let params = self.resolver.graph().params_sorted();
        let fields: Vec<(String, NodeId)> = params
            .into_iter()
            .map(|id| (self.resolver.graph().node(id).name.clone(), id))
            .collect();
        self.emit_struct_fields(ROOT_SPEC_TYPE, &fields)
    }

    fn emit_struct(&mut self, ident: &str, id: NodeId) -> Result<()> {
        let graph = self.resolver.graph();
        let doc = &graph.node(id).doc;
        if !doc.is_empty() {
            self.body.push_str(&format!("// {ident} {doc}\n"));
        }
        let fields: Vec<(String, NodeId)> = graph
            .children(id)
            .map(|(name, child)| (name.to_string(), child))
            .collect();
        self.emit_struct_fields(ident, &fields)
    }

    fn emit_struct_fields(&mut self, ident: &str, fields: &[(String, NodeId)]) -> Result<()> {
        self.body.push_str(&format!("type {ident} struct {{\n"));
        let mut used = HashSet::new();
        for (name, id) in fields {
            let mut field = camel(name);
            if !field.starts_with(|c: char| c.is_ascii_alphabetic()) {
                field = format!("X{field}");
            }
            let base = field.clone();
            let mut n = 2;
            while !used.insert(field.clone()) {
                field = format!("{base}{n}");
                n += 1;
            }
            self.emit_field(&field, name, *id)?;
        }
        self.body.push_str("}\n\n");
        Ok(())
    }

    fn emit_field(&mut self, field: &str, key: &str, id: NodeId) -> Result<()> {
        let node = self.resolver.graph().node(id);
        let ty = self.resolver.resolve_node(id)?;
        let go_type = self.go_type(&ty);
        if !node.comment.is_empty() {
            self.body.push_str(&format!("\t// {}\n", node.comment));
        }
        if let ResolvedType::StringFormat(format) = ty.strip_pointer() {
            self.body
                .push_str(&format!("\t// +kubebuilder:validation:Format={format}\n"));
        }
        if !node.enums.is_empty() {
            self.body.push_str(&format!(
                "\t// +kubebuilder:validation:Enum={}\n",
                quote_enums(&node.enums)
            ));
        }
        if let Some(default) = node.default.as_ref().and_then(|d| go_default(&d.text, &ty)) {
            self.body
                .push_str(&format!("\t// +kubebuilder:default:={default}\n"));
        }
        let omit = matches!(
            ty,
            ResolvedType::Pointer(_) | ResolvedType::Array(_) | ResolvedType::Map(_)
        ) || node.optional;
        let omit = if omit { ",omitempty" } else { "" };
        self.body
            .push_str(&format!("\t{field} {go_type} `json:\"{key}{omit}\"`\n"));
        Ok(())
    }

    fn go_type(&mut self, ty: &ResolvedType) -> String {
        match ty {
            ResolvedType::Primitive(p) => p.name().to_string(),
            ResolvedType::StringFormat(_) => "string".to_string(),
            ResolvedType::Semantic(alias) => match alias {
                SemanticAlias::Quantity => self.qualified(RESOURCE, "Quantity"),
                SemanticAlias::Duration => self.qualified(META_V1, "Duration"),
                SemanticAlias::Time => self.qualified(META_V1, "Time"),
                SemanticAlias::Object => self.qualified(RUNTIME, "RawExtension"),
                SemanticAlias::EmptyObject => {
                    self.empty_object = true;
                    EMPTY_OBJECT_TYPE.to_string()
                }
            },
            ResolvedType::Pointer(inner) => format!("*{}", self.go_type(inner)),
            ResolvedType::Array(inner) => format!("[]{}", self.go_type(inner)),
            ResolvedType::Map(inner) => format!("map[string]{}", self.go_type(inner)),
            ResolvedType::Enum(e) => e.ident.clone(),
            ResolvedType::Named(named) => named.ident.clone(),
        }
    }

    fn qualified(&mut self, import: (&'static str, &'static str), name: &str) -> String {
        self.import(import);
        format!("{}.{name}", import.1)
    }

    fn import(&mut self, (path, alias): (&'static str, &'static str)) {
        self.imports.insert(path, alias);
    }

    fn finish(self, package: &str) -> String {
        let mut out = String::new();
        out.push_str("// +kubebuilder:object:generate=true\n");
        out.push_str("// +kubebuilder:object:root=true\n");
        out.push_str(&format!("// +groupName={GROUP_NAME}\n\n"));
        out.push_str(&format!("// +versionName={VERSION_NAME}\n\n"));
        out.push_str("// Code generated by values-gen. DO NOT EDIT.\n");
        out.push_str(&format!("package {package}\n\n"));
        if !self.imports.is_empty() {
            out.push_str("import (\n");
            for (path, alias) in &self.imports {
                out.push_str(&format!("\t{alias} \"{path}\"\n"));
            }
            out.push_str(")\n\n");
        }
        out.push_str(self.body.trim_end());
        out.push('\n');
        out
    }
}

/// `"a";"b"` as kubebuilder expects enum lists.
fn quote_enums(values: &[String]) -> String {
    values
        .iter()
        .map(|v| Value::String(v.clone()).to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Marker value for a default literal, or `None` when nothing should be emitted.
fn go_default(text: &str, ty: &ResolvedType) -> Option<String> {
    if matches!(ty.strip_pointer(), ResolvedType::Semantic(SemanticAlias::EmptyObject)) {
        return None;
    }
    if ty.is_string_like() {
        return Some(Value::String(unquote(text).to_string()).to_string());
    }
    match parse_literal(text) {
        Some(Value::Null) => None,
        Some(value) => Some(go_literal(&value)),
        None => Some(text.to_string()),
    }
}

/// Go composite-literal spelling: objects `{"k":v}` with sorted keys, arrays `{a,b}`.
fn go_literal(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), go_literal(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(go_literal).collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Null => "nil".to_string(),
        other => other.to_string(),
    }
}
