//! Type resolution: [`TypeExpr`] + graph → [`ResolvedType`].
//!
//! Also owns identifier assignment, so every renderer agrees on the emitted
//! name of each user type, and the undefined-type sweep that must pass before
//! anything is rendered.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Error;
use crate::graph::{NodeId, TypeGraph, normalize};
use crate::ir::{self, EnumRef, NamedRef, Primitive, ResolvedType, SemanticAlias};
use crate::type_expr::TypeExpr;

/// Names of the synthesized root wrapper types.
pub const ROOT_TYPE: &str = "Config";
pub const ROOT_SPEC_TYPE: &str = "ConfigSpec";
/// Emitted identifier of the `emptyobject` alias.
pub const EMPTY_OBJECT_TYPE: &str = "Emptyobject";
/// Prefix given to user types colliding with the root wrappers.
const COLLISION_PREFIX: &str = "Values";

/// A named reference with neither fields nor enum values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved(pub String);

impl From<Unresolved> for Error {
    fn from(value: Unresolved) -> Self {
        Error::UndefinedTypes(vec![value.0])
    }
}

/// `resources`, `request` and `limit` name a declared struct when one exists,
/// and free-form `object` otherwise.
pub fn is_contextual_object_alias(name: &str) -> bool {
    matches!(name, "resources" | "request" | "limit")
}

/// `max_connections` → `MaxConnections`.
pub fn camel(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

pub struct Resolver<'g> {
    graph: &'g TypeGraph,
    idents: HashMap<NodeId, String>,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self {
            graph,
            idents: assign_identifiers(graph),
        }
    }

    pub fn graph(&self) -> &'g TypeGraph {
        self.graph
    }

    /// Emitted identifier of a root-namespace node.
    pub fn ident(&self, id: NodeId) -> String {
        self.idents
            .get(&id)
            .cloned()
            .unwrap_or_else(|| camel(&self.graph.node(id).name))
    }

    pub fn resolve(&self, expr: &TypeExpr) -> Result<ResolvedType, Unresolved> {
        Ok(match expr {
            TypeExpr::Pointer(inner) => ResolvedType::Pointer(Box::new(self.resolve(inner)?)),
            TypeExpr::Array(inner) => ResolvedType::Array(Box::new(self.resolve(inner)?)),
            TypeExpr::Map(inner) => ResolvedType::Map(Box::new(self.resolve(inner)?)),
            TypeExpr::Named(name) => self.resolve_name(name)?,
        })
    }

    /// Type governing a node's own value.
    pub fn resolve_node(&self, id: NodeId) -> Result<ResolvedType, Unresolved> {
        let node = self.graph.node(id);
        match &node.type_expr {
            Some(expr) => self.resolve(expr),
            None if !node.children.is_empty() => Ok(self.named(id)),
            None => Err(Unresolved(node.name.clone())),
        }
    }

    fn resolve_name(&self, name: &str) -> Result<ResolvedType, Unresolved> {
        if let Some(p) = Primitive::from_name(name) {
            return Ok(ResolvedType::Primitive(p));
        }
        if let Some(format) = ir::string_format(name) {
            return Ok(ResolvedType::StringFormat(format));
        }
        if let Some(alias) = SemanticAlias::from_name(name) {
            return Ok(ResolvedType::Semantic(alias));
        }
        let node = self.graph.lookup(name);
        if is_contextual_object_alias(name) {
            return Ok(match node.filter(|id| self.has_fields(*id)) {
                Some(id) => self.named(id),
                None => ResolvedType::Semantic(SemanticAlias::Object),
            });
        }
        let Some(id) = node else {
            return Err(Unresolved(name.to_string()));
        };
        if let Some(decl) = &self.graph.node(id).enum_decl {
            if !decl.values.is_empty() {
                return Ok(ResolvedType::Enum(EnumRef {
                    node: id,
                    ident: self.ident(id),
                    base: Primitive::from_name(&decl.base).unwrap_or(Primitive::String),
                    values: decl.values.clone(),
                }));
            }
        }
        if self.has_fields(id) {
            return Ok(self.named(id));
        }
        Err(Unresolved(name.to_string()))
    }

    fn has_fields(&self, id: NodeId) -> bool {
        !self.graph.node(id).children.is_empty()
    }

    fn named(&self, id: NodeId) -> ResolvedType {
        ResolvedType::Named(NamedRef {
            node: id,
            ident: self.ident(id),
        })
    }

    /// Every type name some annotation references without it ever getting
    /// fields or enum values. Sorted, one entry per name.
    pub fn collect_undefined(&self) -> Vec<String> {
        let mut found = BTreeMap::<String, String>::new();
        for id in self.graph.all() {
            let Some(expr) = &self.graph.node(id).type_expr else {
                continue;
            };
            if let Err(Unresolved(name)) = self.resolve(expr) {
                found.entry(normalize(&name)).or_insert(name);
            }
        }
        let mut names: Vec<String> = found.into_values().collect();
        names.sort();
        names
    }

    /// Struct declarations, by identifier: named types reachable from a
    /// parameter or a declared typedef. Nodes that only resolve as `object`
    /// get none.
    pub fn struct_types(&self) -> Vec<NamedRef> {
        let mut reached = HashSet::new();
        for id in self.graph.params() {
            if let Ok(ty) = self.resolve_node(*id) {
                self.reach(&ty, &mut reached);
            }
        }
        for id in self.graph.types() {
            if self.graph.node(id).declared_typedef && self.has_fields(id) {
                self.reach(&self.named(id), &mut reached);
            }
        }
        let mut out: Vec<NamedRef> = self
            .graph
            .types()
            .filter(|id| {
                let node = self.graph.node(*id);
                reached.contains(id) && node.enum_decl.is_none() && !ir::is_builtin_name(&node.name)
            })
            .map(|id| NamedRef {
                node: id,
                ident: self.ident(id),
            })
            .collect();
        out.sort_by(|a, b| a.ident.cmp(&b.ident));
        out
    }

    fn reach(&self, ty: &ResolvedType, reached: &mut HashSet<NodeId>) {
        match ty {
            ResolvedType::Pointer(inner) | ResolvedType::Array(inner) | ResolvedType::Map(inner) => {
                self.reach(inner, reached)
            }
            ResolvedType::Named(named) => {
                if !reached.insert(named.node) {
                    return;
                }
                for (_, child) in self.graph.children(named.node) {
                    if let Ok(ty) = self.resolve_node(child) {
                        self.reach(&ty, reached);
                    }
                }
            }
            _ => {}
        }
    }

    /// Declared enums with at least one value, by identifier.
    pub fn enum_types(&self) -> Vec<EnumRef> {
        let mut out: Vec<EnumRef> = self
            .graph
            .types()
            .filter(|id| self.graph.node(*id).enum_decl.is_some())
            .filter_map(|id| match self.resolve_name(&self.graph.node(id).name) {
                Ok(ResolvedType::Enum(e)) => Some(e),
                _ => None,
            })
            .collect();
        out.sort_by(|a, b| a.ident.cmp(&b.ident));
        out
    }
}

/// One identifier per root-namespace type. Names that collide with
/// `Config`/`ConfigSpec` are prefixed after every other name is placed, so a
/// user's own `ValuesConfig` keeps its name; anything still taken gets a
/// numeric suffix.
fn assign_identifiers(graph: &TypeGraph) -> HashMap<NodeId, String> {
    let mut taken: HashSet<String> = [ROOT_TYPE, ROOT_SPEC_TYPE, EMPTY_OBJECT_TYPE]
        .into_iter()
        .map(str::to_string)
        .collect();
    let (mut plain, mut renamed) = (Vec::new(), Vec::new());
    // types() iterates in normalized-name order, which keeps suffixes stable
    for id in graph.types() {
        let node = graph.node(id);
        if node.children.is_empty() && node.enum_decl.is_none() {
            continue;
        }
        let mut base = camel(&node.name);
        if !base.starts_with(|c: char| c.is_ascii_alphabetic()) {
            base = format!("T{base}");
        }
        if base == ROOT_TYPE || base == ROOT_SPEC_TYPE {
            renamed.push((id, format!("{COLLISION_PREFIX}{base}")));
        } else {
            plain.push((id, base));
        }
    }
    let mut out = HashMap::new();
    for (id, base) in plain.into_iter().chain(renamed) {
        let mut ident = base.clone();
        let mut n = 2;
        while !taken.insert(ident.clone()) {
            ident = format!("{base}{n}");
            n += 1;
        }
        out.insert(id, ident);
    }
    out
}
