//! Type graph for one configuration file.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Parameters,
//! typedefs, enums and implicit placeholders share the root namespace, keyed
//! by their lowercased name; fields hang off the type nodes they belong to.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Result;
use crate::ir;
use crate::scan::{Diagnostic, Kind, RawAnnotation};
use crate::type_expr::TypeExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultSource {
    /// Written as `name=value` in the annotation.
    Annotation,
    /// Observed in the configuration document itself.
    Sample,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultValue {
    pub text: String,
    pub source: DefaultSource,
}

/// What an `@enum` line and its `@value` lines declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub base: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeNode {
    /// Source spelling. A parameter's own spelling wins when it shares the node with a type.
    pub name: String,
    pub is_param: bool,
    pub declared_typedef: bool,
    /// Kept apart from the scalar fields so a parameter sharing the node cannot erase it.
    pub enum_decl: Option<EnumDecl>,
    /// Type block as written (modifiers included).
    pub raw_type: String,
    pub type_expr: Option<TypeExpr>,
    /// Inline `enum:"a,b"` constraint.
    pub enums: Vec<String>,
    pub default: Option<DefaultValue>,
    /// Description of the node as a member (parameter or field).
    pub comment: String,
    /// Description from `@typedef`/`@enum`.
    pub doc: String,
    pub optional: bool,
    /// Back-reference for path reconstruction only.
    pub parent: Option<NodeId>,
    pub children: BTreeMap<String, NodeId>,
}

impl TypeNode {
    pub fn annotation_default(&self) -> Option<&str> {
        self.default
            .as_ref()
            .filter(|d| d.source == DefaultSource::Annotation)
            .map(|d| d.text.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    /// Normalized name → root-level node.
    index: HashMap<String, NodeId>,
    /// Parameters in declaration order.
    params: Vec<NodeId>,
    /// Fields that landed on a type nothing refers to.
    diagnostics: Vec<Diagnostic>,
}

/// Root-namespace key: `myType` and `MyType` are the same name.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

// ————————————————————————————————————————————————————————————————————————————
// BUILD
// ————————————————————————————————————————————————————————————————————————————

impl TypeGraph {
    pub fn new() -> Self {
        let root = TypeNode {
            name: "Config".to_string(),
            ..TypeNode::default()
        };
        Self {
            nodes: vec![root],
            index: HashMap::new(),
            params: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Builds the graph in two passes: declarations first, then fields, whose
    /// parent names go through the alias map of every `@param`.
    pub fn build(rows: &[RawAnnotation]) -> Result<Self> {
        let mut graph = Self::new();
        let mut fields = Vec::new();
        for row in rows {
            let Some(name) = row.path.first() else {
                continue;
            };
            match row.kind {
                Kind::Param => {
                    let id = graph.ensure_root(name);
                    let node = &mut graph.nodes[id.0];
                    node.is_param = true;
                    node.name = name.clone();
                    if !graph.params.contains(&id) {
                        graph.params.push(id);
                    }
                    graph.assign(id, row)?;
                }
                Kind::Typedef => {
                    let id = graph.ensure_root(name);
                    let node = &mut graph.nodes[id.0];
                    node.declared_typedef = true;
                    node.doc = row.description.clone();
                }
                Kind::Enum => {
                    let id = graph.ensure_root(name);
                    let node = &mut graph.nodes[id.0];
                    node.doc = row.description.clone();
                    node.enum_decl = Some(EnumDecl {
                        base: row.type_expr.clone(),
                        values: row.enum_values.clone(),
                    });
                }
                Kind::Field => fields.push(row),
            }
        }

        let aliases = graph.alias_map();
        let mut placed = Vec::new();
        for row in fields {
            let [parent, field] = row.path.as_slice() else {
                continue;
            };
            let parent = graph.field_parent(parent, &aliases);
            let id = graph.ensure_child(parent, field);
            graph.assign(id, row)?;
            placed.push((row, parent));
        }
        graph.diagnostics = graph.unreferenced_fields(&placed);
        Ok(graph)
    }

    fn ensure_root(&mut self, name: &str) -> NodeId {
        let key = normalize(name);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let root = self.root();
        let id = self.push(name, root);
        self.nodes[root.0].children.insert(key.clone(), id);
        self.index.insert(key, id);
        id
    }

    fn ensure_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(id) = self.nodes[parent.0].children.get(name) {
            return *id;
        }
        let id = self.push(name, parent);
        self.nodes[parent.0].children.insert(name.to_string(), id);
        id
    }

    fn push(&mut self, name: &str, parent: NodeId) -> NodeId {
        self.nodes.push(TypeNode {
            name: name.to_string(),
            parent: Some(parent),
            ..TypeNode::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Copies an annotation's scalar fields onto a node (last write wins, children kept)
    /// and creates placeholders for the type names it mentions.
    fn assign(&mut self, id: NodeId, row: &RawAnnotation) -> Result<()> {
        let expr = TypeExpr::parse(&row.type_expr)?;
        let base = expr.base().to_string();
        let node = &mut self.nodes[id.0];
        node.raw_type = row.type_expr.clone();
        node.type_expr = Some(expr);
        node.comment = row.description.clone();
        node.enums = row.enum_values.clone();
        node.optional = row.optional;
        if !row.default.is_empty() {
            node.default = Some(DefaultValue {
                text: row.default.clone(),
                source: DefaultSource::Annotation,
            });
        }
        if !ir::is_builtin_name(&base) {
            self.ensure_root(&base);
        }
        Ok(())
    }

    /// `param name → type name` for every parameter typed by a non-builtin name other than its own.
    fn alias_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .filter_map(|id| {
                let node = self.node(*id);
                let base = node.type_expr.as_ref()?.base();
                let key = normalize(&node.name);
                (!ir::is_builtin_name(base) && normalize(base) != key)
                    .then(|| (key, base.to_string()))
            })
            .collect()
    }

    /// Node that fields written as `parent.x` belong to. Explicitly declared
    /// types are taken as-is; a parameter name is followed one hop to the
    /// node its type names, which is the node the resolver will pick.
    fn field_parent(&mut self, parent: &str, aliases: &HashMap<String, String>) -> NodeId {
        let declared = self
            .lookup(parent)
            .is_some_and(|id| self.node(id).declared_typedef || self.node(id).enum_decl.is_some());
        let name = match aliases.get(&normalize(parent)) {
            Some(target) if !declared => target.as_str(),
            _ => parent,
        };
        self.ensure_root(name)
    }

    /// Fields whose parent is neither declared, a parameter, nor named by any
    /// type expression. Usually a misspelled parent.
    fn unreferenced_fields(&self, placed: &[(&RawAnnotation, NodeId)]) -> Vec<Diagnostic> {
        let referenced: HashSet<String> = self
            .all()
            .filter_map(|id| self.node(id).type_expr.as_ref())
            .map(|expr| normalize(expr.base()))
            .collect();
        placed
            .iter()
            .filter(|(_, parent)| {
                let node = self.node(*parent);
                !(node.is_param
                    || node.declared_typedef
                    || node.enum_decl.is_some()
                    || referenced.contains(&normalize(&node.name)))
            })
            .map(|(row, parent)| Diagnostic {
                line: row.line,
                message: format!(
                    "field '{}' belongs to '{}', which no parameter or type references",
                    row.path.join("."),
                    self.node(*parent).name
                ),
            })
            .collect()
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// QUERIES
// ————————————————————————————————————————————————————————————————————————————

impl TypeGraph {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TypeNode {
        &mut self.nodes[id.0]
    }

    /// Root-namespace lookup, insensitive to case.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.index.get(&normalize(name)).copied()
    }

    /// Parameter whose key is exactly `key`.
    pub fn param(&self, key: &str) -> Option<NodeId> {
        self.lookup(key)
            .filter(|id| self.node(*id).is_param && self.node(*id).name == key)
    }

    /// Warnings raised while placing fields.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[NodeId] {
        &self.params
    }

    /// Parameters sorted by key.
    pub fn params_sorted(&self) -> Vec<NodeId> {
        let mut params = self.params.clone();
        params.sort_by(|a, b| self.node(*a).name.cmp(&self.node(*b).name));
        params
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id).children.get(name).copied()
    }

    /// Children in name order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.node(id).children.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Root-namespace nodes in normalized-name order.
    pub fn types(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children(self.root()).map(|(_, id)| id)
    }

    /// Every node except the root.
    pub fn all(&self) -> impl Iterator<Item = NodeId> {
        (1..self.nodes.len()).map(NodeId)
    }

    /// Dotted path from the root, e.g. `Backup.enabled`.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor.filter(|c| *c != self.root()) {
            parts.push(self.node(current).name.as_str());
            cursor = self.node(current).parent;
        }
        parts.reverse();
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan;

    fn build(src: &str) -> TypeGraph {
        TypeGraph::build(&scan(src).annotations).unwrap()
    }

    fn field_names(graph: &TypeGraph, type_name: &str) -> Vec<String> {
        let id = graph.lookup(type_name).unwrap();
        graph.children(id).map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn typedef_fields_and_param() {
        let graph = build(
            "
## @typedef {struct} Backup
## @field {bool} enabled
## @field {string} schedule
## @param {Backup} backup
",
        );
        let id = graph.lookup("Backup").unwrap();
        // param and type share one node
        assert_eq!(graph.param("backup"), Some(id));
        assert_eq!(field_names(&graph, "backup"), vec!["enabled", "schedule"]);
        assert_eq!(graph.path(graph.child(id, "enabled").unwrap()), "backup.enabled");
    }

    #[test]
    fn param_and_type_names_alias_the_same_node() {
        let via_type = build(
            "
## @param {fooType} myField
## @field {int} fooType.x
",
        );
        let via_param = build(
            "
## @param {fooType} myField
## @field {int} myField.x
",
        );
        for graph in [&via_type, &via_param] {
            assert_eq!(field_names(graph, "fooType"), vec!["x"]);
            let param = graph.param("myField").unwrap();
            assert!(graph.node(param).children.is_empty());
        }
    }

    #[test]
    fn declared_types_are_not_redirected() {
        let graph = build(
            "
## @typedef {struct} foo
## @field {int} a
## @param {bar} foo2
## @param {bar} foo
## @field {string} bar.b
",
        );
        // `foo` is a declared type, so its fields stay put
        assert_eq!(field_names(&graph, "foo"), vec!["a"]);
        assert_eq!(field_names(&graph, "bar"), vec!["b"]);
    }

    #[test]
    fn chained_aliases_take_a_single_hop() {
        let graph = build(
            "
## @param {settings} db
## @param {pgSettings} settings
## @field {string} pgSettings.port
## @field {string} db.host
",
        );
        // `db` is typed `settings`, so its fields land on the `settings` node
        assert_eq!(field_names(&graph, "settings"), vec!["host"]);
        assert_eq!(field_names(&graph, "pgSettings"), vec!["port"]);
        assert!(graph.node(graph.param("db").unwrap()).children.is_empty());
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn fields_on_unreferenced_types_are_reported() {
        let graph = build(
            "
## @typedef {struct} Backup
## @field {bool} enabled
## @param {Backup} backup
## @field {int} bakup.retention
",
        );
        assert_eq!(graph.diagnostics().len(), 1);
        assert_eq!(graph.diagnostics()[0].line, 5);
        assert!(graph.diagnostics()[0].message.contains("bakup.retention"));
    }

    #[test]
    fn implicit_placeholders_for_referenced_names() {
        let graph = build("## @param {map[string]*Database} databases\n## @param {[]int} ports\n");
        let placeholder = graph.lookup("database").unwrap();
        assert!(graph.node(placeholder).children.is_empty());
        assert!(!graph.node(placeholder).is_param);
        assert!(graph.lookup("int").is_none());
    }

    #[test]
    fn case_variants_share_a_node() {
        let graph = build("## @param {MyType} a\n## @field {int} myType.x\n");
        assert_eq!(graph.lookup("MyType"), graph.lookup("mytype"));
        assert_ne!(graph.lookup("MyType"), graph.lookup("my_type"));
        assert_eq!(field_names(&graph, "MYTYPE"), vec!["x"]);
    }

    #[test]
    fn redeclaration_overwrites_scalars_but_keeps_children() {
        let graph = build(
            "
## @param {int} replicas=2 - first
## @param {int} replicas - second
## @field {string} opts.a
## @param {opts} opts
",
        );
        let replicas = graph.node(graph.param("replicas").unwrap());
        assert_eq!(replicas.comment, "second");
        assert_eq!(replicas.annotation_default(), Some("2"));
        assert_eq!(graph.params().len(), 2);
        assert_eq!(field_names(&graph, "opts"), vec!["a"]);
    }

    #[test]
    fn enum_declarations_carry_values() {
        let graph = build("## @enum {string} Size\n## @value small\n## @value large\n## @param {Size} size\n");
        let size = graph.node(graph.lookup("size").unwrap());
        let decl = size.enum_decl.as_ref().unwrap();
        assert_eq!(decl.base, "string");
        assert_eq!(decl.values, vec!["small", "large"]);
        assert_eq!(size.name, "size");
    }

    #[test]
    fn bad_type_expressions_fail_the_build() {
        let rows = scan("## @param {map[int]string} broken\n").annotations;
        assert!(TypeGraph::build(&rows).is_err());
    }
}
