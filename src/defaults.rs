//! Copies values observed in the configuration document onto graph nodes as
//! defaults. Annotation defaults always win; samples only fill gaps.
use serde_json::{Map, Value};

use crate::graph::{DefaultSource, DefaultValue, NodeId, TypeGraph};
use crate::ir;
use crate::type_expr::TypeExpr;

pub fn populate(graph: &mut TypeGraph, values: &Value) {
    let Value::Object(map) = values else {
        return;
    };
    let root = graph.root();
    populate_children(graph, root, map, &mut Vec::new());
}

fn populate_children(
    graph: &mut TypeGraph,
    owner: NodeId,
    map: &Map<String, Value>,
    stack: &mut Vec<NodeId>,
) {
    for (key, value) in map {
        let child = if owner == graph.root() {
            graph.param(key)
        } else {
            graph.child(owner, key)
        };
        if let Some(child) = child {
            populate_node(graph, child, value, stack);
        }
    }
}

fn populate_node(graph: &mut TypeGraph, id: NodeId, value: &Value, stack: &mut Vec<NodeId>) {
    match value {
        Value::Null => {}
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            set_sample(graph, id, scalar_text(value));
        }
        Value::Object(map) => {
            if let Some(target) = structured_target(graph, id) {
                if !stack.contains(&target) {
                    stack.push(target);
                    populate_children(graph, target, map, stack);
                    stack.pop();
                }
            }
            set_sample(graph, id, block_text(value));
        }
        Value::Array(_) => set_sample(graph, id, block_text(value)),
    }
}

/// Node holding the fields for an object stored at `id`: the node itself when
/// it has children, otherwise the type its expression names through pointers.
fn structured_target(graph: &TypeGraph, id: NodeId) -> Option<NodeId> {
    let node = graph.node(id);
    if !node.children.is_empty() {
        return Some(id);
    }
    let mut expr = node.type_expr.as_ref()?;
    while let TypeExpr::Pointer(inner) = expr {
        expr = inner;
    }
    match expr {
        TypeExpr::Named(name) if !ir::is_builtin_name(name) => graph
            .lookup(name)
            .filter(|target| !graph.node(*target).children.is_empty()),
        _ => None,
    }
}

fn set_sample(graph: &mut TypeGraph, id: NodeId, text: String) {
    let node = graph.node_mut(id);
    if node.default.is_some() || text.is_empty() {
        return;
    }
    node.default = Some(DefaultValue {
        text,
        source: DefaultSource::Sample,
    });
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// YAML block form of a composite value.
fn block_text(value: &Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string())
}
