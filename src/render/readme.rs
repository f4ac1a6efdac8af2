//! Parameter tables for the chart README.
//!
//! Each section becomes one markdown table with a row per parameter and per
//! field reachable from it. Values come from the configuration document when
//! present, then from the annotation default, then from a zero value for the
//! type (`null` for pointers).
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::graph::NodeId;
use crate::ir::{Primitive, ResolvedType, SemanticAlias};
use crate::render::parse_literal;
use crate::resolve::Resolver;
use crate::scan::Section;
use crate::scan::literal::unquote;

static RE_PARAMETERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{2,})\s+Parameters\s*$").unwrap());
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+)\s").unwrap());

const PARAMETERS_HEADING: &str = "Parameters";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub path: String,
    pub description: String,
    pub ty: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: String,
    pub rows: Vec<Row>,
}

/// One table per section, in declaration order. Sections without rows are dropped.
pub fn doc_tables(resolver: &Resolver<'_>, sections: &[Section], values: &Value) -> Result<Vec<Table>> {
    let graph = resolver.graph();
    let mut tables = Vec::new();
    for section in sections {
        let mut builder = RowBuilder {
            resolver,
            rows: Vec::new(),
            stack: Vec::new(),
        };
        for name in &section.params {
            let Some(id) = graph.param(name) else {
                continue;
            };
            builder.member(name.clone(), id, values.get(name))?;
        }
        if !builder.rows.is_empty() {
            tables.push(Table {
                title: section.title.clone(),
                rows: builder.rows,
            });
        }
    }
    Ok(tables)
}

/// Tables as markdown, each under a heading one level below `depth`.
pub fn render_tables(tables: &[Table], depth: usize) -> String {
    let hashes = "#".repeat(depth + 1);
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!("\n{hashes} {}\n\n", table.title));
        out.push_str(&markdown_table(&table.rows));
    }
    out
}

/// Replaces the body of the `Parameters` heading (depth two or more) up to
/// the next heading of equal or lesser depth.
pub fn update_parameters_section(readme: &str, tables: &[Table]) -> Result<String> {
    let lines: Vec<&str> = readme.split('\n').collect();
    let (start, depth) = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| RE_PARAMETERS.captures(line).map(|caps| (i, caps[1].len())))
        .ok_or_else(|| Error::SectionNotFound {
            heading: PARAMETERS_HEADING.to_string(),
        })?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| {
            RE_HEADING
                .captures(line)
                .is_some_and(|caps| caps[1].len() <= depth)
        })
        .map_or(lines.len(), |offset| start + 1 + offset);

    let body = render_tables(tables, depth);
    let body = body.trim_end_matches('\n');
    let mut out: Vec<&str> = lines[..=start].to_vec();
    if !body.is_empty() {
        out.extend(body.split('\n'));
    }
    if end < lines.len() {
        out.push("");
        out.extend(&lines[end..]);
    } else if readme.ends_with('\n') {
        out.push("");
    }
    Ok(out.join("\n"))
}

// ————————————————————————————————————————————————————————————————————————————
// ROWS
// ————————————————————————————————————————————————————————————————————————————

struct RowBuilder<'r, 'g> {
    resolver: &'r Resolver<'g>,
    rows: Vec<Row>,
    /// Named types being expanded on the current path.
    stack: Vec<NodeId>,
}

impl RowBuilder<'_, '_> {
    fn member(&mut self, path: String, id: NodeId, value: Option<&Value>) -> Result<()> {
        let node = self.resolver.graph().node(id);
        let ty = self.resolver.resolve_node(id)?;
        let value = value.filter(|v| !v.is_null());
        self.rows.push(Row {
            path: path.clone(),
            description: node.comment.clone(),
            ty: doc_type(&ty),
            value: cell_value(&ty, value, node.annotation_default()),
        });
        self.expand(&path, &ty, value)
    }

    fn expand(&mut self, path: &str, ty: &ResolvedType, value: Option<&Value>) -> Result<()> {
        match ty.strip_pointer() {
            ResolvedType::Named(named) => self.fields(path, named.node, value.and_then(Value::as_object)),
            ResolvedType::Array(elem) => {
                let Some(named) = elem.strip_pointer().as_named() else {
                    return Ok(());
                };
                match value.and_then(Value::as_array).filter(|items| !items.is_empty()) {
                    Some(items) => {
                        for (i, item) in items.iter().enumerate() {
                            self.fields(&format!("{path}[{i}]"), named.node, item.as_object())?;
                        }
                        Ok(())
                    }
                    None => self.fields(&format!("{path}[i]"), named.node, None),
                }
            }
            ResolvedType::Map(elem) => match elem.strip_pointer().as_named() {
                Some(named) => self.fields(&format!("{path}[name]"), named.node, None),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn fields(&mut self, path: &str, owner: NodeId, value: Option<&Map<String, Value>>) -> Result<()> {
        if self.stack.contains(&owner) {
            return Ok(());
        }
        self.stack.push(owner);
        let graph = self.resolver.graph();
        for (name, child) in graph.children(owner) {
            self.member(format!("{path}.{name}"), child, value.and_then(|m| m.get(name)))?;
        }
        self.stack.pop();
        Ok(())
    }
}

/// Type column: element and pointee types are shown by kind rather than by name.
fn doc_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Pointer(inner) => match inner.as_ref() {
            ResolvedType::Array(_) | ResolvedType::Map(_) => doc_type(inner),
            ResolvedType::Enum(e) => format!("*{}", e.base.name()),
            ResolvedType::Named(_) => "*object".to_string(),
            other => format!("*{}", doc_type(other)),
        },
        ResolvedType::Array(elem) => format!("[]{}", element_type(elem)),
        ResolvedType::Map(elem) => format!("map[string]{}", element_type(elem)),
        ResolvedType::Enum(e) => e.base.name().to_string(),
        ResolvedType::Named(_) | ResolvedType::Semantic(SemanticAlias::EmptyObject) => {
            "object".to_string()
        }
        ResolvedType::Semantic(alias) => alias.name().to_string(),
        ResolvedType::Primitive(p) => p.name().to_string(),
        ResolvedType::StringFormat(format) => format.to_string(),
    }
}

fn element_type(elem: &ResolvedType) -> String {
    match elem {
        ResolvedType::Named(_) => "object".to_string(),
        ResolvedType::Pointer(inner) => format!("*{}", element_type(inner)),
        other => doc_type(other),
    }
}

fn cell_value(ty: &ResolvedType, value: Option<&Value>, annotation: Option<&str>) -> String {
    let fallback = |zero: &str| match annotation {
        Some(text) => render_annotation(text),
        None if ty.is_pointer() => "null".to_string(),
        None => zero.to_string(),
    };
    match ty.strip_pointer() {
        ResolvedType::Array(elem) => match value {
            Some(Value::Array(items)) if is_leaf(elem) => inline_array(items),
            Some(Value::Array(items)) if items.is_empty() => "[]".to_string(),
            Some(Value::Array(_)) => "[...]".to_string(),
            Some(other) => scalar_cell(other),
            None => fallback("[]"),
        },
        ResolvedType::Map(_) => match value {
            Some(Value::Object(map)) if map.is_empty() => "{}".to_string(),
            Some(Value::Object(_)) => "{...}".to_string(),
            Some(other) => scalar_cell(other),
            None => fallback("{}"),
        },
        ResolvedType::Named(_) => match value {
            Some(_) => "{}".to_string(),
            None => fallback("{}"),
        },
        leaf => match value {
            Some(v) => scalar_cell(v),
            None => fallback(zero_value(leaf)),
        },
    }
}

fn is_leaf(ty: &ResolvedType) -> bool {
    let ty = ty.strip_pointer();
    ty.is_builtin() || matches!(ty, ResolvedType::Enum(_))
}

fn zero_value(ty: &ResolvedType) -> &'static str {
    if ty.is_string_like() {
        return "\"\"";
    }
    let base = match ty {
        ResolvedType::Primitive(p) => *p,
        ResolvedType::Enum(e) => e.base,
        _ => return "{}",
    };
    if base == Primitive::Bool { "false" } else { "0" }
}

fn render_annotation(text: &str) -> String {
    let text = text.trim();
    if matches!(text, "{}" | "[]") {
        return text.to_string();
    }
    match parse_literal(text) {
        Some(value) => scalar_cell(&value),
        None => unquote(text).to_string(),
    }
}

fn scalar_cell(value: &Value) -> String {
    match value {
        Value::String(s) if s.is_empty() => "\"\"".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => inline_array(items),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn inline_array(items: &[Value]) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

// ————————————————————————————————————————————————————————————————————————————
// MARKDOWN
// ————————————————————————————————————————————————————————————————————————————

/// Line breaks end a table row, so multi-line text is joined with spaces.
fn one_line(text: &str) -> String {
    text.trim_end().lines().map(str::trim_end).collect::<Vec<_>>().join(" ")
}

/// Inline code that stays inside one cell. A value holding backticks gets a
/// double-backtick fence.
fn code_span(text: &str) -> String {
    let text = one_line(text).replace('|', "\\|");
    if text.contains('`') {
        format!("`` {text} ``")
    } else {
        format!("`{text}`")
    }
}

fn markdown_table(rows: &[Row]) -> String {
    let mut data = vec![[
        "Name".to_string(),
        "Description".to_string(),
        "Type".to_string(),
        "Value".to_string(),
    ]];
    for row in rows {
        data.push([
            code_span(&row.path),
            one_line(&row.description).replace('|', "\\|"),
            code_span(&row.ty),
            code_span(&row.value),
        ]);
    }
    let mut widths = [0usize; 4];
    for cells in &data {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let mut out = String::new();
    for (i, cells) in data.iter().enumerate() {
        out.push('|');
        for (cell, width) in cells.iter().zip(widths) {
            let pad = width - cell.chars().count();
            out.push_str(&format!(" {cell}{} |", " ".repeat(pad)));
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            for width in widths {
                out.push_str(&format!(" {} |", "-".repeat(width)));
            }
            out.push('\n');
        }
    }
    out
}
