//! Line scanner for comment annotations.
//!
//! Recognized lines (after trimming, behind one or more `#`):
//!
//! ```text
//! @section <title>
//! @typedef {struct} Name [- description]
//! @enum {base} Name [- description]
//! @value token [- description]
//! @param {type} name[=default] [- description]
//! @field {type} name[=default] [- description]      (also @property, or parent.name)
//! @param name {type [enum:"a,b"] [default=...]} description      (older form)
//! @field parent.name {type ...} description                      (older form)
//! ```
//!
//! Anything else is ordinary prose and is skipped without complaint.
pub mod literal;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#+\s+@(section|param|field|property|typedef|enum|value)(?:\s+(.*))?$").unwrap()
});
static RE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\[[\w./-]+\]|[\w./-]+)").unwrap());
static RE_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w-]+").unwrap());
static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+").unwrap());
static RE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(\w+):"([^"]*)""#).unwrap());
static RE_DEFAULT_EQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdefault\s*=\s*").unwrap());

/// Section title used for parameters declared before any `@section`.
pub const DEFAULT_SECTION: &str = "Parameters";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Param,
    Field,
    Typedef,
    Enum,
}

/// One recognized annotation line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    pub kind: Kind,
    /// `[param]`, `[type]` or `[parent, field]`.
    pub path: Vec<String>,
    /// Braced block as written, modifiers included.
    pub type_expr: String,
    pub enum_values: Vec<String>,
    pub default: String,
    pub description: String,
    /// Name was written as `[name]`.
    pub optional: bool,
    /// 1-based source line.
    pub line: usize,
}

/// Documentation grouping opened by `@section`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub title: String,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
}

/// Something suspicious that did not stop the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub annotations: Vec<RawAnnotation>,
    pub sections: Vec<Section>,
    pub diagnostics: Vec<Diagnostic>,
}

/// `@param`/`@field` line split into its parts, before path resolution.
struct Member<'a> {
    name: &'a str,
    optional: bool,
    block: &'a str,
    default: String,
    description: String,
}

#[derive(Default)]
struct ScanState {
    out: Scan,
    open_typedef: Option<String>,
    /// Index into `out.annotations` of the enum collecting `@value` lines.
    open_enum: Option<usize>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

pub fn scan(src: &str) -> Scan {
    let mut state = ScanState::default();
    for (index, line) in src.lines().enumerate() {
        process_line(&mut state, index + 1, line.trim());
    }
    state.out
}

fn process_line(state: &mut ScanState, line: usize, text: &str) {
    let Some(caps) = RE_TAG.captures(text) else {
        return;
    };
    let rest = caps.get(2).map_or("", |m| m.as_str().trim_end());
    match &caps[1] {
        "section" => {
            if rest.is_empty() {
                return;
            }
            state.open_typedef = None;
            state.open_enum = None;
            state.out.sections.push(Section {
                title: rest.to_string(),
                params: Vec::new(),
            });
        }
        "typedef" => {
            let Some((name, description)) = type_declaration(rest) else {
                return;
            };
            let (block, _) = literal::take_braced(rest).unwrap_or_default();
            if !matches!(block.trim(), "struct" | "object") {
                return;
            }
            state.open_typedef = Some(name.to_string());
            state.open_enum = None;
            state.push(line, Kind::Typedef, vec![name.to_string()], description, |_| {});
        }
        "enum" => {
            let Some((name, description)) = type_declaration(rest) else {
                return;
            };
            let (base, _) = literal::take_braced(rest).unwrap_or_default();
            let base = base.trim().to_string();
            state.open_typedef = None;
            state.push(line, Kind::Enum, vec![name.to_string()], description, |row| {
                row.type_expr = base;
            });
            state.open_enum = Some(state.out.annotations.len() - 1);
        }
        "value" => {
            let Some(index) = state.open_enum else {
                return;
            };
            if let Some(token) = RE_TOKEN.find(rest) {
                state.out.annotations[index]
                    .enum_values
                    .push(token.as_str().to_string());
            }
        }
        tag => {
            let Some(member) = modern_member(rest).or_else(|| legacy_member(rest)) else {
                return;
            };
            state.open_enum = None;
            if tag == "param" {
                state.open_typedef = None;
                state.register_param(member.name);
                state.push_member(line, Kind::Param, vec![member.name.to_string()], member);
                return;
            }
            let path = match split_path(member.name) {
                Some(path) => path,
                None if member.name.contains(['.', '/']) => return,
                None => match &state.open_typedef {
                    Some(parent) => vec![parent.clone(), member.name.to_string()],
                    None => {
                        state.out.diagnostics.push(Diagnostic {
                            line,
                            message: format!(
                                "field '{}' has no enclosing @typedef and was ignored",
                                member.name
                            ),
                        });
                        return;
                    }
                },
            };
            state.push_member(line, Kind::Field, path, member);
        }
    }
}

impl ScanState {
    fn push(
        &mut self,
        line: usize,
        kind: Kind,
        path: Vec<String>,
        description: String,
        fill: impl FnOnce(&mut RawAnnotation),
    ) {
        let mut row = RawAnnotation {
            kind,
            path,
            type_expr: String::new(),
            enum_values: Vec::new(),
            default: String::new(),
            description,
            optional: false,
            line,
        };
        fill(&mut row);
        self.out.annotations.push(row);
    }

    fn push_member(&mut self, line: usize, kind: Kind, path: Vec<String>, member: Member<'_>) {
        let (enum_values, block_default) = block_modifiers(member.block);
        let default = if member.default.is_empty() {
            block_default.unwrap_or_default()
        } else {
            member.default
        };
        self.push(line, kind, path, member.description, |row| {
            row.type_expr = member.block.trim().to_string();
            row.enum_values = enum_values;
            row.default = default;
            row.optional = member.optional;
        });
    }

    fn register_param(&mut self, name: &str) {
        if self.out.sections.is_empty() {
            self.out.sections.push(Section {
                title: DEFAULT_SECTION.to_string(),
                params: Vec::new(),
            });
        }
        if self.out.sections.iter().any(|s| s.params.iter().any(|p| p == name)) {
            return;
        }
        if let Some(section) = self.out.sections.last_mut() {
            section.params.push(name.to_string());
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `{type} name[=default] [- description]`
fn modern_member(rest: &str) -> Option<Member<'_>> {
    let (block, after) = literal::take_braced(rest)?;
    let after = after.strip_prefix(char::is_whitespace)?.trim_start();
    let (name, optional, mut tail) = member_name(after)?;
    let mut default = String::new();
    if let Some(value) = tail.strip_prefix('=') {
        let (value, rest) = literal::take_literal(value)?;
        default = value.to_string();
        tail = rest;
    }
    Some(Member {
        name,
        optional,
        block,
        default,
        description: description(tail)?,
    })
}

/// `name {type modifiers} description`
fn legacy_member(rest: &str) -> Option<Member<'_>> {
    let (name, optional, after) = member_name(rest)?;
    let after = after.strip_prefix(char::is_whitespace)?.trim_start();
    let (block, tail) = literal::take_braced(after)?;
    Some(Member {
        name,
        optional,
        block,
        default: String::new(),
        description: description(tail)?,
    })
}

fn member_name(src: &str) -> Option<(&str, bool, &str)> {
    let m = RE_NAME.find(src)?;
    let raw = m.as_str();
    let tail = &src[m.end()..];
    match raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(inner) => Some((inner, true, tail)),
        None if raw.contains(['[', ']']) => None,
        None => Some((raw, false, tail)),
    }
}

/// `{...} Name [- description]` for typedef and enum lines.
fn type_declaration(rest: &str) -> Option<(&str, String)> {
    let (_, after) = literal::take_braced(rest)?;
    let after = after.strip_prefix(char::is_whitespace)?.trim_start();
    let name = RE_IDENT.find(after)?;
    Some((name.as_str(), description(&after[name.end()..])?))
}

/// Text after the name/default; `None` when it does not start with whitespace.
fn description(tail: &str) -> Option<String> {
    if tail.is_empty() {
        return Some(String::new());
    }
    if !tail.starts_with(char::is_whitespace) {
        return None;
    }
    let text = tail.trim();
    let text = match text.strip_prefix('-') {
        Some(r) if r.is_empty() || r.starts_with(char::is_whitespace) => r.trim_start(),
        _ => text,
    };
    Some(text.to_string())
}

/// `parent.field` or `parent/field`; `None` for plain names or deeper paths.
fn split_path(name: &str) -> Option<Vec<String>> {
    let mut parts = name.split(['.', '/']);
    let (parent, field) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || parent.is_empty() || field.is_empty() {
        return None;
    }
    Some(vec![parent.to_string(), field.to_string()])
}

/// `enum:"a,b"`, `default:"x"` and `default=<literal>` inside a type block.
fn block_modifiers(block: &str) -> (Vec<String>, Option<String>) {
    let mut enums = Vec::new();
    let mut default = None;
    for caps in RE_ATTR.captures_iter(block) {
        match &caps[1] {
            "enum" => {
                enums = caps[2]
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "default" => default = Some(caps[2].to_string()),
            _ => {}
        }
    }
    if let Some(m) = RE_DEFAULT_EQ.find(block) {
        if let Some((value, _)) = literal::take_literal(&block[m.end()..]) {
            default = Some(value.to_string());
        }
    }
    (enums, default)
}
