//! OpenAPI v3 schema documents: the CRD wrapping `Config`, and the plain
//! values schema extracted from its `spec`.
//!
//! Schema derivation sits behind [`SchemaCompiler`]; the bundled
//! [`NativeCompiler`] builds the schema straight from the resolved graph.
use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{Error, Result};
use crate::graph::NodeId;
use crate::ir::{Primitive, ResolvedType, SemanticAlias};
use crate::render::{GROUP_NAME, VERSION_NAME, parse_literal};
use crate::resolve::{ROOT_TYPE, Resolver, Unresolved};
use crate::scan::literal::unquote;

const QUANTITY_PATTERN: &str = r"^(\+|-)?(([0-9]+(\.[0-9]*)?)|(\.[0-9]+))(([KMGTPE]i)|[numkMGTPE]|([eE](\+|-)?(([0-9]+(\.[0-9]*)?)|(\.[0-9]+))))?$";
const VALUES_SCHEMA_TITLE: &str = "Chart Values";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchemaProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchemaProps>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, JsonSchemaProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<JsonSchemaProps>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<JsonSchemaProps>,
    #[serde(rename = "x-kubernetes-int-or-string", skip_serializing_if = "is_false")]
    pub int_or_string: bool,
    #[serde(
        rename = "x-kubernetes-preserve-unknown-fields",
        skip_serializing_if = "is_false"
    )]
    pub preserve_unknown_fields: bool,
}

impl JsonSchemaProps {
    fn typed(name: &str) -> Self {
        Self {
            type_: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn with_format(name: &str, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::typed(name)
        }
    }

    fn free_form() -> Self {
        Self {
            preserve_unknown_fields: true,
            ..Self::typed("object")
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: CrdSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrdSpec {
    pub group: String,
    pub names: CrdNames,
    pub scope: String,
    pub versions: Vec<CrdVersion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdNames {
    pub kind: String,
    pub list_kind: String,
    pub plural: String,
    pub singular: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrdVersion {
    pub name: String,
    pub served: bool,
    pub storage: bool,
    pub schema: CrdValidation,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrdValidation {
    #[serde(rename = "openAPIV3Schema")]
    pub open_api_v3_schema: JsonSchemaProps,
}

/// The `-s` artifact: the parameter set without the CRD envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ValuesSchema {
    pub title: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: IndexMap<String, JsonSchemaProps>,
}

/// Input handed to a schema compiler.
pub struct CompileUnit<'a> {
    /// Configuration file the declarations came from; named in compiler errors.
    pub source: &'a Path,
    /// The generated Go declarations, for compilers that work from source.
    pub declarations: &'a str,
    pub resolver: &'a Resolver<'a>,
}

pub trait SchemaCompiler {
    fn compile(&self, unit: &CompileUnit<'_>) -> Result<CustomResourceDefinition>;
}

/// Derives the schema from the resolved graph without going through Go.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCompiler;

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaCompiler for NativeCompiler {
    fn compile(&self, unit: &CompileUnit<'_>) -> Result<CustomResourceDefinition> {
        let mut builder = SchemaBuilder {
            resolver: unit.resolver,
            stack: Vec::new(),
        };
        let spec = builder
            .spec()
            .map_err(|Unresolved(name)| Error::Compiler {
                path: unit.source.to_path_buf(),
                message: format!("type '{name}' has no schema"),
            })?;
        Ok(CustomResourceDefinition::wrap(spec))
    }
}

impl CustomResourceDefinition {
    /// Standard envelope around the schema of `ConfigSpec`.
    pub fn wrap(spec: JsonSchemaProps) -> Self {
        let plural = format!("{}s", ROOT_TYPE.to_lowercase());
        let mut root = JsonSchemaProps {
            description: Some(format!("{ROOT_TYPE} holds the chart values.")),
            ..JsonSchemaProps::typed("object")
        };
        root.properties
            .insert("apiVersion".to_string(), JsonSchemaProps::typed("string"));
        root.properties
            .insert("kind".to_string(), JsonSchemaProps::typed("string"));
        root.properties
            .insert("metadata".to_string(), JsonSchemaProps::typed("object"));
        root.properties.insert("spec".to_string(), spec);
        Self {
            api_version: "apiextensions.k8s.io/v1".to_string(),
            kind: "CustomResourceDefinition".to_string(),
            metadata: ObjectMeta {
                name: format!("{plural}.{GROUP_NAME}"),
                annotations: BTreeMap::from([(
                    format!("{GROUP_NAME}/generated-by"),
                    env!("CARGO_PKG_NAME").to_string(),
                )]),
            },
            spec: CrdSpec {
                group: GROUP_NAME.to_string(),
                names: CrdNames {
                    kind: ROOT_TYPE.to_string(),
                    list_kind: format!("{ROOT_TYPE}List"),
                    plural,
                    singular: ROOT_TYPE.to_lowercase(),
                },
                scope: "Namespaced".to_string(),
                versions: vec![CrdVersion {
                    name: VERSION_NAME.to_string(),
                    served: true,
                    storage: true,
                    schema: CrdValidation {
                        open_api_v3_schema: root,
                    },
                }],
            },
        }
    }
}

/// Pulls `spec.properties` out of the first version of the CRD.
pub fn values_schema(crd: &CustomResourceDefinition) -> Result<ValuesSchema> {
    let version = crd
        .spec
        .versions
        .first()
        .ok_or_else(|| Error::Schema("CRD has no versions".to_string()))?;
    let spec = version
        .schema
        .open_api_v3_schema
        .properties
        .get("spec")
        .ok_or_else(|| Error::Schema("CRD schema has no spec property".to_string()))?;
    Ok(ValuesSchema {
        title: VALUES_SCHEMA_TITLE.to_string(),
        type_: "object".to_string(),
        properties: spec.properties.clone(),
    })
}

pub fn crd_yaml(crd: &CustomResourceDefinition) -> Result<String> {
    Ok(serde_yaml::to_string(crd)?)
}

pub fn values_schema_json(schema: &ValuesSchema) -> Result<String> {
    let mut out = serde_json::to_string_pretty(schema)?;
    out.push('\n');
    Ok(out)
}

struct SchemaBuilder<'r, 'g> {
    resolver: &'r Resolver<'g>,
    /// Named types on the current path.
    stack: Vec<NodeId>,
}

impl SchemaBuilder<'_, '_> {
    fn spec(&mut self) -> Result<JsonSchemaProps, Unresolved> {
        let graph = self.resolver.graph();
        let mut spec = JsonSchemaProps::typed("object");
        for id in graph.params_sorted() {
            let key = graph.node(id).name.clone();
            let props = self.member(id)?;
            spec.properties.insert(key, props);
        }
        Ok(spec)
    }

    /// Schema of a parameter or field, with its own description, inline
    /// enum constraint and default.
    fn member(&mut self, id: NodeId) -> Result<JsonSchemaProps, Unresolved> {
        let node = self.resolver.graph().node(id);
        let ty = self.resolver.resolve_node(id)?;
        let mut props = self.of_type(&ty)?;
        if !node.comment.is_empty() {
            props.description = Some(node.comment.clone());
        }
        if !node.enums.is_empty() {
            props.enum_ = node.enums.iter().map(|v| typed_enum_value(v, &ty)).collect();
        }
        if let Some(default) = node.default.as_ref().and_then(|d| schema_default(&d.text, &ty)) {
            props.default = Some(default);
        }
        Ok(props)
    }

    fn of_type(&mut self, ty: &ResolvedType) -> Result<JsonSchemaProps, Unresolved> {
        Ok(match ty {
            ResolvedType::Primitive(p) => primitive(*p),
            ResolvedType::StringFormat(format) => JsonSchemaProps::with_format("string", format),
            ResolvedType::Semantic(alias) => match alias {
                SemanticAlias::Quantity => JsonSchemaProps {
                    any_of: vec![JsonSchemaProps::typed("integer"), JsonSchemaProps::typed("string")],
                    pattern: Some(QUANTITY_PATTERN.to_string()),
                    int_or_string: true,
                    ..JsonSchemaProps::default()
                },
                SemanticAlias::Duration => JsonSchemaProps::typed("string"),
                SemanticAlias::Time => JsonSchemaProps::with_format("string", "date-time"),
                SemanticAlias::Object | SemanticAlias::EmptyObject => JsonSchemaProps::free_form(),
            },
            ResolvedType::Pointer(inner) => self.of_type(inner)?,
            ResolvedType::Array(inner) => JsonSchemaProps {
                items: Some(Box::new(self.of_type(inner)?)),
                ..JsonSchemaProps::typed("array")
            },
            ResolvedType::Map(inner) => JsonSchemaProps {
                additional_properties: Some(Box::new(self.of_type(inner)?)),
                ..JsonSchemaProps::typed("object")
            },
            ResolvedType::Enum(e) => JsonSchemaProps {
                enum_: e.values.iter().map(|v| enum_value(v, e.base)).collect(),
                ..primitive(e.base)
            },
            ResolvedType::Named(named) => {
                if self.stack.contains(&named.node) {
                    return Ok(JsonSchemaProps::free_form());
                }
                self.stack.push(named.node);
                let graph = self.resolver.graph();
                let mut props = JsonSchemaProps::typed("object");
                for (name, child) in graph.children(named.node) {
                    let schema = self.member(child)?;
                    props.properties.insert(name.to_string(), schema);
                }
                self.stack.pop();
                props
            }
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn primitive(p: Primitive) -> JsonSchemaProps {
    match p {
        Primitive::String => JsonSchemaProps::typed("string"),
        Primitive::Bool => JsonSchemaProps::typed("boolean"),
        Primitive::Int => JsonSchemaProps::typed("integer"),
        Primitive::Int32 => JsonSchemaProps::with_format("integer", "int32"),
        Primitive::Int64 => JsonSchemaProps::with_format("integer", "int64"),
        Primitive::Float32 | Primitive::Float64 => JsonSchemaProps::typed("number"),
    }
}

/// Inline `enum:"..."` members take the type of the value they constrain.
fn typed_enum_value(text: &str, ty: &ResolvedType) -> Value {
    match ty.strip_pointer() {
        ResolvedType::Primitive(p) => enum_value(text, *p),
        ResolvedType::Enum(e) => enum_value(text, e.base),
        _ => Value::String(text.to_string()),
    }
}

fn enum_value(text: &str, base: Primitive) -> Value {
    let parsed = if base.is_integer() {
        text.parse::<i64>().ok().map(Value::from)
    } else if base.is_float() {
        text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
    } else if base == Primitive::Bool {
        text.parse::<bool>().ok().map(Value::Bool)
    } else {
        None
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

fn schema_default(text: &str, ty: &ResolvedType) -> Option<Value> {
    if matches!(ty.strip_pointer(), ResolvedType::Semantic(SemanticAlias::EmptyObject)) {
        return None;
    }
    if ty.is_string_like() {
        return Some(Value::String(unquote(text).to_string()));
    }
    match parse_literal(text) {
        Some(Value::Null) => None,
        Some(value) => Some(value),
        None => Some(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::populate;
    use crate::graph::TypeGraph;
    use crate::scan::scan;
    use serde_json::json;

    fn compile(src: &str) -> Result<CustomResourceDefinition> {
        let mut graph = TypeGraph::build(&scan(src).annotations).unwrap();
        let values = crate::path_de::values_document(src).unwrap();
        populate(&mut graph, &values);
        let resolver = Resolver::new(&graph);
        NativeCompiler.compile(&CompileUnit {
            source: Path::new("values.yaml"),
            declarations: "",
            resolver: &resolver,
        })
    }

    fn properties(src: &str) -> Value {
        let crd = compile(src).unwrap();
        serde_json::to_value(values_schema(&crd).unwrap()).unwrap()["properties"].clone()
    }

    #[test]
    fn backup_scenario() {
        let props = properties(
            r#"
## @typedef {struct} Backup
## @field {bool} enabled
## @field {string} schedule
## @param {Backup} backup
backup: {enabled: false, schedule: "0 2 * * *"}
"#,
        );
        let backup = &props["backup"];
        assert_eq!(backup["type"], "object");
        assert_eq!(backup["properties"]["enabled"]["type"], "boolean");
        assert_eq!(backup["properties"]["enabled"]["default"], false);
        assert_eq!(backup["properties"]["schedule"]["type"], "string");
        assert_eq!(backup["properties"]["schedule"]["default"], "0 2 * * *");
    }

    #[test]
    fn leaves_map_to_openapi_types() {
        let props = properties(
            r#"
## @param {int64} big - Large counter
## @param {float64} ratio
## @param {email} contact
## @param {time} since
## @param {*quantity} memory="1Gi"
## @param {object} extra
## @param {emptyobject} marker
"#,
        );
        assert_eq!(props["big"], json!({"description": "Large counter", "type": "integer", "format": "int64"}));
        assert_eq!(props["ratio"], json!({"type": "number"}));
        assert_eq!(props["contact"], json!({"type": "string", "format": "email"}));
        assert_eq!(props["since"], json!({"type": "string", "format": "date-time"}));
        let memory = &props["memory"];
        assert_eq!(memory["anyOf"], json!([{"type": "integer"}, {"type": "string"}]));
        assert_eq!(memory["x-kubernetes-int-or-string"], true);
        assert_eq!(memory["pattern"], QUANTITY_PATTERN);
        assert_eq!(memory["default"], "1Gi");
        assert_eq!(props["extra"], json!({"type": "object", "x-kubernetes-preserve-unknown-fields": true}));
        assert_eq!(props["marker"]["x-kubernetes-preserve-unknown-fields"], true);
    }

    #[test]
    fn collections_and_enums() {
        let props = properties(
            r#"
## @enum {int} Level
## @value 1
## @value 2
## @param {[]string} tags=["a", "b"]
## @param {map[string]int} limits
## @param {Level} level=1
## @param {string enum:"x,y"} mode
"#,
        );
        assert_eq!(
            props["tags"],
            json!({"type": "array", "default": ["a", "b"], "items": {"type": "string"}})
        );
        assert_eq!(props["limits"]["additionalProperties"], json!({"type": "integer"}));
        assert_eq!(props["level"], json!({"type": "integer", "enum": [1, 2], "default": 1}));
        assert_eq!(props["mode"]["enum"], json!(["x", "y"]));
    }

    #[test]
    fn recursive_types_stop_at_the_cycle() {
        let props = properties(
            "## @typedef {struct} Node\n## @field {string} name\n## @field {[]Node} children\n## @param {Node} tree\n",
        );
        let children = &props["tree"]["properties"]["children"];
        assert_eq!(children["type"], "array");
        assert_eq!(children["items"]["x-kubernetes-preserve-unknown-fields"], true);
    }

    #[test]
    fn crd_envelope() {
        let crd = compile("## @param {int} replicas=1\n## @param {string} image\n").unwrap();
        let doc = serde_json::to_value(&crd).unwrap();
        assert_eq!(doc["kind"], "CustomResourceDefinition");
        assert_eq!(doc["metadata"]["name"], "configs.values.helm.io");
        assert_eq!(doc["spec"]["names"]["listKind"], "ConfigList");
        let root = &doc["spec"]["versions"][0]["schema"]["openAPIV3Schema"];
        let spec_keys: Vec<&String> = root["properties"]["spec"]["properties"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(spec_keys, vec!["image", "replicas"]);

        let yaml = crd_yaml(&crd).unwrap();
        assert!(yaml.contains("openAPIV3Schema:"), "{yaml}");
        assert!(yaml.contains("group: values.helm.io"), "{yaml}");
    }

    #[test]
    fn values_schema_document() {
        let crd = compile("## @param {bool} enabled\n").unwrap();
        let text = values_schema_json(&values_schema(&crd).unwrap()).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            doc,
            json!({"title": "Chart Values", "type": "object", "properties": {"enabled": {"type": "boolean"}}})
        );
    }

    #[test]
    fn unresolved_types_name_the_source() {
        match compile("## @param {Ghost} g\n") {
            Err(Error::Compiler { path, message }) => {
                assert_eq!(path, Path::new("values.yaml"));
                assert!(message.contains("Ghost"));
            }
            other => panic!("expected compiler error, got {other:?}"),
        }
    }

    #[test]
    fn empty_crd_has_no_values_schema() {
        let mut crd = CustomResourceDefinition::wrap(JsonSchemaProps::default());
        crd.spec.versions.clear();
        assert!(matches!(values_schema(&crd), Err(Error::Schema(_))));
    }
}
