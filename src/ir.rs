// Normalized types shared by the validator and every renderer. No raw type strings here.

use crate::graph::NodeId;

/// String specializations that only add a `format` tag to the schema.
pub const STRING_FORMATS: &[&str] = &[
    "bsonobjectid",
    "uri",
    "email",
    "hostname",
    "ipv4",
    "ipv6",
    "cidr",
    "mac",
    "uuid",
    "uuid3",
    "uuid4",
    "uuid5",
    "isbn",
    "isbn10",
    "isbn13",
    "creditcard",
    "ssn",
    "hexcolor",
    "rgbcolor",
    "byte",
    "password",
    "date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Bool,
    Int,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "bool" => Self::Bool,
            "int" => Self::Int,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => return None,
        })
    }
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Int32 | Self::Int64)
    }
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticAlias {
    Quantity,
    Duration,
    Time,
    /// Arbitrary JSON; unknown fields are preserved.
    Object,
    /// A generated struct with no fields.
    EmptyObject,
}

impl SemanticAlias {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "quantity" => Self::Quantity,
            "duration" => Self::Duration,
            "time" => Self::Time,
            "object" => Self::Object,
            "emptyobject" => Self::EmptyObject,
            _ => return None,
        })
    }
    pub fn name(self) -> &'static str {
        match self {
            Self::Quantity => "quantity",
            Self::Duration => "duration",
            Self::Time => "time",
            Self::Object => "object",
            Self::EmptyObject => "emptyobject",
        }
    }
}

pub fn string_format(name: &str) -> Option<&'static str> {
    STRING_FORMATS.iter().copied().find(|f| *f == name)
}

/// True for names that never refer to a node of the type graph.
pub fn is_builtin_name(name: &str) -> bool {
    Primitive::from_name(name).is_some()
        || string_format(name).is_some()
        || SemanticAlias::from_name(name).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    Primitive(Primitive),
    StringFormat(&'static str),
    Semantic(SemanticAlias),
    Pointer(Box<ResolvedType>),
    Array(Box<ResolvedType>),
    /// Keys are always strings.
    Map(Box<ResolvedType>),
    Enum(EnumRef),
    Named(NamedRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumRef {
    pub node: NodeId,
    pub ident: String,
    pub base: Primitive,
    pub values: Vec<String>,
}

/// A graph node with at least one child, under its emitted identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedRef {
    pub node: NodeId,
    pub ident: String,
}

impl ResolvedType {
    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_))
    }

    pub fn strip_pointer(&self) -> &ResolvedType {
        match self {
            Self::Pointer(inner) => inner,
            other => other,
        }
    }

    /// Primitive, string-format and semantic leaves.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::StringFormat(_) | Self::Semantic(_))
    }

    pub fn as_named(&self) -> Option<&NamedRef> {
        match self {
            Self::Named(named) => Some(named),
            _ => None,
        }
    }

    /// Literal defaults of these types are written as quoted strings.
    pub fn is_string_like(&self) -> bool {
        match self.strip_pointer() {
            Self::Primitive(p) => *p == Primitive::String,
            Self::StringFormat(_) => true,
            Self::Semantic(s) => matches!(
                s,
                SemanticAlias::Quantity | SemanticAlias::Duration | SemanticAlias::Time
            ),
            Self::Enum(e) => e.base == Primitive::String,
            Self::Pointer(_) | Self::Array(_) | Self::Map(_) | Self::Named(_) => false,
        }
    }
}
