//! Static shape metadata for aggregates
//!
//! A descriptor is written once per aggregate type (by hand or by a build
//! step), compiled once at startup and never mutated afterwards. Descriptors
//! deserialize from TOML/JSON so tools can load them from files.

use serde::{Deserialize, Serialize};

/// Name of the identity field on aggregate roots and entities
pub const ID_FIELD: &str = "id";

/// Domain primitive kinds with a storage codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Bool,
    Int,
    Float,
    Text,
    Uuid,
    DateTime,
}

impl PrimitiveType {
    /// Domain-facing type name, used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Int => "int",
            PrimitiveType::Float => "double",
            PrimitiveType::Text => "String",
            PrimitiveType::Uuid => "Uuid",
            PrimitiveType::DateTime => "DateTime",
        }
    }
}

/// Shape of an embedded value object or entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub type_name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ShapeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style)
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Shape of an aggregate root
///
/// Structurally identical to [`ShapeDescriptor`]; the distinct type marks the
/// root of a consistency boundary, which owns the root table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDescriptor {
    pub type_name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl AggregateDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style)
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One field of an aggregate, entity or value object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    pub fn primitive(name: impl Into<String>, ty: PrimitiveType) -> Self {
        Self::new(name, FieldKind::Primitive(ty))
    }

    pub fn value(name: impl Into<String>, shape: ShapeDescriptor) -> Self {
        Self::new(name, FieldKind::Value(shape))
    }

    pub fn entity(name: impl Into<String>, shape: ShapeDescriptor) -> Self {
        Self::new(name, FieldKind::Entity(shape))
    }

    pub fn list(name: impl Into<String>, element: ElementDescriptor) -> Self {
        Self::new(name, FieldKind::List(element))
    }

    pub fn set(name: impl Into<String>, element: ElementDescriptor) -> Self {
        Self::new(name, FieldKind::Set(element))
    }

    pub fn map(name: impl Into<String>, element: ElementDescriptor) -> Self {
        Self::new(name, FieldKind::Map(element))
    }

    /// Mark the field as nullable (builder style)
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Domain-facing type of this field, used in diagnostics
    pub fn type_label(&self) -> String {
        let base = self.kind.type_label();
        if self.nullable {
            format!("{}?", base)
        } else {
            base
        }
    }
}

/// Kind of a field, as seen by the schema compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Primitive(PrimitiveType),
    Value(ShapeDescriptor),
    Entity(ShapeDescriptor),
    List(ElementDescriptor),
    Set(ElementDescriptor),
    Map(ElementDescriptor),
    /// Statically erased type (`dynamic`, `Object`); always rejected
    Dynamic,
    /// Another aggregate root embedded structurally; always rejected
    AggregateRef(String),
}

impl FieldKind {
    pub fn type_label(&self) -> String {
        match self {
            FieldKind::Primitive(ty) => ty.label().to_string(),
            FieldKind::Value(shape) | FieldKind::Entity(shape) => shape.type_name.clone(),
            FieldKind::List(element) => format!("List<{}>", element.type_label()),
            FieldKind::Set(element) => format!("Set<{}>", element.type_label()),
            FieldKind::Map(element) => format!("Map<String, {}>", element.type_label()),
            FieldKind::Dynamic => "dynamic".to_string(),
            FieldKind::AggregateRef(name) => name.clone(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            FieldKind::List(_) | FieldKind::Set(_) | FieldKind::Map(_)
        )
    }
}

/// Element of a list, set or map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub kind: ElementKind,
    #[serde(default)]
    pub nullable: bool,
}

impl ElementDescriptor {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub fn primitive(ty: PrimitiveType) -> Self {
        Self::new(ElementKind::Primitive(ty))
    }

    pub fn value(shape: ShapeDescriptor) -> Self {
        Self::new(ElementKind::Value(shape))
    }

    pub fn entity(shape: ShapeDescriptor) -> Self {
        Self::new(ElementKind::Entity(shape))
    }

    /// Mark elements as nullable (builder style)
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn type_label(&self) -> String {
        let base = match &self.kind {
            ElementKind::Primitive(ty) => ty.label().to_string(),
            ElementKind::Value(shape) | ElementKind::Entity(shape) => shape.type_name.clone(),
            ElementKind::Collection(inner) => format!("List<{}>", inner.type_label()),
            ElementKind::Dynamic => "dynamic".to_string(),
            ElementKind::AggregateRef(name) => name.clone(),
        };
        if self.nullable {
            format!("{}?", base)
        } else {
            base
        }
    }
}

/// Kind of a collection element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Primitive(PrimitiveType),
    Value(ShapeDescriptor),
    Entity(ShapeDescriptor),
    /// Collection of collections; always rejected
    Collection(Box<ElementDescriptor>),
    /// Statically erased element type; always rejected
    Dynamic,
    /// Collection of another aggregate root; always rejected
    AggregateRef(String),
}
