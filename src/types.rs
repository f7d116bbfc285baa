//! Type-side vocabulary: identities, introspected field descriptors, and the
//! two lookup traits the compiler consumes.
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::model::JsonType;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Opaque handle to a concrete entity type (its canonical name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeIdentity(String);

/// Declared shape of a field, as reported by introspection.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Primitive(JsonType),
    Object(TypeIdentity),
    Collection(Box<FieldShape>),
}

/// Per-field metadata attached to a declaration. The standard
/// `AnnotationHandler` copies these onto the `Field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAnnotations {
    pub ignore: bool,
    pub schema_type: Option<JsonType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    #[serde(rename = "enum")]
    pub enum_: Option<Vec<serde_json::Value>>,
    pub required: bool,
    pub default: Option<serde_json::Value>,
}

/// One introspected field. Produced fresh by every `TypeIntrospector::fields` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub shape: FieldShape,
    pub annotations: FieldAnnotations,
}

/// Maps human-readable aliases to concrete types.
pub trait TypeRegistry: Send + Sync {
    fn resolve(&self, alias: &str) -> Result<TypeIdentity, CompileError>;

    /// Reverse lookup, used to title and identify nested schemas.
    fn alias_of(&self, identity: &TypeIdentity) -> Option<String>;

    /// Every alias the registry knows, in registration order.
    fn aliases(&self) -> Vec<String>;
}

/// Lists the fields of a concrete type, in declaration order.
pub trait TypeIntrospector: Send + Sync {
    fn fields(&self, identity: &TypeIdentity) -> Result<Vec<FieldDescriptor>, CompileError>;

    /// Free-text description stamped on the type's schema.
    fn description(&self, _identity: &TypeIdentity) -> Option<String> {
        None
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FieldShape {
    /// The entity this shape points at, looking through collections.
    pub fn referenced_type(&self) -> Option<&TypeIdentity> {
        match self {
            FieldShape::Primitive(_) => None,
            FieldShape::Object(identity) => Some(identity),
            FieldShape::Collection(inner) => inner.referenced_type(),
        }
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
            annotations: FieldAnnotations::default(),
        }
    }
    pub fn with_annotations(mut self, annotations: FieldAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
