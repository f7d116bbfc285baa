//! Schema value objects and their draft-03 JSON rendering.
//!
//! `Schema` and `Field` are plain containers: the compiler and the handler
//! pipeline fill them in, `to_json` renders them. Sub-schemas are held in `Arc`
//! so a type referenced from several places is built once and shared; rendering
//! duplicates the shared subtree structurally.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::types::{FieldDescriptor, TypeIdentity};

pub const SCHEMA_V3: &str = "http://json-schema.org/draft-03/schema#";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Option<JsonType>,           // None until a handler classifies it
    pub items: Option<JsonType>,        // primitive item type of an array field
    pub object: Option<TypeIdentity>,   // nested-object reference
    pub ignored: bool,
    pub required: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub enum_: Vec<Value>,
    pub default: Option<Value>,
    /// Declaration this field was built from, if any.
    pub declared: Option<FieldDescriptor>,
    schema: Option<Arc<Schema>>,
    lazy: bool,
    reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub title: String,
    pub id: Option<String>,
    pub meta_schema: Option<String>,
    pub ty: JsonType,                   // always Object for entity schemas
    pub description: Option<String>,
    fields: Vec<Field>,                 // introspection order
}

pub trait FieldBuilder: Send + Sync {
    fn create(&self, name: &str) -> Field;
}

pub trait SchemaBuilder: Send + Sync {
    fn create(&self, title: &str) -> Schema;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFieldBuilder;

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaBuilder;

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Null => "null",
            JsonType::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "string" => JsonType::String,
            "integer" => JsonType::Integer,
            "number" => JsonType::Number,
            "boolean" => JsonType::Boolean,
            "object" => JsonType::Object,
            "array" => JsonType::Array,
            "null" => JsonType::Null,
            "any" => JsonType::Any,
            _ => return None,
        })
    }

    /// Scalar types a field can carry without a nested schema.
    pub fn is_primitive(self) -> bool {
        !matches!(self, JsonType::Object | JsonType::Array)
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            items: None,
            object: None,
            ignored: false,
            required: false,
            title: None,
            description: None,
            format: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
            enum_: Vec::new(),
            default: None,
            declared: None,
            schema: None,
            lazy: false,
            reference: None,
        }
    }

    pub fn has_type(&self, ty: JsonType) -> bool {
        self.ty == Some(ty)
    }

    /// The entity whose schema governs this field's value, when the field is
    /// a live (not ignored) object or object-array reference.
    pub fn nested_target(&self) -> Option<&TypeIdentity> {
        if self.ignored {
            return None;
        }
        match self.ty {
            Some(JsonType::Object) | Some(JsonType::Array) => self.object.as_ref(),
            _ => None,
        }
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Identifier of the deferred target, set together with the lazy flag.
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Attach a resolved sub-schema. Clears any lazy marker.
    pub fn attach_schema(&mut self, schema: Arc<Schema>) {
        self.schema = Some(schema);
        self.lazy = false;
        self.reference = None;
    }

    /// Defer this field: no sub-schema, rendered as a `$ref` to `reference`.
    pub fn mark_lazy(&mut self, reference: impl Into<String>) {
        self.schema = None;
        self.lazy = true;
        self.reference = Some(reference.into());
    }

    pub(crate) fn schema_mut(&mut self) -> Option<&mut Arc<Schema>> {
        self.schema.as_mut()
    }

    pub fn to_json(&self) -> Value {
        let mut o = Map::new();
        match self.ty {
            Some(JsonType::Object) => {
                if let Some(schema) = &self.schema {
                    o = schema.render(false);
                } else if let Some(reference) = self.lazy_reference() {
                    o.insert("$ref".into(), Value::from(reference));
                } else {
                    o.insert("type".into(), json!("object"));
                }
            }
            Some(JsonType::Array) => {
                o.insert("type".into(), json!("array"));
                if let Some(schema) = &self.schema {
                    o.insert("items".into(), Value::Object(schema.render(false)));
                } else if let Some(reference) = self.lazy_reference() {
                    o.insert("items".into(), json!({ "$ref": reference }));
                } else if let Some(item) = self.items {
                    o.insert("items".into(), json!({ "type": item.as_str() }));
                }
            }
            Some(ty) => {
                o.insert("type".into(), json!(ty.as_str()));
            }
            None => {}
        }

        if let Some(title) = &self.title {
            o.insert("title".into(), Value::from(title.clone()));
        }
        if let Some(description) = &self.description {
            o.insert("description".into(), Value::from(description.clone()));
        }
        if let Some(format) = &self.format {
            o.insert("format".into(), Value::from(format.clone()));
        }
        if let Some(min) = self.minimum {
            o.insert("minimum".into(), json_num_pref_i64(min));
        }
        if let Some(max) = self.maximum {
            o.insert("maximum".into(), json_num_pref_i64(max));
        }
        if let Some(n) = self.min_length {
            o.insert("minLength".into(), Value::from(n));
        }
        if let Some(n) = self.max_length {
            o.insert("maxLength".into(), Value::from(n));
        }
        if let Some(pattern) = &self.pattern {
            o.insert("pattern".into(), Value::from(pattern.clone()));
        }
        if !self.enum_.is_empty() {
            o.insert("enum".into(), Value::Array(self.enum_.clone()));
        }
        if let Some(default) = &self.default {
            o.insert("default".into(), default.clone());
        }
        if self.required {
            o.insert("required".into(), Value::Bool(true));
        }
        Value::Object(o)
    }

    fn lazy_reference(&self) -> Option<&str> {
        if self.lazy { self.reference.as_deref() } else { None }
    }
}

impl Schema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: None,
            meta_schema: None,
            ty: JsonType::Object,
            description: None,
            fields: Vec::new(),
        }
    }

    /// Append a field. Ignored fields are dropped here.
    pub fn add_field(&mut self, field: Field) {
        if !field.ignored {
            self.fields.push(field);
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True when any field in the tree is still deferred.
    pub fn has_lazy_fields(&self) -> bool {
        self.fields.iter().any(|f| {
            f.is_lazy() || f.schema().is_some_and(|s| s.has_lazy_fields())
        })
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.render(true))
    }

    // `$schema` only belongs on the document root.
    fn render(&self, root: bool) -> Map<String, Value> {
        let mut o = Map::new();
        o.insert("title".into(), Value::from(self.title.clone()));
        if let Some(id) = &self.id {
            o.insert("id".into(), Value::from(id.clone()));
        }
        if root {
            if let Some(meta) = &self.meta_schema {
                o.insert("$schema".into(), Value::from(meta.clone()));
            }
        }
        o.insert("type".into(), json!(self.ty.as_str()));
        if let Some(description) = &self.description {
            o.insert("description".into(), Value::from(description.clone()));
        }
        let props = self
            .fields
            .iter()
            .filter(|f| !f.ignored)
            .map(|f| (f.name.clone(), f.to_json()))
            .collect::<Map<_, _>>();
        o.insert("properties".into(), Value::Object(props));
        o
    }
}

impl Serialize for Schema {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl FieldBuilder for DefaultFieldBuilder {
    fn create(&self, name: &str) -> Field {
        Field::new(name)
    }
}

impl SchemaBuilder for DefaultSchemaBuilder {
    fn create(&self, title: &str) -> Schema {
        Schema::new(title)
    }
}

// Prefer emitting integers when exact
fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn string_field(name: &str) -> Field {
        let mut f = Field::new(name);
        f.ty = Some(JsonType::String);
        f
    }

    #[test]
    fn ignored_fields_never_reach_the_schema() {
        let mut schema = Schema::new("Author");
        let mut secret = string_field("password");
        secret.ignored = true;
        schema.add_field(string_field("name"));
        schema.add_field(secret);
        assert_eq!(schema.fields().len(), 1);
        let doc = schema.to_json();
        assert!(doc["properties"].get("password").is_none());
        assert_eq!(doc["properties"]["name"]["type"], "string");
    }

    #[test]
    fn lazy_and_attached_schema_are_exclusive() {
        let mut f = Field::new("author");
        f.ty = Some(JsonType::Object);
        f.attach_schema(Arc::new(Schema::new("Author")));
        f.mark_lazy("http://localhost/schemas/author.json#");
        assert!(f.is_lazy());
        assert!(f.schema().is_none());

        f.attach_schema(Arc::new(Schema::new("Author")));
        assert!(!f.is_lazy());
        assert!(f.reference().is_none());
    }

    #[test]
    fn lazy_fields_render_as_refs() {
        let mut single = Field::new("author");
        single.ty = Some(JsonType::Object);
        single.object = Some(TypeIdentity::new("Author"));
        single.mark_lazy("urn:author#");
        assert_eq!(single.to_json(), json!({ "$ref": "urn:author#" }));

        let mut many = Field::new("authors");
        many.ty = Some(JsonType::Array);
        many.object = Some(TypeIdentity::new("Author"));
        many.mark_lazy("urn:author#");
        assert_eq!(many.to_json(), json!({ "type": "array", "items": { "$ref": "urn:author#" } }));
    }

    #[test]
    fn nested_schema_renders_inline_without_meta_schema() {
        let mut book = Schema::new("Book");
        book.meta_schema = Some(SCHEMA_V3.into());
        book.add_field(string_field("title"));

        let mut books = Field::new("books");
        books.ty = Some(JsonType::Array);
        books.required = true;
        books.attach_schema(Arc::new(book));

        let mut author = Schema::new("Author");
        author.meta_schema = Some(SCHEMA_V3.into());
        author.add_field(books);

        let doc = author.to_json();
        assert_eq!(doc["$schema"], SCHEMA_V3);
        let items = &doc["properties"]["books"]["items"];
        assert_eq!(items["title"], "Book");
        assert!(items.get("$schema").is_none());
        assert_eq!(items["properties"]["title"]["type"], "string");
        assert_eq!(doc["properties"]["books"]["required"], true);
    }

    #[test]
    fn field_metadata_is_rendered() {
        let mut f = Field::new("age");
        f.ty = Some(JsonType::Integer);
        f.minimum = Some(0.0);
        f.maximum = Some(150.5);
        f.description = Some("years".into());
        let v = f.to_json();
        assert_eq!(v["minimum"], json!(0));
        assert_eq!(v["maximum"], json!(150.5));
        assert_eq!(v["description"], "years");
        assert!(v.get("required").is_none());
    }

    #[test]
    fn primitive_arrays_carry_item_type() {
        let mut tags = Field::new("tags");
        tags.ty = Some(JsonType::Array);
        tags.items = Some(JsonType::String);
        assert_eq!(tags.to_json(), json!({ "type": "array", "items": { "type": "string" } }));
    }
}
