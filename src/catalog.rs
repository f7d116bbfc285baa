//! Declarative, in-memory entity catalog.
//!
//! A catalog file lists entity types by alias:
//!
//! ```json
//! { "types": {
//!     "author": { "name": "app.Author", "fields": [
//!         { "name": "name",  "type": "string", "required": true },
//!         { "name": "books", "type": "array", "items": "book" } ] },
//!     "book": { "fields": [ { "name": "author", "type": "author" } ] } } }
//! ```
//!
//! `type` is a primitive (`string`, `integer`, `number`, `boolean`, `null`,
//! `any`, bare `object`), `array` (element in `items`), `object` with `items`
//! naming the entity, or another alias. All other keys on a field are
//! annotations. Aliases may not shadow the primitive names. The catalog serves as both the
//! `TypeRegistry` and the `TypeIntrospector` of a compiler.
use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{CatalogError, CompileError};
use crate::model::JsonType;
use crate::types::{
    FieldAnnotations, FieldDescriptor, FieldShape, TypeIdentity, TypeIntrospector, TypeRegistry,
};

static ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("alias pattern is valid")
});

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Default)]
pub struct Catalog {
    aliases: IndexMap<String, TypeIdentity>,
    types: HashMap<TypeIdentity, TypeEntry>,
}

#[derive(Debug)]
struct TypeEntry {
    alias: String,
    description: Option<String>,
    fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    types: IndexMap<String, TypeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeDef {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    items: Option<String>,
    #[serde(flatten)]
    annotations: FieldAnnotations,
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl Catalog {
    pub fn from_json_str(src: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = crate::path_de::from_str_with_path(src)?;
        Self::build(file.types)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CatalogError> {
        let file: CatalogFile = crate::path_de::from_value_with_path(value)?;
        Self::build(file.types)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::load_all([path])
    }

    /// Load and merge several catalog files. References may cross files.
    pub fn load_all<I, P>(paths: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut merged = IndexMap::<String, TypeDef>::new();
        for path in paths {
            let path = path.as_ref();
            let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let file: CatalogFile = crate::path_de::from_str_with_path(&source)?;
            log::debug!("loaded {} type(s) from {}", file.types.len(), path.display());
            for (alias, def) in file.types {
                if merged.contains_key(&alias) {
                    return Err(CatalogError::DuplicateAlias(alias));
                }
                merged.insert(alias, def);
            }
        }
        Self::build(merged)
    }

    fn build(defs: IndexMap<String, TypeDef>) -> Result<Self, CatalogError> {
        let mut aliases = IndexMap::new();
        for (alias, def) in &defs {
            if !ALIAS_RE.is_match(alias) || JsonType::parse(alias).is_some() {
                return Err(CatalogError::InvalidAlias(alias.clone()));
            }
            let identity = TypeIdentity::new(def.name.clone().unwrap_or_else(|| alias.clone()));
            if aliases.values().any(|known| known == &identity) {
                return Err(CatalogError::DuplicateAlias(identity.to_string()));
            }
            aliases.insert(alias.clone(), identity);
        }

        let mut types = HashMap::with_capacity(defs.len());
        for (alias, def) in defs {
            let mut fields = Vec::with_capacity(def.fields.len());
            let mut seen = HashSet::with_capacity(def.fields.len());
            for raw in def.fields {
                if !seen.insert(raw.name.clone()) {
                    return Err(CatalogError::DuplicateField { owner: alias, field: raw.name });
                }
                let shape = parse_shape(&aliases, &alias, &raw.name, &raw.ty, raw.items.as_deref())?;
                fields.push(FieldDescriptor {
                    name: raw.name,
                    shape,
                    annotations: raw.annotations,
                });
            }
            let identity = aliases[&alias].clone();
            types.insert(identity, TypeEntry { alias, description: def.description, fields });
        }

        Ok(Self { aliases, types })
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn parse_shape(
    aliases: &IndexMap<String, TypeIdentity>,
    owner: &str,
    field: &str,
    ty: &str,
    items: Option<&str>,
) -> Result<FieldShape, CatalogError> {
    let unusable = |reason: String| CatalogError::UnknownType {
        owner: owner.to_string(),
        field: field.to_string(),
        reason,
    };

    if ty == "array" {
        let inner = match items {
            None => FieldShape::Primitive(JsonType::Any),
            Some("array") => {
                return Err(unusable("arrays of arrays must wrap the inner array in an entity".into()));
            }
            Some(item) => parse_shape(aliases, owner, field, item, None)?,
        };
        return Ok(FieldShape::Collection(Box::new(inner)));
    }
    if let ("object", Some(entity)) = (ty, items) {
        return match aliases.get(entity) {
            Some(identity) => Ok(FieldShape::Object(identity.clone())),
            None if JsonType::parse(entity).is_some() => {
                Err(unusable(format!("`items: {entity}` on an object must name an entity")))
            }
            None => Err(CatalogError::DanglingReference {
                owner: owner.to_string(),
                field: field.to_string(),
                target: entity.to_string(),
            }),
        };
    }
    if let Some(items) = items {
        return Err(unusable(format!("`items: {items}` is only valid on arrays and objects")));
    }
    if let Some(primitive) = JsonType::parse(ty) {
        return Ok(FieldShape::Primitive(primitive));
    }
    match aliases.get(ty) {
        Some(identity) => Ok(FieldShape::Object(identity.clone())),
        None => Err(CatalogError::DanglingReference {
            owner: owner.to_string(),
            field: field.to_string(),
            target: ty.to_string(),
        }),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COLLABORATOR IMPLEMENTATIONS
// ————————————————————————————————————————————————————————————————————————————

impl TypeRegistry for Catalog {
    fn resolve(&self, alias: &str) -> Result<TypeIdentity, CompileError> {
        self.aliases
            .get(alias)
            .cloned()
            .ok_or_else(|| CompileError::UnknownAlias { alias: alias.to_string() })
    }

    fn alias_of(&self, identity: &TypeIdentity) -> Option<String> {
        self.types.get(identity).map(|entry| entry.alias.clone())
    }

    fn aliases(&self) -> Vec<String> {
        self.aliases.keys().cloned().collect()
    }
}

impl TypeIntrospector for Catalog {
    fn fields(&self, identity: &TypeIdentity) -> Result<Vec<FieldDescriptor>, CompileError> {
        self.types
            .get(identity)
            .map(|entry| entry.fields.clone())
            .ok_or_else(|| CompileError::Introspection {
                identity: identity.clone(),
                reason: "no definition in catalog".into(),
            })
    }

    fn description(&self, identity: &TypeIdentity) -> Option<String> {
        self.types.get(identity).and_then(|entry| entry.description.clone())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
