//! Compile a graph of entity types into tree-shaped JSON-Schema documents.
//!
//! Fields flow through a priority-ordered handler pipeline; object-valued
//! fields are expanded into nested schemas, shared when referenced twice, and
//! deferred (rendered as `$ref`) when they close a cycle.
pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod error;
pub mod handlers;
pub mod identifier;
pub mod model;
pub mod path_de;
pub mod types;
pub mod validate;

pub use catalog::Catalog;
pub use compiler::{Compilation, CompilerOptions, CyclePolicy, SchemaCompiler};
pub use error::{CatalogError, CompileError, ValidationError};
pub use handlers::{FieldHandler, FieldHandlerPipeline};
pub use identifier::{IdentifierGenerator, UrlIdentifiers};
pub use model::{Field, FieldBuilder, JsonType, Schema, SchemaBuilder};
pub use types::{FieldDescriptor, FieldShape, TypeIdentity, TypeIntrospector, TypeRegistry};
