//! Type graph → schema tree compiler.
//!
//! `compile` walks the entity graph depth-first from one alias. Three pieces of
//! per-call state keep the walk finite and linear:
//!
//! - the visit stack: types currently being expanded. Meeting one of them again
//!   is a cycle, never a deeper recursion.
//! - the subtree cache: finished schemas by type, reused by every later
//!   reference in the same call.
//! - the pending set: types that were referenced while still on the stack.
//!   Those fields are marked lazy and carry no sub-schema.
//!
//! The state lives in a `CompilationSession` created per top-level call, so one
//! compiler can serve any number of independent (and concurrent) compilations.
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::catalog::Catalog;
use crate::error::CompileError;
use crate::handlers::{self, DeclaredTypeHandler, FieldHandler, FieldHandlerPipeline};
use crate::identifier::IdentifierGenerator;
use crate::model::{
    DefaultFieldBuilder, DefaultSchemaBuilder, Field, FieldBuilder, JsonType, SCHEMA_V3, Schema,
    SchemaBuilder,
};
use crate::types::{FieldDescriptor, TypeIdentity, TypeIntrospector, TypeRegistry};

pub const DEFAULT_MAX_DEPTH: usize = 64;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// What `compile` does with references it had to defer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Leave lazy fields as they are; they render as `$ref`.
    #[default]
    Reference,
    /// Run `resolve_pending` before returning: each lazy field gets a one-level
    /// schema of its target.
    Flatten,
}

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub max_depth: usize,
    pub meta_schema: String,
    pub cycle_policy: CyclePolicy,
}

/// Result of `compile_report`: the schema plus the types whose references were
/// deferred, mapped to the depth of their first deferral.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub schema: Schema,
    pub pending: IndexMap<TypeIdentity, usize>,
}

#[derive(Debug, Default)]
struct CompilationSession {
    root: Option<TypeIdentity>,
    visiting: IndexSet<TypeIdentity>,
    cache: HashMap<TypeIdentity, Arc<Schema>>,
    pending: IndexMap<TypeIdentity, usize>,
}

pub struct SchemaCompiler {
    registry: Arc<dyn TypeRegistry>,
    introspector: Arc<dyn TypeIntrospector>,
    identifiers: Arc<dyn IdentifierGenerator>,
    schema_builder: Arc<dyn SchemaBuilder>,
    field_builder: Arc<dyn FieldBuilder>,
    pipeline: FieldHandlerPipeline,
    options: CompilerOptions,
}

// ————————————————————————————————————————————————————————————————————————————
// SETUP
// ————————————————————————————————————————————————————————————————————————————

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            meta_schema: SCHEMA_V3.to_string(),
            cycle_policy: CyclePolicy::default(),
        }
    }
}

impl SchemaCompiler {
    pub fn new(
        registry: Arc<dyn TypeRegistry>,
        introspector: Arc<dyn TypeIntrospector>,
        identifiers: Arc<dyn IdentifierGenerator>,
    ) -> Self {
        Self {
            registry,
            introspector,
            identifiers,
            schema_builder: Arc::new(DefaultSchemaBuilder),
            field_builder: Arc::new(DefaultFieldBuilder),
            pipeline: FieldHandlerPipeline::new(),
            options: CompilerOptions::default(),
        }
    }

    /// Compiler backed by a catalog, with the standard handlers registered.
    pub fn for_catalog(catalog: Arc<Catalog>, identifiers: Arc<dyn IdentifierGenerator>) -> Self {
        Self::new(catalog.clone(), catalog, identifiers).with_standard_handlers()
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_schema_builder(mut self, builder: Arc<dyn SchemaBuilder>) -> Self {
        self.schema_builder = builder;
        self
    }

    pub fn with_field_builder(mut self, builder: Arc<dyn FieldBuilder>) -> Self {
        self.field_builder = builder;
        self
    }

    pub fn with_standard_handlers(self) -> Self {
        for (handler, priority) in handlers::standard() {
            self.register_handler(handler, priority);
        }
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn register_handler(&self, handler: Arc<dyn FieldHandler>, priority: i32) {
        self.pipeline.register(handler, priority);
    }

    pub fn handlers(&self) -> Vec<Arc<dyn FieldHandler>> {
        self.pipeline.handlers()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaCompiler {
    pub fn compile(&self, alias: &str) -> Result<Schema, CompileError> {
        let compilation = self.compile_report(alias)?;
        match self.options.cycle_policy {
            CyclePolicy::Reference => Ok(compilation.schema),
            CyclePolicy::Flatten => self.resolve_pending(compilation.schema),
        }
    }

    /// Like `compile`, but always leaves lazy fields in place and reports
    /// which types were deferred.
    pub fn compile_report(&self, alias: &str) -> Result<Compilation, CompileError> {
        let identity = self.registry.resolve(alias)?;
        let mut session = CompilationSession::default();
        log::debug!("compiling `{alias}` ({identity})");
        let schema = self.compile_type(alias, &identity, &mut session, 0)?;
        log::debug!(
            "compiled `{alias}`: {} shared subtree(s), {} deferred type(s)",
            session.cache.len(),
            session.pending.len(),
        );
        Ok(Compilation { schema, pending: session.pending })
    }

    fn compile_type(
        &self,
        alias: &str,
        identity: &TypeIdentity,
        session: &mut CompilationSession,
        depth: usize,
    ) -> Result<Schema, CompileError> {
        if depth > self.options.max_depth {
            return Err(CompileError::DepthExceeded {
                alias: alias.to_string(),
                depth,
                max_depth: self.options.max_depth,
            });
        }
        if session.root.is_none() {
            session.root = Some(identity.clone());
        }
        session.visiting.insert(identity.clone());
        let built = self.build_schema(alias, identity, session, depth);
        session.visiting.pop();
        built
    }

    fn build_schema(
        &self,
        alias: &str,
        identity: &TypeIdentity,
        session: &mut CompilationSession,
        depth: usize,
    ) -> Result<Schema, CompileError> {
        let mut schema = self.new_schema(alias, identity);
        for descriptor in self.introspector.fields(identity)? {
            let mut field = self.build_field(identity, descriptor);
            if field.ignored {
                continue;
            }
            if let Some(target) = field.nested_target().cloned() {
                self.attach_nested(&target, &mut field, session, depth)?;
            }
            schema.add_field(field);
        }
        Ok(schema)
    }

    fn attach_nested(
        &self,
        target: &TypeIdentity,
        field: &mut Field,
        session: &mut CompilationSession,
        depth: usize,
    ) -> Result<(), CompileError> {
        // A type on the visit stack is never cached yet, so checking the cache
        // first cannot hide a cycle.
        if let Some(cached) = session.cache.get(target) {
            field.attach_schema(Arc::clone(cached));
            return Ok(());
        }
        let alias = self.alias_for(target);
        if session.visiting.contains(target) {
            log::debug!(
                "cycle under `{}`: `{target}` is still being built, deferring field `{}` at depth {depth}",
                session.root.as_ref().map(TypeIdentity::as_str).unwrap_or_default(),
                field.name,
            );
            session.pending.entry(target.clone()).or_insert(depth);
            field.mark_lazy(self.identifiers.url_for(&alias));
            return Ok(());
        }
        let nested = Arc::new(self.compile_type(&alias, target, session, depth + 1)?);
        session.cache.insert(target.clone(), Arc::clone(&nested));
        field.attach_schema(nested);
        Ok(())
    }

    fn new_schema(&self, alias: &str, identity: &TypeIdentity) -> Schema {
        let mut schema = self.schema_builder.create(&title_case(alias));
        schema.id = Some(self.identifiers.url_for(alias));
        schema.meta_schema = Some(self.options.meta_schema.clone());
        schema.ty = JsonType::Object;
        if let Some(description) = self.introspector.description(identity) {
            schema.description = Some(description);
        }
        schema
    }

    fn build_field(&self, owner: &TypeIdentity, descriptor: FieldDescriptor) -> Field {
        let mut field = self.field_builder.create(&descriptor.name);
        field.declared = Some(descriptor);
        self.pipeline.apply(owner, &mut field);
        // every emitted field carries a type, whatever handlers are registered
        if field.ty.is_none() {
            DeclaredTypeHandler.handle(owner, &mut field);
            field.ty.get_or_insert(JsonType::Any);
        }
        field
    }

    fn alias_for(&self, identity: &TypeIdentity) -> String {
        self.registry
            .alias_of(identity)
            .unwrap_or_else(|| identity.to_string())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEFERRED RESOLUTION (legacy)
// ————————————————————————————————————————————————————————————————————————————

impl SchemaCompiler {
    /// Give every lazy field in the tree a flat, one-level schema of its
    /// target. The target's own nested-object fields stay lazy. Prefer leaving
    /// lazy fields as `$ref`s; this exists for consumers that cannot follow
    /// references.
    pub fn resolve_pending(&self, mut schema: Schema) -> Result<Schema, CompileError> {
        self.resolve_lazy_fields(&mut schema, None)?;
        Ok(schema)
    }

    /// `resolve_pending` restricted to lazy fields that point at `target`.
    pub fn resolve_pending_for(
        &self,
        mut schema: Schema,
        target: &TypeIdentity,
    ) -> Result<Schema, CompileError> {
        self.resolve_lazy_fields(&mut schema, Some(target))?;
        Ok(schema)
    }

    fn resolve_lazy_fields(
        &self,
        schema: &mut Schema,
        target: Option<&TypeIdentity>,
    ) -> Result<(), CompileError> {
        for field in schema.fields_mut() {
            if let Some(sub) = field.schema_mut() {
                if sub.has_lazy_fields() {
                    self.resolve_lazy_fields(Arc::make_mut(sub), target)?;
                }
            }
            if !field.is_lazy() {
                continue;
            }
            let Some(object) = field.object.clone() else { continue };
            if target.is_some_and(|t| t != &object) {
                continue;
            }
            let flat = self.compile_flat(&object)?;
            field.attach_schema(Arc::new(flat));
        }
        Ok(())
    }

    // One level, fresh: no session, no cache, no cycle detection.
    fn compile_flat(&self, identity: &TypeIdentity) -> Result<Schema, CompileError> {
        let alias = self.alias_for(identity);
        let mut schema = self.new_schema(&alias, identity);
        for descriptor in self.introspector.fields(identity)? {
            let mut field = self.build_field(identity, descriptor);
            if field.ignored {
                continue;
            }
            if let Some(target) = field.nested_target().cloned() {
                field.mark_lazy(self.identifiers.url_for(&self.alias_for(&target)));
            }
            schema.add_field(field);
        }
        Ok(schema)
    }
}

fn title_case(alias: &str) -> String {
    let mut chars = alias.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
