//! Priority-ordered field transformation pipeline.
//!
//! Every field the compiler builds passes through the registered handlers,
//! highest priority first (ties keep registration order). Handlers see only
//! the owning type and the field; they never touch compilation state.
//!
//! Registration is copy-on-write: the live list sits behind an `RwLock<Arc<..>>`
//! and `apply` works on a cloned `Arc` snapshot, so a handler registered while a
//! field is being processed takes effect from the next field on.
pub mod annotations;
pub mod declared;
pub mod format;

use std::sync::{Arc, PoisonError, RwLock};

use crate::model::Field;
use crate::types::TypeIdentity;

pub use annotations::AnnotationHandler;
pub use declared::DeclaredTypeHandler;
pub use format::FormatGuessHandler;

pub const DECLARED_TYPE_PRIORITY: i32 = 100;
pub const ANNOTATION_PRIORITY: i32 = 50;
pub const FORMAT_GUESS_PRIORITY: i32 = 10;

/// A single step of the pipeline. Must be idempotent.
pub trait FieldHandler: Send + Sync {
    fn handle(&self, owner: &TypeIdentity, field: &mut Field);

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[derive(Clone)]
struct Entry {
    priority: i32,
    handler: Arc<dyn FieldHandler>,
}

#[derive(Default)]
pub struct FieldHandlerPipeline {
    entries: RwLock<Arc<Vec<Entry>>>,
}

impl FieldHandlerPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every handler of equal or higher priority.
    pub fn register(&self, handler: Arc<dyn FieldHandler>, priority: i32) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&guard);
        let at = next.partition_point(|e| e.priority >= priority);
        log::debug!("registering field handler {} at priority {priority}", handler.name());
        next.insert(at, Entry { priority, handler });
        *guard = Arc::new(next);
    }

    /// Ordered copy of the registered handlers.
    pub fn handlers(&self) -> Vec<Arc<dyn FieldHandler>> {
        self.snapshot().iter().map(|e| e.handler.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Run every handler over `field`. Later handlers still run after one
    /// marks the field ignored.
    pub fn apply(&self, owner: &TypeIdentity, field: &mut Field) {
        let snapshot = self.snapshot();
        for entry in snapshot.iter() {
            entry.handler.handle(owner, field);
        }
        log::trace!(
            "{owner}.{}: type={:?} object={:?} ignored={}",
            field.name,
            field.ty,
            field.object,
            field.ignored,
        );
    }

    fn snapshot(&self) -> Arc<Vec<Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl std::fmt::Debug for FieldHandlerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.snapshot().iter().map(|e| (e.priority, e.handler.name())))
            .finish()
    }
}

/// The standard handler set with its default priorities.
pub fn standard() -> Vec<(Arc<dyn FieldHandler>, i32)> {
    vec![
        (Arc::new(DeclaredTypeHandler) as Arc<dyn FieldHandler>, DECLARED_TYPE_PRIORITY),
        (Arc::new(AnnotationHandler) as Arc<dyn FieldHandler>, ANNOTATION_PRIORITY),
        (Arc::new(FormatGuessHandler) as Arc<dyn FieldHandler>, FORMAT_GUESS_PRIORITY),
    ]
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use std::sync::Weak;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::JsonType;

    /// Appends its tag to the field description.
    struct Tag(&'static str);

    impl FieldHandler for Tag {
        fn handle(&self, _owner: &TypeIdentity, field: &mut Field) {
            let mut trail = field.description.take().unwrap_or_default();
            trail.push_str(self.0);
            field.description = Some(trail);
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn run(pipeline: &FieldHandlerPipeline) -> String {
        let mut field = Field::new("x");
        pipeline.apply(&TypeIdentity::new("T"), &mut field);
        field.description.unwrap_or_default()
    }

    #[test]
    fn higher_priority_runs_first_and_ties_keep_registration_order() {
        let pipeline = FieldHandlerPipeline::new();
        pipeline.register(Arc::new(Tag("c")), 5);
        pipeline.register(Arc::new(Tag("a")), 10);
        pipeline.register(Arc::new(Tag("d")), 5);
        pipeline.register(Arc::new(Tag("b")), 10);
        pipeline.register(Arc::new(Tag("e")), -1);
        assert_eq!(run(&pipeline), "abcde");
        let names: Vec<_> = pipeline.handlers().iter().map(|h| h.name()).collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn earlier_mutation_is_visible_to_later_handler() {
        struct SetString;
        impl FieldHandler for SetString {
            fn handle(&self, _: &TypeIdentity, field: &mut Field) {
                field.ty = Some(JsonType::String);
            }
        }
        struct WidenString;
        impl FieldHandler for WidenString {
            fn handle(&self, _: &TypeIdentity, field: &mut Field) {
                if field.has_type(JsonType::String) {
                    field.ty = Some(JsonType::Any);
                }
            }
        }
        let pipeline = FieldHandlerPipeline::new();
        pipeline.register(Arc::new(WidenString), 5);
        pipeline.register(Arc::new(SetString), 10);
        let mut field = Field::new("x");
        pipeline.apply(&TypeIdentity::new("T"), &mut field);
        assert_eq!(field.ty, Some(JsonType::Any));
    }

    #[test]
    fn handlers_snapshot_is_detached_from_registry() {
        let pipeline = FieldHandlerPipeline::new();
        pipeline.register(Arc::new(Tag("a")), 1);
        let before = pipeline.handlers();
        pipeline.register(Arc::new(Tag("b")), 2);
        assert_eq!(before.len(), 1);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn registration_during_apply_does_not_change_in_flight_run() {
        struct Registers {
            pipeline: Weak<FieldHandlerPipeline>,
            calls: AtomicUsize,
        }
        impl FieldHandler for Registers {
            fn handle(&self, owner: &TypeIdentity, field: &mut Field) {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(pipeline) = self.pipeline.upgrade() {
                    pipeline.register(Arc::new(Tag("late")), 0);
                }
                Tag("r").handle(owner, field);
            }
        }

        let pipeline = Arc::new(FieldHandlerPipeline::new());
        pipeline.register(
            Arc::new(Registers { pipeline: Arc::downgrade(&pipeline), calls: AtomicUsize::new(0) }),
            1,
        );
        assert_eq!(run(&pipeline), "r");
        assert_eq!(pipeline.len(), 2);
        assert_eq!(run(&pipeline), "rlate");
    }

    #[test]
    fn ignore_does_not_short_circuit_later_handlers() {
        struct Ignore;
        impl FieldHandler for Ignore {
            fn handle(&self, _: &TypeIdentity, field: &mut Field) {
                field.ignored = true;
            }
        }
        struct Unignore;
        impl FieldHandler for Unignore {
            fn handle(&self, _: &TypeIdentity, field: &mut Field) {
                field.ignored = false;
            }
        }
        let pipeline = FieldHandlerPipeline::new();
        pipeline.register(Arc::new(Ignore), 2);
        pipeline.register(Arc::new(Unignore), 1);
        let mut field = Field::new("x");
        pipeline.apply(&TypeIdentity::new("T"), &mut field);
        assert!(!field.ignored);
    }
}
