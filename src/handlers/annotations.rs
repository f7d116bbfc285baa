use crate::handlers::FieldHandler;
use crate::model::Field;
use crate::types::TypeIdentity;

/// Copies declaration annotations onto the field: ignore flag, type override,
/// descriptive metadata and value constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationHandler;

impl FieldHandler for AnnotationHandler {
    fn handle(&self, owner: &TypeIdentity, field: &mut Field) {
        let Some(declared) = field.declared.as_ref() else { return };
        let a = declared.annotations.clone();

        if a.ignore {
            log::trace!("{owner}.{}: ignored by annotation", field.name);
            field.ignored = true;
        }
        if let Some(ty) = a.schema_type {
            field.ty = Some(ty);
            if ty.is_primitive() {
                field.object = None;
            }
        }
        if a.required {
            field.required = true;
        }
        if a.title.is_some() {
            field.title = a.title;
        }
        if a.description.is_some() {
            field.description = a.description;
        }
        if a.format.is_some() {
            field.format = a.format;
        }
        if a.minimum.is_some() {
            field.minimum = a.minimum;
        }
        if a.maximum.is_some() {
            field.maximum = a.maximum;
        }
        if a.min_length.is_some() {
            field.min_length = a.min_length;
        }
        if a.max_length.is_some() {
            field.max_length = a.max_length;
        }
        if a.pattern.is_some() {
            field.pattern = a.pattern;
        }
        if let Some(values) = a.enum_ {
            field.enum_ = values;
        }
        if a.default.is_some() {
            field.default = a.default;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::DeclaredTypeHandler;
    use crate::model::JsonType;
    use crate::types::{FieldAnnotations, FieldDescriptor, FieldShape};

    fn annotated(shape: FieldShape, annotations: FieldAnnotations) -> Field {
        let owner = TypeIdentity::new("Owner");
        let mut field = Field::new("f");
        field.declared = Some(FieldDescriptor::new("f", shape).with_annotations(annotations));
        DeclaredTypeHandler.handle(&owner, &mut field);
        AnnotationHandler.handle(&owner, &mut field);
        field
    }

    #[test]
    fn constraints_are_copied() {
        let field = annotated(
            FieldShape::Primitive(JsonType::String),
            FieldAnnotations {
                min_length: Some(1),
                max_length: Some(80),
                pattern: Some("^[a-z]+$".into()),
                required: true,
                ..FieldAnnotations::default()
            },
        );
        assert_eq!(field.min_length, Some(1));
        assert_eq!(field.max_length, Some(80));
        assert_eq!(field.pattern.as_deref(), Some("^[a-z]+$"));
        assert!(field.required);
        assert!(!field.ignored);
    }

    #[test]
    fn primitive_override_drops_object_reference() {
        let field = annotated(
            FieldShape::Object(TypeIdentity::new("Book")),
            FieldAnnotations { schema_type: Some(JsonType::String), ..FieldAnnotations::default() },
        );
        assert_eq!(field.ty, Some(JsonType::String));
        assert_eq!(field.nested_target(), None);
    }

    #[test]
    fn ignore_annotation_marks_field() {
        let field = annotated(
            FieldShape::Object(TypeIdentity::new("Book")),
            FieldAnnotations { ignore: true, ..FieldAnnotations::default() },
        );
        assert!(field.ignored);
        assert_eq!(field.nested_target(), None);
    }
}
