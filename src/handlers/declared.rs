use crate::handlers::FieldHandler;
use crate::model::{Field, JsonType};
use crate::types::{FieldShape, TypeIdentity};

/// Classifies a field from the shape it was declared with.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredTypeHandler;

impl FieldHandler for DeclaredTypeHandler {
    fn handle(&self, _owner: &TypeIdentity, field: &mut Field) {
        let Some(declared) = field.declared.as_ref() else { return };
        let shape = declared.shape.clone();
        match shape {
            FieldShape::Primitive(ty) => {
                field.ty = Some(ty);
            }
            FieldShape::Object(target) => {
                field.ty = Some(JsonType::Object);
                field.object = Some(target);
            }
            FieldShape::Collection(inner) => {
                field.ty = Some(JsonType::Array);
                match *inner {
                    FieldShape::Primitive(item) => field.items = Some(item),
                    FieldShape::Object(target) => field.object = Some(target),
                    // list of lists: keep the outer array, inner stays untyped
                    FieldShape::Collection(_) => field.items = Some(JsonType::Array),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDescriptor;

    fn classify(shape: FieldShape) -> Field {
        let mut field = Field::new("f");
        field.declared = Some(FieldDescriptor::new("f", shape));
        DeclaredTypeHandler.handle(&TypeIdentity::new("Owner"), &mut field);
        field
    }

    #[test]
    fn object_reference_becomes_nested_target() {
        let field = classify(FieldShape::Object(TypeIdentity::new("Book")));
        assert_eq!(field.ty, Some(JsonType::Object));
        assert_eq!(field.nested_target(), Some(&TypeIdentity::new("Book")));
    }

    #[test]
    fn collections_classify_items() {
        let books = classify(FieldShape::Collection(Box::new(FieldShape::Object(TypeIdentity::new("Book")))));
        assert_eq!(books.ty, Some(JsonType::Array));
        assert_eq!(books.nested_target(), Some(&TypeIdentity::new("Book")));

        let tags = classify(FieldShape::Collection(Box::new(FieldShape::Primitive(JsonType::String))));
        assert_eq!(tags.items, Some(JsonType::String));
        assert_eq!(tags.nested_target(), None);
    }

    #[test]
    fn undeclared_fields_are_left_alone() {
        let mut field = Field::new("f");
        DeclaredTypeHandler.handle(&TypeIdentity::new("Owner"), &mut field);
        DeclaredTypeHandler.handle(&TypeIdentity::new("Owner"), &mut field);
        assert_eq!(field, Field::new("f"));
    }
}
