//! Post-hoc structural check of a rendered schema document.
//!
//! Not a general meta-schema validator: it checks the subset of draft-03 that
//! this crate emits, and reports every violation with its JSON pointer.
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ValidationError, Violation};

const KNOWN_TYPES: &[&str] = &[
    "string", "integer", "number", "boolean", "object", "array", "null", "any",
];

pub fn validate_document(doc: &Value) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    match doc.as_object() {
        None => push(&mut violations, "", "document root must be an object"),
        Some(root) => {
            if !root.get("$schema").is_some_and(Value::is_string) {
                push(&mut violations, "", "missing `$schema` string");
            }
            if root.get("type").and_then(Value::as_str) != Some("object") {
                push(&mut violations, "", "root `type` must be \"object\"");
            }
            check_schema(root, "", &mut violations);
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn check_schema(node: &Map<String, Value>, pointer: &str, out: &mut Vec<Violation>) {
    if let Some(reference) = node.get("$ref") {
        if !reference.is_string() {
            push(out, pointer, "`$ref` must be a string");
        }
    } else if let Some(ty) = node.get("type") {
        match ty.as_str() {
            Some(t) if KNOWN_TYPES.contains(&t) => {}
            Some(t) => push(out, pointer, &format!("unknown type `{t}`")),
            None => push(out, pointer, "`type` must be a string"),
        }
    } else if !pointer.is_empty() {
        // the root's missing type is reported by `validate_document`
        push(out, pointer, "property needs `type` or `$ref`");
    }

    if let Some(required) = node.get("required") {
        if !required.is_boolean() {
            push(out, pointer, "`required` must be a boolean");
        }
    }
    for key in ["minimum", "maximum"] {
        if node.get(key).is_some_and(|v| !v.is_number()) {
            push(out, pointer, &format!("`{key}` must be a number"));
        }
    }
    for key in ["minLength", "maxLength"] {
        if node.get(key).is_some_and(|v| !v.is_u64()) {
            push(out, pointer, &format!("`{key}` must be a non-negative integer"));
        }
    }
    if let Some(pattern) = node.get("pattern") {
        match pattern.as_str() {
            Some(p) => {
                if let Err(error) = Regex::new(p) {
                    push(out, pointer, &format!("`pattern` does not compile: {error}"));
                }
            }
            None => push(out, pointer, "`pattern` must be a string"),
        }
    }
    if node.get("enum").is_some_and(|v| !v.as_array().is_some_and(|xs| !xs.is_empty())) {
        push(out, pointer, "`enum` must be a non-empty array");
    }

    if let Some(props) = node.get("properties") {
        match props.as_object() {
            None => push(out, pointer, "`properties` must be an object"),
            Some(props) => {
                for (name, prop) in props {
                    let child = format!("{pointer}/properties/{}", escape_pointer(name));
                    match prop.as_object() {
                        Some(prop) => check_schema(prop, &child, out),
                        None => push(out, &child, "property schema must be an object"),
                    }
                }
            }
        }
    }
    if let Some(items) = node.get("items") {
        let child = format!("{pointer}/items");
        match items.as_object() {
            Some(items) => check_schema(items, &child, out),
            None => push(out, &child, "`items` must be a schema object"),
        }
    }
}

fn push(out: &mut Vec<Violation>, pointer: &str, message: &str) {
    out.push(Violation { pointer: pointer.to_string(), message: message.to_string() });
}

// RFC 6901
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
