use std::path::PathBuf;

use crate::types::TypeIdentity;

/// Failures that abort a `compile` call. Nothing is retried and no partial
/// schema is returned.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unknown alias `{alias}`")]
    UnknownAlias { alias: String },

    #[error("cannot introspect type `{identity}`: {reason}")]
    Introspection { identity: TypeIdentity, reason: String },

    /// Recursion went deeper than `CompilerOptions::max_depth`. Either the type
    /// graph is pathological or a cycle slipped past the visit stack.
    #[error("nesting depth {depth} exceeds the limit of {max_depth} while compiling `{alias}`")]
    DepthExceeded {
        alias: String,
        depth: usize,
        max_depth: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog at JSON path {path}: {message}")]
    Parse { path: String, message: String },

    #[error("alias `{0}` is not a valid identifier")]
    InvalidAlias(String),

    #[error("alias `{0}` is defined more than once")]
    DuplicateAlias(String),

    #[error("field `{owner}.{field}` is declared more than once")]
    DuplicateField { owner: String, field: String },

    #[error("field `{owner}.{field}` references unknown alias `{target}`")]
    DanglingReference {
        owner: String,
        field: String,
        target: String,
    },

    #[error("field `{owner}.{field}` has unusable type: {reason}")]
    UnknownType {
        owner: String,
        field: String,
        reason: String,
    },
}

/// One problem found by `validate::validate_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending node.
    pub pointer: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pointer = if self.pointer.is_empty() { "/" } else { &self.pointer };
        write!(f, "{pointer}: {}", self.message)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("schema document has {} violation(s){}", .violations.len(), first_violation(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn first_violation(violations: &[Violation]) -> String {
    violations.first().map(|v| format!("; first: {v}")).unwrap_or_default()
}
