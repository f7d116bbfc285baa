/// Produces the externally addressable identifier stamped on a schema.
pub trait IdentifierGenerator: Send + Sync {
    fn url_for(&self, alias: &str) -> String;
}

pub const DEFAULT_BASE_URL: &str = "http://localhost/schemas";

/// `{base}/{alias}.json#`
#[derive(Debug, Clone)]
pub struct UrlIdentifiers {
    base: String,
}

impl UrlIdentifiers {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self { base: base.trim_end_matches('/').to_string() }
    }
}

impl Default for UrlIdentifiers {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl IdentifierGenerator for UrlIdentifiers {
    fn url_for(&self, alias: &str) -> String {
        format!("{}/{alias}.json#", self.base)
    }
}
