use serde::de::DeserializeOwned;

use crate::error::CatalogError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, CatalogError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_catalog_error)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, CatalogError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_catalog_error)
}

fn into_catalog_error(err: serde_path_to_error::Error<serde_json::Error>) -> CatalogError {
    let path = err.path().to_string();
    CatalogError::Parse { path, message: err.into_inner().to_string() }
}
