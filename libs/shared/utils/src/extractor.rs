use std::collections::{BTreeMap, HashMap};

use axum::extract::Query;
use http::Uri;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

use shared_models::error::AppError;

/// `cred_id` and `region` as accepted by every cloud route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloudParams {
    pub cred_id: Option<String>,
    pub region: Option<String>,
}

impl CloudParams {
    pub fn from_uri(uri: &Uri) -> Self {
        Query::<CloudParams>::try_from_uri(uri)
            .map(|Query(params)| params)
            .unwrap_or_default()
    }

    pub fn cred_id(&self) -> Option<&str> {
        self.cred_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The requested region, treating `""` and `"undefined"` as not given.
    pub fn region(&self) -> Option<&str> {
        self.region
            .as_deref()
            .filter(|region| !region.is_empty() && *region != "undefined")
    }
}

/// Parses a request body that must be a JSON object.
pub fn body_to_json(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest("Request body must be a JSON object".to_string())),
        Err(e) => Err(AppError::BadRequest(format!("Invalid JSON body: {}", e))),
    }
}

/// Removes `key` from a wrapped body such as `{"alarm": {...}}` and decodes it.
pub fn take_member<T>(body: &mut Map<String, Value>, key: &str) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    match body.remove(key) {
        None | Some(Value::Null) => Err(AppError::BadRequest(format!("Missing '{}' in request body", key))),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Invalid '{}': {}", key, e))),
    }
}

/// Collects `prefix[Key]=value` query pairs into `Key -> value`.
pub fn bracket_params(params: &HashMap<String, String>, prefix: &str) -> BTreeMap<String, String> {
    params
        .iter()
        .filter_map(|(name, value)| {
            let inner = name.strip_prefix(prefix)?.strip_prefix('[')?.strip_suffix(']')?;
            (!inner.is_empty()).then(|| (inner.to_string(), value.clone()))
        })
        .collect()
}

/// Returns the parameter when present and non-blank.
pub fn required_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str, AppError> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required parameter '{}'", name)))
}
