use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Accept either a bare array or a `{ "data": [...] }` envelope
pub fn unwrap_collection(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(ApiError::decode(format!(
                "expected array under 'data', got {}",
                kind(&other)
            ))),
            None => Err(ApiError::decode("expected array or object with 'data'")),
        },
        other => Err(ApiError::decode(format!("expected array, got {}", kind(&other)))),
    }
}

/// Accept either a bare object or a `{ "data": {...} }` envelope
pub fn unwrap_item(body: Value) -> Result<Value, ApiError> {
    match body {
        Value::Object(mut obj) => match obj.remove("data") {
            Some(inner @ Value::Object(_)) => Ok(inner),
            Some(other) => {
                // a record that really has a scalar "data" field
                obj.insert("data".to_string(), other);
                Ok(Value::Object(obj))
            }
            None => Ok(Value::Object(obj)),
        },
        other => Err(ApiError::decode(format!("expected object, got {}", kind(&other)))),
    }
}

pub fn decode_collection<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, ApiError> {
    unwrap_collection(body)?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(ApiError::from))
        .collect()
}

pub fn decode_item<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(unwrap_item(body)?)?)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
