// Client-side API error types
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Failure surfaced by the REST collaborator or the transport beneath it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    // 401 Unauthorized, or a rejected login/register
    #[error("{message}")]
    Auth {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // No response at all (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    // 400 / 422, server rejected the payload
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 404, usually a stale identifier on update/delete
    #[error("{0}")]
    NotFound(String),

    // 403, or a mutation the caller's role does not permit
    #[error("{0}")]
    Forbidden(String),

    // Any other non-success status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    // Response body could not be understood
    #[error("Unexpected response: {0}")]
    Decode(String),
}

const FALLBACK_MESSAGE: &str = "Something went wrong, please try again";

impl ApiError {
    /// Build an error from a non-success HTTP status and its (possibly empty) JSON body
    pub fn from_status(status: u16, body: &Value) -> Self {
        let message = extract_message(body).unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        let field_errors = extract_field_errors(body);

        match status {
            400 | 422 => ApiError::Validation { message, field_errors },
            401 => ApiError::Auth { message, field_errors },
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            _ => ApiError::Server { status, message },
        }
    }

    /// Re-tag any failure from an auth endpoint as an auth failure, keeping its message.
    ///
    /// Network and auth failures on login/register are reported as the same kind.
    pub fn into_auth(self) -> Self {
        match self {
            ApiError::Auth { .. } => self,
            ApiError::Validation { message, field_errors } => ApiError::Auth { message, field_errors },
            other => ApiError::Auth {
                message: other.message(),
                field_errors: None,
            },
        }
    }

    /// Human-readable message suitable for a notification
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth { message, .. } => message.clone(),
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::Network(msg) => format!("Network error: {}", msg),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Decode(msg) => format!("Unexpected response: {}", msg),
        }
    }

    /// Field-scoped messages, when the server attached any
    pub fn field_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            ApiError::Auth { field_errors, .. } => field_errors.as_ref(),
            ApiError::Validation { field_errors, .. } => field_errors.as_ref(),
            _ => None,
        }
    }

    /// Stable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Auth { .. } => "AUTH_ERROR",
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Server { .. } => "SERVER_ERROR",
            ApiError::Decode(_) => "DECODE_ERROR",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }
}

// Static constructor methods
impl ApiError {
    pub fn auth(message: impl Into<String>) -> Self {
        ApiError::Auth {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network(message.into())
    }

    pub fn validation(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::Decode(message.into())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

fn extract_message(body: &Value) -> Option<String> {
    if let Value::String(s) = body {
        return (!s.trim().is_empty()).then(|| s.clone());
    }
    ["message", "error", "detail"]
        .iter()
        .filter_map(|key| body.get(key))
        .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
}

fn extract_field_errors(body: &Value) -> Option<HashMap<String, String>> {
    let obj = ["errors", "field_errors"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_object))?;

    let mut out = HashMap::new();
    for (field, v) in obj {
        let msg = match v {
            Value::String(s) => Some(s.clone()),
            // Laravel-style: { "email": ["The email has already been taken."] }
            Value::Array(arr) => arr.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        if let Some(msg) = msg {
            out.insert(field.clone(), msg);
        }
    }
    (!out.is_empty()).then_some(out)
}
