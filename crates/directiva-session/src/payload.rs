//! Session payload: the encoded key/value map carried by every session
//!
//! Payloads are stored as base64-wrapped canonical JSON. Two keys are
//! load-bearing: `_auth_user_id` holds the authenticated user's primary
//! key **in string form**, and `empresa_db` holds the selected tenant
//! slug (or is absent, or holds the `"default"` sentinel). All other
//! keys round-trip untouched.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Payload key holding the authenticated user's primary key.
pub const AUTH_USER_KEY: &str = "_auth_user_id";

/// Payload key holding the selected tenant slug.
pub const TENANT_KEY: &str = "empresa_db";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Decoded session payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPayload(Map<String, Value>);

impl SessionPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The authenticated user's primary key, if any.
    ///
    /// Only the stored string form is returned; comparisons against it
    /// must be made on string forms as well. A non-string value under
    /// the key is treated as absent.
    pub fn auth_user_id(&self) -> Option<&str> {
        self.0.get(AUTH_USER_KEY).and_then(Value::as_str)
    }

    /// Mark the session authenticated as `user_id`, stored in string form.
    pub fn set_auth_user_id(&mut self, user_id: i64) {
        self.0
            .insert(AUTH_USER_KEY.to_string(), Value::String(user_id.to_string()));
    }

    /// Raw tenant slug under `empresa_db`, if any. The `"default"`
    /// sentinel is returned as-is; interpreting it is the resolver's job.
    pub fn tenant_slug(&self) -> Option<&str> {
        self.0.get(TENANT_KEY).and_then(Value::as_str)
    }

    pub fn set_tenant_slug(&mut self, slug: &str) {
        self.0
            .insert(TENANT_KEY.to_string(), Value::String(slug.to_string()));
    }

    /// Drop the tenant selection, falling back to the default database
    /// on the next resolution.
    pub fn clear_tenant(&mut self) {
        self.0.remove(TENANT_KEY);
    }

    /// Encode as base64-wrapped JSON for storage.
    pub fn encode(&self) -> String {
        // Map<String, Value> serialization cannot fail
        let json = serde_json::to_vec(&self.0).expect("payload serialization");
        BASE64.encode(json)
    }

    /// Decode a stored payload.
    ///
    /// # Errors
    /// - `PayloadError::Base64` / `PayloadError::Json` on corrupt input
    /// - `PayloadError::NotAnObject` if the JSON root is not an object
    pub fn decode(encoded: &str) -> Result<Self, PayloadError> {
        let bytes = BASE64.decode(encoded)?;
        let value: Value = serde_json::from_slice(&bytes)?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(PayloadError::NotAnObject),
        }
    }
}
