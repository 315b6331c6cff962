//! Field schema for request/response log records.
//!
//! Every record emitted by the middleware carries the same flat set of
//! attributes. Each attribute has a default so that any template referencing
//! it can always be rendered, even when the middleware could not capture the
//! value (unreadable body, missing header, no connect info).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat mapping of field name to value attached to a log record.
///
/// Strings render verbatim, numbers as numbers and `null` as the empty
/// string.
pub type Fields = Map<String, Value>;

/// Recognized schema keys, in schema order.
pub const FIELD_NAMES: [&str; 19] = [
    "application_name",
    "request_uri",
    "request_referrer",
    "request_protocol",
    "request_method",
    "request_path",
    "request_host",
    "request_size",
    "request_content_type",
    "request_headers",
    "request_body",
    "request_direction",
    "remote_ip",
    "remote_port",
    "response_status_code",
    "response_size",
    "response_headers",
    "response_body",
    "duration",
];

const INTEGER_FIELDS: [&str; 4] = ["request_size", "response_size", "response_status_code", "duration"];

/// Status code as captured: numeric once a response exists, empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusField {
    Code(u16),
    Text(String),
}

impl Default for StatusField {
    fn default() -> Self {
        StatusField::Text(String::new())
    }
}

/// Typed view of the request/response part of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestResponseFields {
    pub application_name: String,
    pub request_uri: String,
    pub request_referrer: String,
    pub request_protocol: String,
    pub request_method: String,
    pub request_path: String,
    pub request_host: String,
    pub request_size: Option<u64>,
    pub request_content_type: String,
    pub request_headers: String,
    pub request_body: String,
    pub request_direction: String,
    pub remote_ip: String,
    pub remote_port: String,
    pub response_status_code: StatusField,
    pub response_size: Option<u64>,
    pub response_headers: String,
    pub response_body: String,
    /// Milliseconds.
    pub duration: Option<u64>,
}

impl Default for RequestResponseFields {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            request_uri: String::new(),
            request_referrer: String::new(),
            request_protocol: String::new(),
            request_method: String::new(),
            request_path: String::new(),
            request_host: String::new(),
            request_size: None,
            request_content_type: String::new(),
            request_headers: String::new(),
            request_body: String::new(),
            request_direction: String::new(),
            remote_ip: String::new(),
            remote_port: String::new(),
            response_status_code: StatusField::default(),
            response_size: None,
            response_headers: String::new(),
            response_body: String::new(),
            duration: Some(0),
        }
    }
}

impl RequestResponseFields {
    /// Convert into a flat field mapping containing every schema key.
    pub fn into_fields(self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Strings, integers and options always serialize to an object.
            _ => Fields::new(),
        }
    }
}

/// The full field mapping with default values.
pub fn defaults() -> Fields {
    RequestResponseFields::default().into_fields()
}

/// Recognized schema keys.
pub fn field_names() -> &'static [&'static str] {
    &FIELD_NAMES
}

pub fn is_field(name: &str) -> bool {
    FIELD_NAMES.contains(&name)
}

/// Whether the schema types this key as an integer.
pub fn is_integer_field(name: &str) -> bool {
    INTEGER_FIELDS.contains(&name)
}

/// Default value for a schema key, `None` for unknown keys.
pub fn default_for(name: &str) -> Option<Value> {
    if !is_field(name) {
        return None;
    }
    defaults().remove(name)
}

/// Render a field value the way templates print it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
