//! Serde-deserializable types matching Firestore REST responses.
//!
//! Firestore wraps every field value in a typed envelope
//! (`{"stringValue": "..."}`, `{"arrayValue": {"values": [...]}}`, ...).
//! These types unwrap it so the rest of the crate sees plain JSON.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use super::Document;

// ============================================================================
// documents:list response
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiListResponse {
  #[serde(default)]
  pub documents: Vec<ApiDocument>,
  #[serde(rename = "nextPageToken")]
  pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiDocument {
  /// Full resource name, e.g. `projects/p/databases/(default)/documents/proyectos/abc`
  pub name: String,
  #[serde(default)]
  pub fields: Map<String, Value>,
  #[serde(rename = "updateTime")]
  pub update_time: Option<String>,
}

impl ApiDocument {
  pub fn into_document(self) -> Document {
    let id = self
      .name
      .rsplit('/')
      .next()
      .unwrap_or(&self.name)
      .to_string();

    let fields = self
      .fields
      .iter()
      .map(|(key, value)| (key.clone(), decode_value(value)))
      .collect();

    Document {
      id,
      fields,
      update_time: self.update_time,
    }
  }
}

// ============================================================================
// Typed value decoding
// ============================================================================

/// Convert a Firestore typed value into plain JSON.
///
/// Unknown or malformed envelopes decode to `null`.
pub fn decode_value(value: &Value) -> Value {
  let Some(object) = value.as_object() else {
    return Value::Null;
  };
  let Some((kind, inner)) = object.iter().next() else {
    return Value::Null;
  };

  match kind.as_str() {
    "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
    "booleanValue" => inner.clone(),
    "nullValue" => Value::Null,
    // 64-bit integers travel as strings
    "integerValue" => match inner {
      Value::String(s) => s
        .parse::<i64>()
        .map(|n| Value::Number(n.into()))
        .unwrap_or(Value::Null),
      Value::Number(n) => Value::Number(n.clone()),
      _ => Value::Null,
    },
    "doubleValue" => match inner {
      Value::Number(n) => Value::Number(n.clone()),
      // NaN and Infinity are sent as strings and have no JSON form
      Value::String(s) => s
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null),
      _ => Value::Null,
    },
    "arrayValue" => {
      let values = inner
        .get("values")
        .and_then(Value::as_array)
        .map(|values| values.iter().map(decode_value).collect())
        .unwrap_or_default();
      Value::Array(values)
    }
    "mapValue" => {
      let fields = inner
        .get("fields")
        .and_then(Value::as_object)
        .map(|fields| {
          fields
            .iter()
            .map(|(key, value)| (key.clone(), decode_value(value)))
            .collect()
        })
        .unwrap_or_default();
      Value::Object(fields)
    }
    "geoPointValue" => inner.clone(),
    _ => Value::Null,
  }
}
