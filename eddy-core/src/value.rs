//! Dynamic value type for message data and condition evaluation.
//!
//! Provides field access by path, field assignment with intermediate object
//! creation, and the truthiness rules used by loop conditions.

use crate::error::{EddyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Largest integer that survives an f64 round trip.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Dynamic value for field access and condition evaluation.
///
/// Wraps serde_json::Value to provide path-based field extraction and
/// mutation used by message annotations and the expression language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub JsonValue);

/// One step of a field path.
#[derive(Debug, Clone, PartialEq)]
enum PathPart<'a> {
    Field(&'a str),
    Index(usize),
}

/// Split a path like `loop.items[2].name` into its parts.
///
/// A leading `$.` is accepted and ignored.
fn parse_path(path: &str) -> Option<Vec<PathPart<'_>>> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    for segment in path.split('.') {
        let (field, mut rest) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };
        if !field.is_empty() {
            parts.push(PathPart::Field(field));
        } else if rest.is_empty() {
            return None;
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let end = stripped.find(']')?;
            let idx: usize = stripped[..end].parse().ok()?;
            parts.push(PathPart::Index(idx));
            rest = &stripped[end + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(parts)
}

impl Value {
    /// Create a null value.
    pub fn null() -> Self {
        Self(JsonValue::Null)
    }

    /// Create a boolean value.
    pub fn bool(v: bool) -> Self {
        Self(JsonValue::Bool(v))
    }

    /// Create an integer value.
    pub fn int(v: i64) -> Self {
        Self(JsonValue::Number(v.into()))
    }

    /// Create a numeric value.
    ///
    /// Integral values within the safe integer range are stored as integers
    /// so that `10.0` and `10` compare equal once serialized. Non-finite
    /// values become null.
    pub fn number(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
            return Self::int(v as i64);
        }
        Self(serde_json::Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number))
    }

    /// Create a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Self(JsonValue::String(v.into()))
    }

    /// Create an empty object.
    pub fn object() -> Self {
        Self(JsonValue::Object(Map::new()))
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Name of the value's JSON type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match &self.0 {
            JsonValue::Null => "null",
            JsonValue::Bool(_) => "boolean",
            JsonValue::Number(_) => "number",
            JsonValue::String(_) => "string",
            JsonValue::Array(_) => "array",
            JsonValue::Object(_) => "object",
        }
    }

    /// Get a field by path (dot notation with optional `[n]` indexes).
    ///
    /// Supports:
    /// - Simple field access: "field"
    /// - Dot notation: "parent.child.value"
    /// - Array indexes: "items[0].name"
    /// - JSONPath prefix: "$.parent.child" -> "parent.child"
    ///
    /// Returns None if the field doesn't exist.
    pub fn get_field(&self, path: &str) -> Option<Value> {
        let parts = parse_path(path)?;
        let mut current = &self.0;
        for part in parts {
            current = match part {
                PathPart::Field(name) => current.get(name)?,
                PathPart::Index(idx) => current.get(idx)?,
            };
        }
        Some(Value(current.clone()))
    }

    /// Set a field by path, creating intermediate objects as needed.
    ///
    /// Non-object intermediates are replaced by objects. Array indexes may
    /// address an existing element or append one past the end.
    pub fn set_field(&mut self, path: &str, value: Value) -> Result<()> {
        let parts = parse_path(path).ok_or_else(|| EddyError::InvalidConfig {
            field: path.to_string(),
            cause: "invalid field path".to_string(),
        })?;

        let mut current = &mut self.0;
        let last = parts.len() - 1;
        for (i, part) in parts.into_iter().enumerate() {
            match part {
                PathPart::Field(name) => {
                    if !current.is_object() {
                        *current = JsonValue::Object(Map::new());
                    }
                    let map = current
                        .as_object_mut()
                        .ok_or_else(|| EddyError::runtime("expected object"))?;
                    if i == last {
                        map.insert(name.to_string(), value.0);
                        return Ok(());
                    }
                    current = map.entry(name.to_string()).or_insert(JsonValue::Null);
                }
                PathPart::Index(idx) => {
                    let arr = current.as_array_mut().ok_or_else(|| {
                        EddyError::runtime(format!("cannot index non-array with [{}]", idx))
                    })?;
                    if idx > arr.len() {
                        return Err(EddyError::runtime(format!(
                            "index {} out of bounds for array of length {}",
                            idx,
                            arr.len()
                        )));
                    }
                    if idx == arr.len() {
                        arr.push(JsonValue::Null);
                    }
                    if i == last {
                        arr[idx] = value.0;
                        return Ok(());
                    }
                    current = &mut arr[idx];
                }
            }
        }
        Ok(())
    }

    /// Remove a field by path, returning the previous value.
    pub fn remove_field(&mut self, path: &str) -> Option<Value> {
        let parts = parse_path(path)?;
        let (last, parents) = parts.split_last()?;

        let mut current = &mut self.0;
        for part in parents {
            current = match part {
                PathPart::Field(name) => current.get_mut(*name)?,
                PathPart::Index(idx) => current.get_mut(*idx)?,
            };
        }
        match last {
            PathPart::Field(name) => current.as_object_mut()?.remove(*name).map(Value),
            PathPart::Index(idx) => {
                let arr = current.as_array_mut()?;
                (*idx < arr.len()).then(|| Value(arr.remove(*idx)))
            }
        }
    }

    /// Get a field as a string.
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get_field(path).and_then(|v| v.as_string())
    }

    /// Get a field as an f64.
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get_field(path).and_then(|v| v.as_f64())
    }

    /// Convert to string if possible.
    pub fn as_string(&self) -> Option<String> {
        match &self.0 {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null => None,
            _ => Some(self.0.to_string()),
        }
    }

    /// Convert to f64 if possible.
    ///
    /// Numeric strings are parsed after trimming whitespace.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness as used by loop conditions.
    ///
    /// `null`, `false`, `0`, `NaN` and the empty string are falsy; everything
    /// else, including empty arrays and objects, is truthy.
    pub fn is_truthy(&self) -> bool {
        match &self.0 {
            JsonValue::Null => false,
            JsonValue::Bool(b) => *b,
            JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
            JsonValue::String(s) => !s.is_empty(),
            JsonValue::Array(_) | JsonValue::Object(_) => true,
        }
    }

    /// Access the inner serde_json::Value.
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert into the inner serde_json::Value.
    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        v.0
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_nested_field_access() {
        let value = Value(json!({
            "result": {
                "status": "success",
                "data": {
                    "count": 42
                }
            }
        }));

        assert_eq!(
            value.get_string("result.status"),
            Some("success".to_string())
        );
        assert_eq!(value.get_f64("result.data.count"), Some(42.0));
        assert_eq!(value.get_f64("$.result.data.count"), Some(42.0));
    }

    #[test]
    fn value_array_access() {
        let value = Value(json!({
            "items": [
                {"name": "first"},
                {"name": "second"}
            ],
            "grid": [[1, 2], [3, 4]]
        }));

        assert_eq!(value.get_string("items[0].name"), Some("first".to_string()));
        assert_eq!(value.get_f64("grid[1][0]"), Some(3.0));
        assert!(value.get_field("items[5]").is_none());
    }

    #[test]
    fn set_field_creates_intermediates() {
        let mut value = Value(json!({"payload": 1}));
        value.set_field("loop.passed.total", Value::int(3)).unwrap();
        value.set_field("loop.index", Value::int(0)).unwrap();

        assert_eq!(
            value.0,
            json!({"payload": 1, "loop": {"index": 0, "passed": {"total": 3}}})
        );
    }

    #[test]
    fn set_field_replaces_scalar_intermediate() {
        let mut value = Value(json!({"loop": 5}));
        value.set_field("loop.index", Value::int(1)).unwrap();
        assert_eq!(value.0, json!({"loop": {"index": 1}}));
    }

    #[test]
    fn set_field_on_array() {
        let mut value = Value(json!({"items": [1, 2]}));
        value.set_field("items[1]", Value::int(9)).unwrap();
        value.set_field("items[2]", Value::int(7)).unwrap();
        assert_eq!(value.0, json!({"items": [1, 9, 7]}));
        assert!(value.set_field("items[9]", Value::int(0)).is_err());
    }

    #[test]
    fn remove_field() {
        let mut value = Value(json!({"command": "break", "loop": {"index": 2}}));
        assert_eq!(value.remove_field("command"), Some(Value::string("break")));
        assert_eq!(value.remove_field("loop.index"), Some(Value::int(2)));
        assert_eq!(value.remove_field("missing"), None);
        assert_eq!(value.0, json!({"loop": {}}));
    }

    #[test]
    fn number_normalizes_integers() {
        assert_eq!(Value::number(10.0).0, json!(10));
        assert_eq!(Value::number(-2.0).0, json!(-2));
        assert_eq!(Value::number(0.5).0, json!(0.5));
        assert!(Value::number(f64::NAN).is_null());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::null().is_truthy());
        assert!(!Value::bool(false).is_truthy());
        assert!(!Value::int(0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("0").is_truthy());
        assert!(Value(json!([])).is_truthy());
        assert!(Value(json!({})).is_truthy());
        assert!(Value::number(-0.5).is_truthy());
    }

    #[test]
    fn numeric_strings_convert() {
        assert_eq!(Value::string(" 12 ").as_f64(), Some(12.0));
        assert_eq!(Value::string("twelve").as_f64(), None);
        assert_eq!(Value::bool(true).as_f64(), None);
    }

    #[test]
    fn missing_field_returns_none() {
        let value = Value(json!({"a": 1}));
        assert!(value.get_field("missing").is_none());
        assert!(value.get_f64("missing").is_none());
        assert!(value.get_field("").is_none());
    }
}
