//! Fixture serialization.
//!
//! Fixtures are JSON arrays of `{model, pk, fields}` objects. The
//! [`Serializer`] trait turns such arrays into strings and back; `loaddata`
//! consumes the compact form, and the pretty form is what fixture files in
//! the repository are written in.

use scriptorium_core::ScriptoriumError;

/// Converts fixture object arrays to and from strings.
pub trait Serializer: Send + Sync {
    /// Encodes the objects into a string.
    fn serialize(&self, objects: &[serde_json::Value]) -> Result<String, ScriptoriumError>;

    /// Decodes a string into fixture objects.
    ///
    /// The top-level value must be an array.
    fn deserialize(&self, data: &str) -> Result<Vec<serde_json::Value>, ScriptoriumError>;
}

fn decode(data: &str) -> Result<Vec<serde_json::Value>, ScriptoriumError> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| ScriptoriumError::SerializationError(e.to_string()))?;
    match value {
        serde_json::Value::Array(objects) => Ok(objects),
        other => Err(ScriptoriumError::SerializationError(format!(
            "Expected a fixture array, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Compact, single-line JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, objects: &[serde_json::Value]) -> Result<String, ScriptoriumError> {
        serde_json::to_string(objects)
            .map_err(|e| ScriptoriumError::SerializationError(e.to_string()))
    }

    fn deserialize(&self, data: &str) -> Result<Vec<serde_json::Value>, ScriptoriumError> {
        decode(data)
    }
}

/// Indented JSON, the format fixture files are committed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJsonSerializer;

impl Serializer for PrettyJsonSerializer {
    fn serialize(&self, objects: &[serde_json::Value]) -> Result<String, ScriptoriumError> {
        let mut encoded = serde_json::to_string_pretty(objects)
            .map_err(|e| ScriptoriumError::SerializationError(e.to_string()))?;
        encoded.push('\n');
        Ok(encoded)
    }

    fn deserialize(&self, data: &str) -> Result<Vec<serde_json::Value>, ScriptoriumError> {
        decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_roundtrip() {
        let objects = vec![
            json!({"model": "base.flatpage", "pk": 1, "fields": {"url": "/pages/terms/"}}),
        ];
        let encoded = JsonSerializer.serialize(&objects).unwrap();
        assert!(!encoded.contains('\n'));
        assert_eq!(JsonSerializer.deserialize(&encoded).unwrap(), objects);
    }

    #[test]
    fn test_pretty_roundtrip_ends_with_newline() {
        let objects = vec![json!({"model": "style.documentstyle", "pk": 1, "fields": {}})];
        let encoded = PrettyJsonSerializer.serialize(&objects).unwrap();
        assert!(encoded.ends_with("]\n"));
        assert_eq!(PrettyJsonSerializer.deserialize(&encoded).unwrap(), objects);
    }

    #[test]
    fn test_empty_fixture() {
        assert_eq!(JsonSerializer.serialize(&[]).unwrap(), "[]");
        assert!(JsonSerializer.deserialize("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_input() {
        assert!(JsonSerializer.deserialize("not valid json").is_err());
    }

    #[test]
    fn test_non_array_input() {
        let err = JsonSerializer
            .deserialize(r#"{"model": "base.flatpage"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("an object"));
    }
}
