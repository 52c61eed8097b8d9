//! Messages flowing through the graph.
//!
//! A message is a JSON object with a reserved `_msgid` field holding its
//! identifier, a conventional `payload` field, and any number of other
//! properties that nodes read and annotate.

use crate::error::{EddyError, Result};
use crate::types::MessageId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Field holding the message identifier.
pub const MSG_ID_FIELD: &str = "_msgid";

/// Field holding the message payload.
pub const PAYLOAD_FIELD: &str = "payload";

/// Field holding an optional control command.
pub const COMMAND_FIELD: &str = "command";

/// A message travelling through the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "JsonValue")]
pub struct Message {
    body: Value,
}

impl Message {
    /// Create a message with a fresh identifier and the given payload.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self::with_id(MessageId::new(), payload)
    }

    /// Create a message with an explicit identifier.
    pub fn with_id(id: MessageId, payload: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(MSG_ID_FIELD.to_string(), JsonValue::String(id.to_string()));
        map.insert(PAYLOAD_FIELD.to_string(), payload.into().into_inner());
        Self {
            body: Value(JsonValue::Object(map)),
        }
    }

    /// Build a message from a JSON object.
    ///
    /// A missing `_msgid` is filled with a fresh identifier.
    pub fn from_value(value: impl Into<Value>) -> Result<Self> {
        let mut body = value.into();
        let map = match &mut body.0 {
            JsonValue::Object(map) => map,
            other => {
                return Err(EddyError::Serialization(format!(
                    "message must be a JSON object, got {}",
                    Value(other.clone()).type_name()
                )));
            }
        };
        match map.get(MSG_ID_FIELD) {
            Some(JsonValue::String(_)) => {}
            Some(other) => {
                let id = other.to_string();
                map.insert(MSG_ID_FIELD.to_string(), JsonValue::String(id));
            }
            None => {
                map.insert(
                    MSG_ID_FIELD.to_string(),
                    JsonValue::String(MessageId::new().to_string()),
                );
            }
        }
        Ok(Self { body })
    }

    /// Builder-style setter for an arbitrary property.
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(path, value)?;
        Ok(self)
    }

    /// The message identifier.
    pub fn id(&self) -> MessageId {
        self.body
            .get_string(MSG_ID_FIELD)
            .map(MessageId::from)
            .unwrap_or_else(|| MessageId::from(""))
    }

    /// The payload, or null when the message has none.
    pub fn payload(&self) -> Value {
        self.body.get_field(PAYLOAD_FIELD).unwrap_or_default()
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: impl Into<Value>) {
        if let JsonValue::Object(map) = &mut self.body.0 {
            map.insert(PAYLOAD_FIELD.to_string(), payload.into().into_inner());
        }
    }

    /// The control command, if the message carries a string one.
    pub fn command(&self) -> Option<String> {
        match self.body.inner().get(COMMAND_FIELD) {
            Some(JsonValue::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Remove the control command marker.
    pub fn clear_command(&mut self) {
        self.body.remove_field(COMMAND_FIELD);
    }

    /// Read a property by path (e.g. `loop.index`).
    pub fn get(&self, path: &str) -> Option<Value> {
        self.body.get_field(path)
    }

    /// Set a property by path, creating intermediate objects.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.body.set_field(path, value.into())
    }

    /// Remove a property by path.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.body.remove_field(path)
    }

    /// View the whole message as a value.
    pub fn as_value(&self) -> &Value {
        &self.body
    }

    /// Mutable view of the whole message.
    ///
    /// Callers must keep the body a JSON object.
    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Consume the message into its JSON representation.
    pub fn into_value(self) -> Value {
        self.body
    }
}

impl TryFrom<JsonValue> for Message {
    type Error = EddyError;

    fn try_from(value: JsonValue) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Message> for JsonValue {
    fn from(msg: Message) -> Self {
        msg.body.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_message_has_id_and_payload() {
        let msg = Message::with_id(MessageId::from("m1"), "hello");
        assert_eq!(msg.id(), MessageId::from("m1"));
        assert_eq!(msg.payload(), Value::string("hello"));
        assert_eq!(
            msg.as_value().0,
            json!({"_msgid": "m1", "payload": "hello"})
        );
    }

    #[test]
    fn from_value_fills_missing_id() {
        let msg = Message::from_value(json!({"payload": 1})).unwrap();
        assert_eq!(msg.id().as_str().len(), 32);
        assert_eq!(msg.payload(), Value::int(1));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        let err = Message::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), "E804");
    }

    #[test]
    fn command_round_trip() {
        let mut msg = Message::new(0_i64).with("command", "break").unwrap();
        assert_eq!(msg.command().as_deref(), Some("break"));
        msg.clear_command();
        assert_eq!(msg.command(), None);
        assert!(msg.get("command").is_none());
    }

    #[test]
    fn non_string_command_is_ignored() {
        let msg = Message::new(0_i64).with("command", 5_i64).unwrap();
        assert_eq!(msg.command(), None);
    }

    #[test]
    fn missing_payload_reads_as_null() {
        let mut msg = Message::new(1_i64);
        msg.remove(PAYLOAD_FIELD);
        assert!(msg.payload().is_null());
    }

    #[test]
    fn serde_round_trip() {
        let msg = Message::with_id(MessageId::from("x"), "p")
            .with("loop.index", 2_i64)
            .unwrap();
        let text = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&text).unwrap();
        assert_eq!(back, msg);
    }
}
