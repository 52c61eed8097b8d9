//! Enumeration sources and iteration over them.

use super::config::EnumerationType;
use eddy_core::error::{EddyError, Result};
use eddy_core::expr::{Dialect, Expression, QueryScope};
use eddy_core::message::Message;
use eddy_core::store::ContextScope;
use eddy_core::traits::Context;
use eddy_core::value::Value;
use serde_json::Value as JsonValue;

/// Where a session's collection comes from, prepared at node setup.
#[derive(Debug, Clone)]
pub enum EnumerationSource {
    /// Message property path.
    Msg(String),
    /// Flow context key.
    Flow(String),
    /// Global context key.
    Global(String),
    /// Parsed JSON literal.
    Json(Value),
    /// String literal.
    Str(String),
    /// Environment variable name.
    Env(String),
    /// Compiled query expression.
    Query(Expression),
}

impl EnumerationSource {
    /// Prepare a source. JSON literals are parsed and queries compiled here,
    /// so mistakes surface once at setup.
    pub fn prepare(kind: EnumerationType, reference: &str) -> Result<Self> {
        Ok(match kind {
            EnumerationType::Msg => Self::Msg(reference.trim().to_string()),
            EnumerationType::Flow => Self::Flow(reference.trim().to_string()),
            EnumerationType::Global => Self::Global(reference.trim().to_string()),
            EnumerationType::Json => {
                let parsed: JsonValue =
                    serde_json::from_str(reference).map_err(|e| EddyError::InvalidConfig {
                        field: "enumeration".to_string(),
                        cause: format!("invalid JSON: {}", e),
                    })?;
                Self::Json(Value(parsed))
            }
            EnumerationType::Str => Self::Str(reference.to_string()),
            EnumerationType::Env => Self::Env(reference.trim().to_string()),
            EnumerationType::Query => Self::Query(Expression::compile(reference, Dialect::Query)?),
        })
    }

    /// Resolve the collection for a starting message.
    pub fn resolve(&self, msg: &Message, ctx: &Context) -> Result<Value> {
        Ok(match self {
            Self::Msg(path) => msg.get(path).unwrap_or_default(),
            Self::Flow(key) => ctx.store().get(&ctx.flow_scope(), key).unwrap_or_default(),
            Self::Global(key) => ctx
                .store()
                .get(&ContextScope::Global, key)
                .unwrap_or_default(),
            Self::Json(value) => value.clone(),
            Self::Str(text) => Value::string(text.as_str()),
            Self::Env(name) => ctx.env().var(name).map(Value::string).unwrap_or_default(),
            Self::Query(expr) => expr.evaluate(&mut QueryScope::new(msg))?,
        })
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Msg(path) => format!("msg.{}", path),
            Self::Flow(key) => format!("flow.{}", key),
            Self::Global(key) => format!("global.{}", key),
            Self::Json(_) => "json".to_string(),
            Self::Str(_) => "str".to_string(),
            Self::Env(name) => format!("env.{}", name),
            Self::Query(expr) => format!("query '{}'", expr.source()),
        }
    }
}

/// One element pulled from an enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A bare value (sequences and text).
    Value(Value),
    /// A key/value pair (objects).
    Pair(String, Value),
}

#[derive(Debug, Clone)]
enum Items {
    Sequence(Vec<JsonValue>),
    Text(Vec<char>),
    Pairs(Vec<(String, JsonValue)>),
}

impl Items {
    fn len(&self) -> usize {
        match self {
            Self::Sequence(v) => v.len(),
            Self::Text(c) => c.len(),
            Self::Pairs(p) => p.len(),
        }
    }
}

/// A captured collection and the position of the next element.
#[derive(Debug, Clone)]
pub struct Enumeration {
    source: Value,
    items: Items,
    position: usize,
}

impl Enumeration {
    /// Capture a collection.
    ///
    /// Arrays yield their elements, strings their characters, and objects
    /// their `(key, value)` entries in key order. Anything else is not
    /// enumerable.
    pub fn capture(source: Value) -> Result<Self> {
        let items = match &source.0 {
            JsonValue::Array(values) => Items::Sequence(values.clone()),
            JsonValue::String(text) => Items::Text(text.chars().collect()),
            JsonValue::Object(map) => {
                Items::Pairs(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            _ => {
                return Err(EddyError::InvalidConfig {
                    field: "enumeration".to_string(),
                    cause: format!("a {} is not enumerable", source.type_name()),
                });
            }
        };
        Ok(Self {
            source,
            items,
            position: 0,
        })
    }

    /// The collection as captured at session start.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Whether elements are key/value pairs.
    pub fn has_key_value_pairs(&self) -> bool {
        matches!(self.items, Items::Pairs(_))
    }

    /// Number of elements not yet pulled.
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.position)
    }

    /// Pull the next element.
    pub fn next_element(&mut self) -> Option<Element> {
        let element = match &self.items {
            Items::Sequence(values) => Element::Value(Value(values.get(self.position)?.clone())),
            Items::Text(chars) => Element::Value(Value::string(chars.get(self.position)?.to_string())),
            Items::Pairs(pairs) => {
                let (key, value) = pairs.get(self.position)?;
                Element::Pair(key.clone(), Value(value.clone()))
            }
        };
        self.position += 1;
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::testing::TestContextBuilder;
    use serde_json::json;

    #[test]
    fn sequence_elements() {
        let mut e = Enumeration::capture(Value(json!(["a", "b"]))).unwrap();
        assert!(!e.has_key_value_pairs());
        assert_eq!(e.remaining(), 2);
        assert_eq!(e.next_element(), Some(Element::Value(Value::string("a"))));
        assert_eq!(e.next_element(), Some(Element::Value(Value::string("b"))));
        assert_eq!(e.next_element(), None);
        assert_eq!(e.remaining(), 0);
    }

    #[test]
    fn text_elements_are_characters() {
        let mut e = Enumeration::capture(Value::string("hé")).unwrap();
        assert_eq!(e.next_element(), Some(Element::Value(Value::string("h"))));
        assert_eq!(e.next_element(), Some(Element::Value(Value::string("é"))));
        assert_eq!(e.next_element(), None);
    }

    #[test]
    fn object_elements_are_pairs_in_key_order() {
        let mut e = Enumeration::capture(Value(json!({"b": 2, "a": 1}))).unwrap();
        assert!(e.has_key_value_pairs());
        assert_eq!(e.next_element(), Some(Element::Pair("a".into(), Value::int(1))));
        assert_eq!(e.next_element(), Some(Element::Pair("b".into(), Value::int(2))));
        assert_eq!(e.source().0, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn scalars_are_not_enumerable() {
        for v in [json!(null), json!(3), json!(true)] {
            let err = Enumeration::capture(Value(v)).unwrap_err();
            assert!(err.is_config_error());
        }
    }

    #[test]
    fn prepare_rejects_bad_json_and_queries() {
        assert!(EnumerationSource::prepare(EnumerationType::Json, "[1,").is_err());
        let err = EnumerationSource::prepare(EnumerationType::Query, "payload =").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn resolve_each_source_kind() {
        let test = TestContextBuilder::new()
            .with_flow_value("todo", Value(json!([1])))
            .with_global_value("all", Value(json!({"k": 1})))
            .with_env_vars(&[("LETTERS", "xy")])
            .build()
            .unwrap();
        let ctx = test.context();
        let msg = Message::new(json!({"list": [3, 4]}));

        let resolve = |kind, reference: &str| {
            EnumerationSource::prepare(kind, reference)
                .unwrap()
                .resolve(&msg, &ctx)
                .unwrap()
        };

        assert_eq!(resolve(EnumerationType::Msg, "payload.list").0, json!([3, 4]));
        assert_eq!(resolve(EnumerationType::Flow, "todo").0, json!([1]));
        assert_eq!(resolve(EnumerationType::Global, "all").0, json!({"k": 1}));
        assert_eq!(resolve(EnumerationType::Json, "[\"x\"]").0, json!(["x"]));
        assert_eq!(resolve(EnumerationType::Str, "ab").0, json!("ab"));
        assert_eq!(resolve(EnumerationType::Env, "LETTERS").0, json!("xy"));
        assert_eq!(resolve(EnumerationType::Query, "payload.list[1]").0, json!(4));
        assert!(resolve(EnumerationType::Msg, "missing").is_null());
    }
}
