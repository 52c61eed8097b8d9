//! Name bindings visible to expressions.
//!
//! An expression can only touch what its [`Scope`] hands it. Query
//! expressions see the fields of one message and nothing else. Scripts see
//! the message as `msg`, the three context scopes through `context`, `flow`
//! and `global`, and read-only environment variables through `env`.

use super::eval::set_at;
use crate::error::{EddyError, Result};
use crate::message::Message;
use crate::store::ContextScope;
use crate::traits::Context;
use crate::value::Value;
use serde_json::Value as JsonValue;

/// One step of an assignment path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object property.
    Field(String),
    /// Array element.
    Index(usize),
}

/// Capabilities available to an evaluating expression.
pub trait Scope {
    /// Resolve a free identifier.
    fn lookup(&self, name: &str) -> Result<Value>;

    /// Assign to `root` followed by `path`.
    fn assign(&mut self, root: &str, path: &[Segment], value: Value) -> Result<()>;

    /// Invoke `object.method(args)`.
    fn call(&mut self, object: &str, method: &str, args: Vec<Value>) -> Result<Value>;
}

/// Read-only view of a message's fields.
///
/// `$` names the whole message; any other identifier names a top-level
/// field, and missing fields read as null.
pub struct QueryScope<'a> {
    msg: &'a Message,
}

impl<'a> QueryScope<'a> {
    /// Create a query scope over a message.
    pub fn new(msg: &'a Message) -> Self {
        Self { msg }
    }
}

impl Scope for QueryScope<'_> {
    fn lookup(&self, name: &str) -> Result<Value> {
        if name == "$" {
            return Ok(self.msg.as_value().clone());
        }
        Ok(self
            .msg
            .as_value()
            .inner()
            .get(name)
            .cloned()
            .map(Value)
            .unwrap_or_default())
    }

    fn assign(&mut self, root: &str, _path: &[Segment], _value: Value) -> Result<()> {
        Err(EddyError::runtime(format!(
            "cannot assign to '{}' in a query",
            root
        )))
    }

    fn call(&mut self, object: &str, method: &str, _args: Vec<Value>) -> Result<Value> {
        Err(EddyError::runtime(format!(
            "{}.{} is not available in a query",
            object, method
        )))
    }
}

/// Script bindings: the message, context storage and the environment.
pub struct ScriptScope<'a> {
    msg: &'a mut Message,
    ctx: &'a Context,
}

impl<'a> ScriptScope<'a> {
    /// Create a script scope. Assignments to `msg` mutate `msg` in place.
    pub fn new(msg: &'a mut Message, ctx: &'a Context) -> Self {
        Self { msg, ctx }
    }

    fn context_scope(&self, object: &str) -> Option<ContextScope> {
        match object {
            "context" => Some(self.ctx.node_scope()),
            "flow" => Some(self.ctx.flow_scope()),
            "global" => Some(ContextScope::Global),
            _ => None,
        }
    }
}

fn key_arg(object: &str, method: &str, args: &[Value]) -> Result<String> {
    match args.first().map(|v| &v.0) {
        Some(JsonValue::String(key)) => Ok(key.clone()),
        _ => Err(EddyError::runtime(format!(
            "{}.{}() expects a string key",
            object, method
        ))),
    }
}

impl Scope for ScriptScope<'_> {
    fn lookup(&self, name: &str) -> Result<Value> {
        match name {
            "msg" => Ok(self.msg.as_value().clone()),
            "context" | "flow" | "global" | "env" => Err(EddyError::runtime(format!(
                "{} can only be used through its methods",
                name
            ))),
            _ => Err(EddyError::runtime(format!("{} is not defined", name))),
        }
    }

    fn assign(&mut self, root: &str, path: &[Segment], value: Value) -> Result<()> {
        if root != "msg" {
            return Err(EddyError::runtime(format!(
                "cannot assign to '{}'",
                root
            )));
        }
        if path.is_empty() || !keeps_msg_id(path, &value) {
            return Err(EddyError::runtime("msg must remain an object"));
        }
        set_at(self.msg.as_value_mut(), path, value)
    }

    fn call(&mut self, object: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        if object == "env" {
            return match method {
                "get" => {
                    let name = key_arg(object, method, &args)?;
                    Ok(self
                        .ctx
                        .env()
                        .var(&name)
                        .map(Value::string)
                        .unwrap_or_default())
                }
                _ => Err(EddyError::runtime(format!("env.{} is not a function", method))),
            };
        }

        let scope = self
            .context_scope(object)
            .ok_or_else(|| EddyError::runtime(format!("{}.{} is not a function", object, method)))?;
        let store = self.ctx.store();

        match method {
            "get" => {
                let key = key_arg(object, method, &args)?;
                Ok(store.get(&scope, &key).unwrap_or_default())
            }
            "set" => {
                let key = key_arg(object, method, &args)?;
                let value = args.get(1).cloned().unwrap_or_default();
                store.set(&scope, &key, value);
                Ok(Value::null())
            }
            "keys" => Ok(Value(JsonValue::Array(
                store
                    .keys(&scope)
                    .into_iter()
                    .map(JsonValue::String)
                    .collect(),
            ))),
            _ => Err(EddyError::runtime(format!(
                "{}.{} is not a function",
                object, method
            ))),
        }
    }
}

/// `msg._msgid` may only be overwritten with a string.
fn keeps_msg_id(path: &[Segment], value: &Value) -> bool {
    match path {
        [Segment::Field(f)] if f == crate::message::MSG_ID_FIELD => {
            matches!(value.0, JsonValue::String(_))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContextBuilder;
    use crate::types::MessageId;
    use serde_json::json;

    #[test]
    fn query_scope_reads_fields() {
        let msg = Message::with_id(MessageId::from("q"), 3_i64);
        let scope = QueryScope::new(&msg);
        assert_eq!(scope.lookup("payload").unwrap(), Value::int(3));
        assert_eq!(scope.lookup("missing").unwrap(), Value::null());
        assert_eq!(scope.lookup("$").unwrap().get_string("_msgid").as_deref(), Some("q"));
    }

    #[test]
    fn query_scope_rejects_effects() {
        let msg = Message::new(1_i64);
        let mut scope = QueryScope::new(&msg);
        assert!(scope.assign("payload", &[], Value::int(2)).is_err());
        assert!(scope.call("flow", "get", vec![Value::string("k")]).is_err());
    }

    #[test]
    fn script_scope_reaches_store_and_env() {
        let test = TestContextBuilder::new()
            .with_env_vars(&[("LIMIT", "4")])
            .with_flow_value("seen", 2_i64)
            .build()
            .unwrap();
        let ctx = test.context();
        let mut msg = Message::new(0_i64);
        let mut scope = ScriptScope::new(&mut msg, &ctx);

        assert_eq!(
            scope.call("flow", "get", vec![Value::string("seen")]).unwrap(),
            Value::int(2)
        );
        scope
            .call("global", "set", vec![Value::string("k"), Value::bool(true)])
            .unwrap();
        assert_eq!(
            scope.call("env", "get", vec![Value::string("LIMIT")]).unwrap(),
            Value::string("4")
        );
        assert!(scope.call("env", "set", vec![]).is_err());
        assert_eq!(test.global_value("k"), Some(Value::bool(true)));
    }

    #[test]
    fn script_scope_assigns_into_msg() {
        let ctx = TestContextBuilder::new().build().unwrap().context();
        let mut msg = Message::with_id(MessageId::from("s"), 0_i64);
        {
            let mut scope = ScriptScope::new(&mut msg, &ctx);
            scope
                .assign("msg", &[Segment::Field("topic".into())], Value::string("t"))
                .unwrap();
            assert!(scope.assign("msg", &[], Value::int(1)).is_err());
            assert!(
                scope
                    .assign("msg", &[Segment::Field("_msgid".into())], Value::int(1))
                    .is_err()
            );
            assert!(scope.assign("other", &[], Value::int(1)).is_err());
        }
        assert_eq!(msg.as_value().0, json!({"_msgid": "s", "payload": 0, "topic": "t"}));
    }
}
