//! Scoped key/value context storage.
//!
//! Nodes may keep state in three scopes:
//! - **node**: private to one node instance
//! - **flow**: shared by every node deployed in the same flow
//! - **global**: shared by every node in the runtime
//!
//! The host owns the store; nodes reach it through their [`Context`].
//!
//! [`Context`]: crate::traits::Context

use crate::types::{FlowId, NodeId};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Scope of a context value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextScope {
    /// Private to a single node.
    Node(NodeId),
    /// Shared by all nodes of a flow.
    Flow(FlowId),
    /// Shared by the whole runtime.
    Global,
}

impl fmt::Display for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{}", id),
            Self::Flow(id) => write!(f, "{}", id),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Key/value store with node, flow and global scopes.
pub trait ContextStore: Send + Sync {
    /// Get a value. Keys may be field paths into a stored object
    /// (e.g. `counters.retries`).
    fn get(&self, scope: &ContextScope, key: &str) -> Option<Value>;

    /// Set a value. Setting null removes the key.
    fn set(&self, scope: &ContextScope, key: &str, value: Value);

    /// List the top-level keys of a scope, sorted.
    fn keys(&self, scope: &ContextScope) -> Vec<String>;
}

/// In-memory context store.
#[derive(Default)]
pub struct MemoryContextStore {
    scopes: RwLock<HashMap<ContextScope, BTreeMap<String, Value>>>,
}

impl MemoryContextStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value (builder style, for tests and fixtures).
    pub fn with_value(self, scope: ContextScope, key: &str, value: impl Into<Value>) -> Self {
        self.set(&scope, key, value.into());
        self
    }
}

/// Split `a.b.c` into the top-level key and the remaining path.
fn split_key(key: &str) -> (&str, Option<&str>) {
    let top_end = key.find(['.', '[']).unwrap_or(key.len());
    let (top, rest) = key.split_at(top_end);
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    (top, (!rest.is_empty()).then_some(rest))
}

impl ContextStore for MemoryContextStore {
    fn get(&self, scope: &ContextScope, key: &str) -> Option<Value> {
        let (top, rest) = split_key(key);
        let scopes = self.scopes.read();
        let value = scopes.get(scope)?.get(top)?;
        match rest {
            Some(path) => value.get_field(path),
            None => Some(value.clone()),
        }
    }

    fn set(&self, scope: &ContextScope, key: &str, value: Value) {
        let (top, rest) = split_key(key);
        let mut scopes = self.scopes.write();
        let entries = scopes.entry(scope.clone()).or_default();

        match rest {
            None if value.is_null() => {
                entries.remove(top);
            }
            None => {
                entries.insert(top.to_string(), value);
            }
            Some(path) => {
                let slot = entries.entry(top.to_string()).or_insert_with(Value::object);
                if let Err(e) = slot.set_field(path, value) {
                    tracing::warn!(scope = %scope, key = %key, error = %e, "Context set failed");
                }
            }
        }
    }

    fn keys(&self, scope: &ContextScope) -> Vec<String> {
        self.scopes
            .read()
            .get(scope)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scopes_are_isolated() {
        let store = MemoryContextStore::new();
        let node = ContextScope::Node(NodeId::new(1));
        let other = ContextScope::Node(NodeId::new(2));
        let flow = ContextScope::Flow(FlowId::new("f"));

        store.set(&node, "count", Value::int(1));
        store.set(&flow, "count", Value::int(2));
        store.set(&ContextScope::Global, "count", Value::int(3));

        assert_eq!(store.get(&node, "count"), Some(Value::int(1)));
        assert_eq!(store.get(&other, "count"), None);
        assert_eq!(store.get(&flow, "count"), Some(Value::int(2)));
        assert_eq!(store.get(&ContextScope::Global, "count"), Some(Value::int(3)));
    }

    #[test]
    fn nested_keys() {
        let store = MemoryContextStore::new();
        let scope = ContextScope::Global;

        store.set(&scope, "stats.hits", Value::int(4));
        assert_eq!(store.get(&scope, "stats"), Some(Value(json!({"hits": 4}))));
        assert_eq!(store.get(&scope, "stats.hits"), Some(Value::int(4)));
    }

    #[test]
    fn null_removes_and_keys_are_sorted() {
        let store = MemoryContextStore::new()
            .with_value(ContextScope::Global, "b", 1_i64)
            .with_value(ContextScope::Global, "a", 2_i64)
            .with_value(ContextScope::Global, "c", 3_i64);

        store.set(&ContextScope::Global, "c", Value::null());
        assert_eq!(store.keys(&ContextScope::Global), vec!["a", "b"]);
    }

    #[test]
    fn split_key_variants() {
        assert_eq!(split_key("a"), ("a", None));
        assert_eq!(split_key("a.b.c"), ("a", Some("b.c")));
        assert_eq!(split_key("a[1]"), ("a", Some("[1]")));
    }
}
