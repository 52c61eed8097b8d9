//! Test context and builder for deterministic testing.
//!
//! Provides a [`Context`] wired to mock providers, together with handles to
//! those mocks so tests can advance time, seed storage and inspect status.

use super::providers::{MockClock, MockEnv};
use crate::error::Result;
use crate::status::RecordingStatus;
use crate::store::{ContextScope, ContextStore, MemoryContextStore};
use crate::traits::Context;
use crate::types::{FlowId, NodeId};
use crate::value::Value;
use std::sync::Arc;

/// A context wired to mocks, plus handles to the mocks.
///
/// # Example
///
/// ```
/// use eddy_core::testing::TestContextBuilder;
///
/// let test = TestContextBuilder::new()
///     .with_env_vars(&[("MODE", "test")])
///     .build()
///     .unwrap();
///
/// let ctx = test.context();
/// test.clock.advance_millis(250);
/// assert_eq!(ctx.clock().millis_since(0), 250);
/// assert_eq!(ctx.env().var("MODE"), Some("test".to_string()));
/// ```
pub struct TestContext {
    context: Context,
    /// Controllable clock.
    pub clock: Arc<MockClock>,
    /// Isolated environment.
    pub env: Arc<MockEnv>,
    /// Context store shared by every context derived from this one.
    pub store: Arc<MemoryContextStore>,
    /// Recorded status updates.
    pub status: Arc<RecordingStatus>,
}

impl TestContext {
    /// A context handle to pass to a node.
    pub fn context(&self) -> Context {
        self.context.clone()
    }

    /// Read a value stored in the node scope.
    pub fn node_value(&self, key: &str) -> Option<Value> {
        self.store.get(&self.context.node_scope(), key)
    }

    /// Read a value stored in the flow scope.
    pub fn flow_value(&self, key: &str) -> Option<Value> {
        self.store.get(&self.context.flow_scope(), key)
    }

    /// Read a value stored in the global scope.
    pub fn global_value(&self, key: &str) -> Option<Value> {
        self.store.get(&ContextScope::Global, key)
    }
}

/// Builder for creating test contexts.
pub struct TestContextBuilder {
    node_id: NodeId,
    flow_id: FlowId,
    fixed_time: Option<String>,
    env: MockEnv,
    seeds: Vec<(Seed, String, Value)>,
}

enum Seed {
    Node,
    Flow,
    Global,
}

impl TestContextBuilder {
    /// Create a new test context builder with default settings.
    pub fn new() -> Self {
        Self {
            node_id: NodeId::new(1),
            flow_id: FlowId::default(),
            fixed_time: None,
            env: MockEnv::new(),
            seeds: Vec::new(),
        }
    }

    /// Set the node ID.
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = node_id;
        self
    }

    /// Set the flow ID.
    pub fn with_flow_id(mut self, flow_id: FlowId) -> Self {
        self.flow_id = flow_id;
        self
    }

    /// Start the mock clock's wall time at an RFC 3339 instant.
    pub fn with_fixed_time(mut self, iso_time: &str) -> Self {
        self.fixed_time = Some(iso_time.to_string());
        self
    }

    /// Add environment variables.
    pub fn with_env_vars(mut self, vars: &[(&str, &str)]) -> Self {
        for (k, v) in vars {
            self.env = self.env.with_var(*k, *v);
        }
        self
    }

    /// Seed a node-scoped value.
    pub fn with_node_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.seeds.push((Seed::Node, key.to_string(), value.into()));
        self
    }

    /// Seed a flow-scoped value.
    pub fn with_flow_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.seeds.push((Seed::Flow, key.to_string(), value.into()));
        self
    }

    /// Seed a global value.
    pub fn with_global_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.seeds.push((Seed::Global, key.to_string(), value.into()));
        self
    }

    /// Build the test context.
    pub fn build(self) -> Result<TestContext> {
        let clock = match &self.fixed_time {
            Some(iso) => Arc::new(MockClock::fixed(iso)?),
            None => Arc::new(MockClock::new()),
        };
        let env = Arc::new(self.env);
        let store = Arc::new(MemoryContextStore::new());
        let status = Arc::new(RecordingStatus::new());

        for (seed, key, value) in self.seeds {
            let scope = match seed {
                Seed::Node => ContextScope::Node(self.node_id),
                Seed::Flow => ContextScope::Flow(self.flow_id.clone()),
                Seed::Global => ContextScope::Global,
            };
            store.set(&scope, &key, value);
        }

        let context = Context::with_providers(
            self.node_id,
            self.flow_id,
            store.clone(),
            status.clone(),
            clock.clone(),
            env.clone(),
        );

        Ok(TestContext {
            context,
            clock,
            env,
            store,
            status,
        })
    }
}

impl Default for TestContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
