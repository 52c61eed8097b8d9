//! Execution context provided to nodes.

use crate::status::{NodeStatus, StatusSink, TracingStatus};
use crate::store::{ContextScope, ContextStore, MemoryContextStore};
use crate::testing::providers::{ClockProvider, EnvProvider, RealClock, RealEnv};
use crate::types::{FlowId, NodeId};
use std::sync::Arc;

/// Execution context provided to nodes during execution.
///
/// The context provides access to:
/// - Node and flow identity
/// - Scoped key/value storage
/// - Status reporting and logging
/// - External providers (clock, environment)
///
/// # Providers
///
/// In production, real providers are used automatically. In tests, use
/// [`TestContextBuilder`](crate::testing::TestContextBuilder) or
/// [`Context::with_providers`] to inject mocks.
#[derive(Clone)]
pub struct Context {
    /// The node ID being executed.
    node_id: NodeId,
    /// The flow the node is deployed in.
    flow_id: FlowId,
    /// Scoped key/value storage.
    store: Arc<dyn ContextStore>,
    /// Status badge receiver.
    status: Arc<dyn StatusSink>,
    /// Clock provider for time operations.
    clock: Arc<dyn ClockProvider>,
    /// Environment provider for environment variables.
    env: Arc<dyn EnvProvider>,
}

impl Context {
    /// Create a new execution context with default (real) providers and a
    /// private in-memory store.
    pub fn new(node_id: NodeId, flow_id: FlowId) -> Self {
        Self {
            node_id,
            flow_id,
            store: Arc::new(MemoryContextStore::new()),
            status: Arc::new(TracingStatus),
            clock: Arc::new(RealClock::new()),
            env: Arc::new(RealEnv::new()),
        }
    }

    /// Create a new execution context with custom providers.
    pub fn with_providers(
        node_id: NodeId,
        flow_id: FlowId,
        store: Arc<dyn ContextStore>,
        status: Arc<dyn StatusSink>,
        clock: Arc<dyn ClockProvider>,
        env: Arc<dyn EnvProvider>,
    ) -> Self {
        Self {
            node_id,
            flow_id,
            store,
            status,
            clock,
            env,
        }
    }

    /// Derive a context for another node sharing the same providers.
    pub fn for_node(&self, node_id: NodeId) -> Self {
        Self {
            node_id,
            ..self.clone()
        }
    }

    /// Get the current node ID.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Get the current flow ID.
    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    /// Scope of values private to this node.
    pub fn node_scope(&self) -> ContextScope {
        ContextScope::Node(self.node_id)
    }

    /// Scope of values shared within this node's flow.
    pub fn flow_scope(&self) -> ContextScope {
        ContextScope::Flow(self.flow_id.clone())
    }

    /// Get the context store.
    pub fn store(&self) -> &dyn ContextStore {
        &*self.store
    }

    /// Publish a status badge for this node.
    pub fn status(&self, status: NodeStatus) {
        self.status.status(self.node_id, status);
    }

    /// Log a message associated with this execution.
    pub fn log(&self, message: impl AsRef<str>) {
        tracing::info!(
            node_id = %self.node_id,
            flow_id = %self.flow_id,
            "{}",
            message.as_ref()
        );
    }

    /// Log a warning message.
    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(
            node_id = %self.node_id,
            flow_id = %self.flow_id,
            "{}",
            message.as_ref()
        );
    }

    /// Log an error message.
    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(
            node_id = %self.node_id,
            flow_id = %self.flow_id,
            "{}",
            message.as_ref()
        );
    }

    // Provider accessors

    /// Get the clock provider.
    pub fn clock(&self) -> &dyn ClockProvider {
        &*self.clock
    }

    /// Get the environment provider.
    pub fn env(&self) -> &dyn EnvProvider {
        &*self.env
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("node_id", &self.node_id)
            .field("flow_id", &self.flow_id)
            .field("mock_clock", &self.clock.is_mock())
            .field("mock_env", &self.env.is_mock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn default_context_uses_real_providers() {
        let ctx = Context::new(NodeId::new(1), FlowId::new("f"));
        assert!(!ctx.clock().is_mock());
        assert!(!ctx.env().is_mock());
        assert_eq!(ctx.node_scope(), ContextScope::Node(NodeId::new(1)));
    }

    #[test]
    fn for_node_shares_store() {
        let ctx = Context::new(NodeId::new(1), FlowId::default());
        let other = ctx.for_node(NodeId::new(2));

        ctx.store().set(&ctx.flow_scope(), "shared", Value::int(1));
        assert_eq!(
            other.store().get(&other.flow_scope(), "shared"),
            Some(Value::int(1))
        );
        assert_eq!(other.store().get(&other.node_scope(), "shared"), None);
    }
}
