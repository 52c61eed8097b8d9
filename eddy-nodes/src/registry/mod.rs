//! Node factories keyed by node type.
//!
//! Hosts build nodes from YAML by type name:
//!
//! ```
//! use eddy_nodes::registry::create_standard_registry;
//!
//! let registry = create_standard_registry();
//! let config: serde_yaml::Value = serde_yaml::from_str("kind: counted\ncount: 3").unwrap();
//! let node = registry.create("std::loop", &config).unwrap();
//! assert_eq!(node.info().name, "std::loop");
//! ```

use crate::flow::LoopNode;
use eddy_core::error::{EddyError, Result};
use eddy_core::traits::{Node, NodeFactory};
use std::collections::HashMap;

/// Node type name of the loop node.
pub const LOOP_NODE_TYPE: &str = "std::loop";

/// Builds [`LoopNode`]s from YAML configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopNodeFactory;

impl NodeFactory for LoopNodeFactory {
    fn node_type(&self) -> &str {
        LOOP_NODE_TYPE
    }

    fn create(&self, config: &serde_yaml::Value) -> Result<Box<dyn Node>> {
        Ok(Box::new(LoopNode::from_yaml(config)?))
    }
}

/// Registry of node factories.
pub struct NodeRegistry {
    factories: HashMap<String, Box<dyn NodeFactory>>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under its node type.
    pub fn register(&mut self, factory: impl NodeFactory + 'static) {
        self.factories
            .insert(factory.node_type().to_string(), Box::new(factory));
    }

    /// Check whether a node type is registered.
    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Registered node types, sorted.
    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Build a node of the given type.
    pub fn create(&self, node_type: &str, config: &serde_yaml::Value) -> Result<Box<dyn Node>> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| EddyError::UnknownNodeType {
                node_type: node_type.to_string(),
            })?;
        factory.create(config)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry holding every standard node factory.
pub fn create_standard_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(LoopNodeFactory);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> serde_yaml::Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn registry_operations() {
        let registry = create_standard_registry();
        assert_eq!(registry.node_types(), vec![LOOP_NODE_TYPE]);
        assert!(registry.contains("std::loop"));
        assert!(!registry.contains("std::switch"));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = create_standard_registry();
        let err = registry
            .create("std::nope", &yaml("kind: counted"))
            .err()
            .unwrap();
        assert_eq!(err.code(), "E803");
    }

    #[test]
    fn factory_surfaces_parse_errors() {
        let err = LoopNodeFactory.create(&yaml("kind: sometimes")).err().unwrap();
        assert_eq!(err.code(), "E801");
    }

    #[test]
    fn factory_keeps_nodes_with_setup_errors() {
        // The pattern does not compile; the node is created and reports the
        // error when a session starts
        let node = LoopNodeFactory
            .create(&yaml("kind: conditional\ncondition_type: pattern\ncondition: '('"))
            .unwrap();
        assert_eq!(node.info().name, LOOP_NODE_TYPE);
    }
}
