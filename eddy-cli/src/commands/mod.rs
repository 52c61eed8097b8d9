//! CLI command implementations.

pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use eddy_nodes::registry::LOOP_NODE_TYPE;
use serde::Deserialize;
use std::path::Path;

/// A node file: the node type and its configuration.
///
/// ```yaml
/// type: std::loop
/// config:
///   kind: counted
///   count: 3
/// ```
#[derive(Debug, Deserialize)]
pub struct NodeDocument {
    /// Registered node type; defaults to the loop node.
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    /// Node configuration passed to the factory.
    #[serde(default)]
    pub config: serde_yaml::Value,
}

fn default_node_type() -> String {
    LOOP_NODE_TYPE.to_string()
}

impl NodeDocument {
    /// Parse a node document from YAML text.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse node YAML")
    }

    /// Read and parse a node document.
    pub fn load(file: &str) -> Result<Self> {
        let path = Path::new(file);
        if !path.exists() {
            anyhow::bail!("Node file not found: {}", file);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", file))?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_defaults_to_loop() {
        let doc = NodeDocument::parse("config:\n  kind: counted\n  count: 2\n").unwrap();
        assert_eq!(doc.node_type, "std::loop");
        assert_eq!(doc.config["kind"].as_str(), Some("counted"));
    }

    #[test]
    fn explicit_type_is_kept() {
        let doc = NodeDocument::parse("type: std::other\n").unwrap();
        assert_eq!(doc.node_type, "std::other");
        assert!(doc.config.is_null());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = NodeDocument::load("/nonexistent/loop.yaml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
