//! Validate command - check a node YAML file without running it.

use super::NodeDocument;
use anyhow::Result;
use eddy_nodes::flow::loop_node::{LoopConfig, LoopNode};
use eddy_nodes::registry::{LOOP_NODE_TYPE, create_standard_registry};

/// Run the validate command.
pub fn run(file: &str) -> Result<()> {
    tracing::info!(file = %file, "Validating node file");

    println!("Validation Results for: {}", file);
    println!("========================{}", "=".repeat(file.len()));
    println!();

    let doc = match NodeDocument::load(file) {
        Ok(doc) => doc,
        Err(e) => {
            println!("✗ YAML PARSE ERROR:");
            println!("  {:#}", e);
            anyhow::bail!("YAML parsing failed");
        }
    };
    println!("✓ YAML syntax is valid");

    let registry = create_standard_registry();
    if !registry.contains(&doc.node_type) {
        println!("✗ Unknown node type '{}'", doc.node_type);
        println!("  Known types: {}", registry.node_types().join(", "));
        anyhow::bail!("Validation failed");
    }
    println!("✓ Node type '{}' is registered", doc.node_type);

    if doc.node_type != LOOP_NODE_TYPE {
        registry.create(&doc.node_type, &doc.config)?;
        println!("✓ Node configuration accepted");
        return Ok(());
    }

    let config = match LoopConfig::from_yaml(&doc.config) {
        Ok(config) => config,
        Err(e) => {
            println!("✗ Configuration error [{}]:", e.code());
            println!("  {}", e);
            anyhow::bail!("Validation failed");
        }
    };

    if let Err(e) = LoopNode::try_new(config.clone()) {
        println!("✗ Setup error [{}]:", e.code());
        println!("  {}", e);
        anyhow::bail!("Validation failed");
    }
    println!("✓ Loop configuration is valid");
    println!();

    println!("Loop Summary:");
    println!("  Kind: {:?}", config.kind);
    if let Some(condition) = &config.condition {
        println!(
            "  Condition: {} ({:?}, {:?})",
            condition, config.condition_type, config.when
        );
    }
    if let Some(enumeration) = &config.enumeration {
        println!("  Enumeration: {} ({:?})", enumeration, config.enumeration_type);
    }
    match &config.limit {
        Some(limit) => println!("  Time limit: {} ms", limit),
        None => println!("  Time limit: none (msg.limit if present)"),
    }
    println!("  Loop payload: {:?}", config.loop_payload);
    println!("  Final payload: {:?}", config.final_payload);
    if let Some(ttl) = config.session_ttl_ms {
        println!("  Session TTL: {} ms", ttl);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(name: &str) -> String {
        format!("{}/../demos/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn demos_validate() {
        for name in ["counted.yaml", "enumerate_urls.yaml", "script_condition.yaml"] {
            run(&demo(name)).unwrap();
        }
    }

    #[test]
    fn missing_file_fails() {
        assert!(run(&demo("missing.yaml")).is_err());
    }
}
