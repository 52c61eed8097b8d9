//! Run command - drive one message through a node with an identity loop body.

use super::NodeDocument;
use anyhow::{Context as _, Result};
use eddy_core::message::Message;
use eddy_core::traits::{Context, Node};
use eddy_core::types::{FlowId, NodeId};
use eddy_core::value::Value;
use eddy_nodes::flow::loop_node::CONTINUE_PORT;
use eddy_nodes::registry::create_standard_registry;
use serde_json::Value as JsonValue;

/// Run the run command.
///
/// Every output is printed as one JSON line. Messages sent on `continue` are
/// fed straight back into the node; any other port ends the run.
pub async fn run(file: &str, payload: Option<&str>, max_activations: usize) -> Result<()> {
    let doc = NodeDocument::load(file)?;
    let node = create_standard_registry()
        .create(&doc.node_type, &doc.config)
        .with_context(|| format!("Failed to build node from {}", file))?;

    let payload = match payload {
        Some(text) => serde_json::from_str::<JsonValue>(text).context("Invalid --payload JSON")?,
        None => JsonValue::Null,
    };

    let ctx = Context::new(NodeId::new(1), FlowId::new("cli"));
    let activations = drive(node.as_ref(), &ctx, Message::new(Value(payload)), max_activations).await;
    node.shutdown(&ctx);

    let activations = activations?;
    tracing::info!(file = %file, activations, "Run finished");
    Ok(())
}

/// Feed `continue` outputs back until another port fires. Returns the number
/// of activations.
async fn drive(
    node: &dyn Node,
    ctx: &Context,
    mut msg: Message,
    max_activations: usize,
) -> Result<usize> {
    let info = node.info();

    for activation in 1..=max_activations {
        let output = node.execute(ctx.clone(), msg).await?;
        let line = serde_json::json!({
            "port": output.port,
            "slot": info.output_slot(&output.port),
            "msg": JsonValue::from(output.message.clone()),
        });
        println!("{}", line);

        if output.port != CONTINUE_PORT {
            return Ok(activation);
        }
        msg = output.message;
    }

    anyhow::bail!(
        "node still looping after {} activations (raise --max-activations)",
        max_activations
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::testing::TestContextBuilder;
    use eddy_nodes::flow::loop_node::{LoopConfig, LoopNode};

    #[tokio::test]
    async fn drive_counts_activations() {
        let test = TestContextBuilder::new().build().unwrap();
        let node = LoopNode::new(LoopConfig::counted(3.0, 0.0, 1.0));

        let n = drive(&node, &test.context(), Message::new(0_i64), 10).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(node.session_count(), 0);
    }

    #[tokio::test]
    async fn drive_gives_up() {
        let test = TestContextBuilder::new().build().unwrap();
        let node = LoopNode::new(LoopConfig::counted(100.0, 0.0, 1.0));

        let err = drive(&node, &test.context(), Message::new(0_i64), 5).await.unwrap_err();
        assert!(err.to_string().contains("5 activations"));
    }
}
