//! Node trait and related types.

use super::context::Context;
use crate::error::Result;
use crate::message::Message;
use std::future::Future;
use std::pin::Pin;

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// Input port.
    Input,
    /// Output port.
    Output,
}

/// A port on a node.
#[derive(Debug, Clone)]
pub struct Port {
    /// Port name (e.g., "in", "done", "continue", "error").
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Whether this port is required.
    pub required: bool,
    /// Description of the port.
    pub description: String,
}

impl Port {
    /// Create a standard input port.
    pub fn input() -> Self {
        Self {
            name: "in".to_string(),
            direction: PortDirection::Input,
            required: true,
            description: "Default input".to_string(),
        }
    }

    /// Create a standard output port.
    pub fn output() -> Self {
        Self {
            name: "out".to_string(),
            direction: PortDirection::Output,
            required: false,
            description: "Default output".to_string(),
        }
    }

    /// Create an error output port.
    pub fn error() -> Self {
        Self {
            name: "error".to_string(),
            direction: PortDirection::Output,
            required: false,
            description: "Error output".to_string(),
        }
    }

    /// Create a named port.
    pub fn named(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            required: direction == PortDirection::Input,
            description: String::new(),
        }
    }

    /// Set the port description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }
}

/// Metadata about a node type.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Fully qualified name (e.g., "std::loop").
    pub name: String,
    /// Namespace (e.g., "std").
    pub namespace: String,
    /// Short name (e.g., "loop").
    pub short_name: String,
    /// Description of what the node does.
    pub description: String,
    /// Input ports.
    pub inputs: Vec<Port>,
    /// Output ports, in slot order.
    pub outputs: Vec<Port>,
}

impl NodeInfo {
    /// Create new node info.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let short_name = name.into();
        let full_name = format!("{}::{}", namespace, short_name);

        Self {
            name: full_name,
            namespace,
            short_name,
            description: String::new(),
            inputs: vec![Port::input()],
            outputs: vec![Port::output(), Port::error()],
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set input ports.
    pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set output ports.
    pub fn with_outputs(mut self, outputs: Vec<Port>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Get an output port by name.
    pub fn get_output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Slot index of an output port.
    pub fn output_slot(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }
}

/// Output from a node execution: one message sent on one port.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    /// The output port that was activated.
    pub port: String,
    /// The message sent on that port.
    pub message: Message,
}

impl NodeOutput {
    /// Create a new node output.
    pub fn new(port: impl Into<String>, message: Message) -> Self {
        Self {
            port: port.into(),
            message,
        }
    }

    /// Create output on the default "out" port.
    pub fn out(message: Message) -> Self {
        Self::new("out", message)
    }

    /// Spread the output over the given output ports.
    ///
    /// The activated port's slot holds the message and every other slot is
    /// `None`; a host sends nothing on `None` slots.
    pub fn into_slots(self, outputs: &[Port]) -> Vec<Option<Message>> {
        let mut message = Some(self.message);
        outputs
            .iter()
            .map(|port| {
                if port.name == self.port {
                    message.take()
                } else {
                    None
                }
            })
            .collect()
    }
}

/// A boxed future for async node execution.
pub type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<NodeOutput>> + Send + 'a>>;

/// The core trait for all eddy nodes.
///
/// Each activation delivers one message; the node returns which output
/// port receives the (possibly modified) message.
///
/// # Example
///
/// ```ignore
/// use eddy_core::prelude::*;
///
/// struct Passthrough;
///
/// impl Node for Passthrough {
///     fn info(&self) -> NodeInfo {
///         NodeInfo::new("custom", "passthrough")
///     }
///
///     fn execute<'a>(&'a self, _ctx: Context, msg: Message) -> NodeFuture<'a> {
///         Box::pin(async move { Ok(NodeOutput::out(msg)) })
///     }
/// }
/// ```
pub trait Node: Send + Sync {
    /// Get metadata about this node.
    fn info(&self) -> NodeInfo;

    /// Execute the node for one delivered message.
    fn execute<'a>(&'a self, ctx: Context, msg: Message) -> NodeFuture<'a>;

    /// Called when the node is being shut down.
    fn shutdown(&self, _ctx: &Context) {}
}

/// A node factory that creates node instances from configuration.
pub trait NodeFactory: Send + Sync {
    /// Get the node type name this factory creates.
    fn node_type(&self) -> &str;

    /// Create a new node instance from YAML configuration.
    fn create(&self, config: &serde_yaml::Value) -> Result<Box<dyn Node>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageId;

    #[test]
    fn port_creation() {
        let input = Port::input();
        assert_eq!(input.name, "in");
        assert_eq!(input.direction, PortDirection::Input);
        assert!(input.required);

        let output = Port::named("done", PortDirection::Output);
        assert!(!output.required);
    }

    #[test]
    fn node_info_creation() {
        let info = NodeInfo::new("std", "loop")
            .with_description("Iterate")
            .with_outputs(vec![
                Port::named("done", PortDirection::Output),
                Port::named("continue", PortDirection::Output),
                Port::error(),
            ]);

        assert_eq!(info.name, "std::loop");
        assert_eq!(info.short_name, "loop");
        assert_eq!(info.output_slot("continue"), Some(1));
        assert!(info.get_output("missing").is_none());
    }

    #[test]
    fn into_slots_fills_exactly_one() {
        let outputs = vec![
            Port::named("done", PortDirection::Output),
            Port::named("continue", PortDirection::Output),
        ];
        let msg = Message::with_id(MessageId::from("m"), 1_i64);

        let slots = NodeOutput::new("continue", msg.clone()).into_slots(&outputs);
        assert_eq!(slots, vec![None, Some(msg)]);

        let slots = NodeOutput::new("nowhere", Message::new(0_i64)).into_slots(&outputs);
        assert!(slots.iter().all(Option::is_none));
    }
}
