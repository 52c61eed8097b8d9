//! Core traits for eddy components.
//!
//! - `Node`: The basic unit of computation in a flow
//! - `NodeFactory`: Builds nodes from YAML configuration
//! - `Context`: Everything a node may touch while executing

mod context;
mod node;

pub use context::Context;
pub use node::{Node, NodeFactory, NodeFuture, NodeInfo, NodeOutput, Port, PortDirection};
