//! Core identifier types.
//!
//! - `MessageId`: Key of an in-flight message; loop sessions are keyed by it
//! - `NodeId`: Identifier for a node within a flow
//! - `FlowId`: Identifier for the flow a node is deployed in

mod ids;

pub use ids::{FlowId, MessageId, NodeId};
