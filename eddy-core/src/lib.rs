//! Eddy Core Library
//!
//! This crate provides the foundational types, traits and runtime services
//! for eddy flow nodes.
//!
//! # Overview
//!
//! Eddy nodes are message-driven: a host delivers a [`Message`] together with
//! a [`traits::Context`] and routes whatever the node emits to its output
//! ports. Nodes keep per-message state in memory and reach the outside world
//! only through the context (scoped storage, status reporting, the clock and
//! the environment).
//!
//! # Key Components
//!
//! - **Message**: JSON-object messages keyed by `_msgid`
//! - **Value**: Path-based field access and truthiness
//! - **Expr**: The query and script expression dialects
//! - **Store**: Node, flow and global context storage
//! - **Traits**: Core abstractions for nodes and node factories
//! - **Testing**: Mock clock and environment providers
//!
//! # Example
//!
//! ```ignore
//! use eddy_core::prelude::*;
//!
//! let ctx = Context::new(NodeId::new(1), FlowId::default());
//! let output = node.execute(ctx, Message::new(42_i64)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod expr;
pub mod message;
pub mod prelude;
pub mod status;
pub mod store;
// Testing module must be declared before traits because traits/context.rs uses testing providers
pub mod testing;
pub mod traits;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use error::{EddyError, Result};
pub use message::Message;
pub use status::NodeStatus;
pub use traits::{Context, Node, NodeFactory, NodeInfo, NodeOutput};
pub use types::{FlowId, MessageId, NodeId};
pub use value::Value;
