//! Prelude for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! # Example
//!
//! ```ignore
//! use eddy_core::prelude::*;
//! ```

// Core types
pub use crate::types::{FlowId, MessageId, NodeId};

// Error handling
pub use crate::error::{EddyError, Result, ResultExt};

// Messages and values
pub use crate::message::{COMMAND_FIELD, MSG_ID_FIELD, Message, PAYLOAD_FIELD};
pub use crate::value::Value;

// Expressions
pub use crate::expr::{Dialect, Expression, QueryScope, Scope, ScriptScope};

// Context storage and status
pub use crate::status::{NodeStatus, StatusFill, StatusShape, StatusSink};
pub use crate::store::{ContextScope, ContextStore, MemoryContextStore};

// Traits
pub use crate::traits::{
    Context, Node, NodeFactory, NodeFuture, NodeInfo, NodeOutput, Port, PortDirection,
};
