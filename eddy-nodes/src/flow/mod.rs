//! Flow control nodes.
//!
//! - [`LoopNode`] - Per-message counted, conditional or enumerated iteration

pub mod loop_node;

pub use loop_node::{LoopConfig, LoopKind, LoopNode};
