//! Standard library nodes for eddy.
//!
//! ## Flow Control (`flow::*`)
//! - [`flow::LoopNode`] - Per-message iteration with counted, conditional and
//!   enumerated loop kinds, restart/break commands and time limits
//!
//! ## Registry (`registry::*`)
//! - [`registry::NodeRegistry`] - Builds nodes from YAML by type name

pub mod flow;
pub mod registry;

// Flow control exports
pub use flow::loop_node::{
    ConditionType, ConditionWhen, EnumerationType, FinalPayload, LoopConfig, LoopKind, LoopNode,
    LoopPayload,
};

// Registry exports
pub use registry::{LoopNodeFactory, NodeRegistry, create_standard_registry};

/// Prelude for commonly used types.
pub mod prelude {
    pub use crate::flow::loop_node::{
        BREAK_COMMAND, CONTINUE_PORT, ConditionType, ConditionWhen, DONE_PORT, EnumerationType,
        FinalPayload, LOOP_FIELD, LoopConfig, LoopKind, LoopNode, LoopPayload, RESTART_COMMAND,
    };
    pub use crate::registry::{LoopNodeFactory, NodeRegistry, create_standard_registry};
}
