//! Error types for eddy.
//!
//! Every error carries a stable code so that log lines and host-side error
//! routing can match on it without parsing messages. Errors are always scoped
//! to a single node or message; none of them is fatal to the host.

use crate::types::{MessageId, NodeId};
use thiserror::Error;

/// The main error type for eddy operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EddyError {
    // =========================================================================
    // Expression Errors (E100-E199)
    // =========================================================================
    /// An expression failed to tokenize or parse.
    #[error("E103: Invalid expression syntax '{expression}' at position {position}: {cause}")]
    ExpressionSyntax {
        /// The expression source text.
        expression: String,
        /// Byte offset where parsing failed.
        position: usize,
        /// Description of the syntax error.
        cause: String,
    },

    /// A construct is not allowed in the selected expression dialect.
    #[error("E104: Expression '{expression}' is not allowed here: {cause}")]
    ExpressionForbidden {
        /// The expression source text.
        expression: String,
        /// Why the construct was rejected.
        cause: String,
    },

    /// Evaluating an expression failed at runtime.
    #[error("E107: Expression evaluation failed: {cause}")]
    ExpressionRuntime {
        /// Description of the runtime failure.
        cause: String,
    },

    // =========================================================================
    // Node Errors (E300-E399)
    // =========================================================================
    /// Node execution failed for a message.
    #[error("E301: Node {node_id} failed on message {msg_id}: {cause}")]
    NodeExecution {
        /// The node that failed.
        node_id: NodeId,
        /// The message being processed.
        msg_id: MessageId,
        /// Reason for the failure.
        cause: String,
    },

    /// Node configuration is invalid, or a session could not be initialized
    /// from the node configuration and message fields.
    #[error("E304: Invalid configuration for node {node_id}: {cause}")]
    NodeConfig {
        /// The node with the invalid configuration.
        node_id: NodeId,
        /// Description of the configuration problem.
        cause: String,
    },

    /// A loop condition failed while being evaluated against a message.
    #[error("E306: Condition evaluation failed in node {node_id}: {cause}")]
    Evaluation {
        /// The node whose condition failed.
        node_id: NodeId,
        /// Description of the failure.
        cause: String,
    },

    // =========================================================================
    // Configuration Errors (E800-E899)
    // =========================================================================
    /// Failed to parse a configuration document.
    #[error("E801: Failed to parse configuration: {cause}")]
    ConfigParse {
        /// Parser error message.
        cause: String,
    },

    /// A configuration field holds an unusable value.
    #[error("E802: Invalid configuration '{field}': {cause}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Description of the problem.
        cause: String,
    },

    /// Unknown node type requested from a registry.
    #[error("E803: Unknown node type '{node_type}'")]
    UnknownNodeType {
        /// The requested type name.
        node_type: String,
    },

    /// Serialization or deserialization failed.
    #[error("E804: Serialization error: {0}")]
    Serialization(String),
}

impl EddyError {
    /// Get the error code (e.g., "E304").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExpressionSyntax { .. } => "E103",
            Self::ExpressionForbidden { .. } => "E104",
            Self::ExpressionRuntime { .. } => "E107",
            Self::NodeExecution { .. } => "E301",
            Self::NodeConfig { .. } => "E304",
            Self::Evaluation { .. } => "E306",
            Self::ConfigParse { .. } => "E801",
            Self::InvalidConfig { .. } => "E802",
            Self::UnknownNodeType { .. } => "E803",
            Self::Serialization(_) => "E804",
        }
    }

    /// Check if this error stems from configuration rather than runtime data.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ExpressionSyntax { .. }
                | Self::ExpressionForbidden { .. }
                | Self::NodeConfig { .. }
                | Self::ConfigParse { .. }
                | Self::InvalidConfig { .. }
                | Self::UnknownNodeType { .. }
        )
    }

    /// Check if this error was raised while evaluating a condition.
    #[must_use]
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            Self::ExpressionRuntime { .. } | Self::Evaluation { .. }
        )
    }

    /// Shorthand for an expression runtime failure.
    pub fn runtime(cause: impl Into<String>) -> Self {
        Self::ExpressionRuntime {
            cause: cause.into(),
        }
    }
}

impl From<serde_json::Error> for EddyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for EddyError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::ConfigParse {
            cause: e.to_string(),
        }
    }
}

/// Result type alias using `EddyError`.
pub type Result<T> = std::result::Result<T, EddyError>;

/// Extension trait for attaching node context to errors.
pub trait ResultExt<T> {
    /// Turn any error into a configuration error for the given node.
    fn config_for(self, node_id: NodeId) -> Result<T>;

    /// Turn any error into an evaluation error for the given node.
    fn evaluation_for(self, node_id: NodeId) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn config_for(self, node_id: NodeId) -> Result<T> {
        self.map_err(|e| EddyError::NodeConfig {
            node_id,
            cause: e.to_string(),
        })
    }

    fn evaluation_for(self, node_id: NodeId) -> Result<T> {
        self.map_err(|e| EddyError::Evaluation {
            node_id,
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_correct() {
        let err = EddyError::NodeConfig {
            node_id: NodeId::new(1),
            cause: "count is missing".to_string(),
        };
        assert_eq!(err.code(), "E304");

        let err = EddyError::ExpressionSyntax {
            expression: "a +".to_string(),
            position: 3,
            cause: "unexpected end".to_string(),
        };
        assert_eq!(err.code(), "E103");
    }

    #[test]
    fn error_display() {
        let err = EddyError::Evaluation {
            node_id: NodeId::new(7),
            cause: "division by zero".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("E306"));
        assert!(msg.contains("node_7"));
        assert!(msg.contains("division by zero"));
    }

    #[test]
    fn error_classification() {
        assert!(
            EddyError::InvalidConfig {
                field: "kind".to_string(),
                cause: "unknown".to_string()
            }
            .is_config_error()
        );
        assert!(EddyError::runtime("boom").is_evaluation_error());
        assert!(!EddyError::runtime("boom").is_config_error());
    }

    #[test]
    fn result_ext_wraps_with_node() {
        let res: std::result::Result<(), &str> = Err("bad regex");
        let err = res.config_for(NodeId::new(3)).unwrap_err();
        assert!(matches!(err, EddyError::NodeConfig { .. }));
        assert!(err.to_string().contains("bad regex"));
    }
}
