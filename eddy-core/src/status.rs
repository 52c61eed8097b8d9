//! Node status reporting.
//!
//! Nodes publish a small status badge (colour, shape, text) that hosts show
//! next to the node. Publishing an empty status clears the badge.

use crate::types::NodeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Badge colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Yellow.
    Yellow,
    /// Blue.
    Blue,
    /// Grey.
    Grey,
}

/// Badge shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    /// Filled dot.
    Dot,
    /// Hollow ring.
    Ring,
}

/// A status badge. The default value is the cleared status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    /// Badge colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<StatusFill>,
    /// Badge shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<StatusShape>,
    /// Badge text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl NodeStatus {
    /// Create a status badge.
    pub fn new(fill: StatusFill, shape: StatusShape, text: impl Into<String>) -> Self {
        Self {
            fill: Some(fill),
            shape: Some(shape),
            text: text.into(),
        }
    }

    /// The cleared status.
    pub fn clear() -> Self {
        Self::default()
    }

    /// Check if this is the cleared status.
    pub fn is_clear(&self) -> bool {
        self.fill.is_none() && self.shape.is_none() && self.text.is_empty()
    }
}

/// Receiver of node status updates.
pub trait StatusSink: Send + Sync {
    /// Publish a status for a node.
    fn status(&self, node_id: NodeId, status: NodeStatus);
}

/// Status sink that emits updates as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn status(&self, node_id: NodeId, status: NodeStatus) {
        if status.is_clear() {
            tracing::debug!(node_id = %node_id, "Status cleared");
        } else {
            tracing::debug!(
                node_id = %node_id,
                fill = ?status.fill,
                shape = ?status.shape,
                text = %status.text,
                "Status updated"
            );
        }
    }
}

/// Status sink that records every update, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    updates: Mutex<Vec<(NodeId, NodeStatus)>>,
}

impl RecordingStatus {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded updates in order.
    pub fn updates(&self) -> Vec<(NodeId, NodeStatus)> {
        self.updates.lock().clone()
    }

    /// The most recent status, if any.
    pub fn last(&self) -> Option<NodeStatus> {
        self.updates.lock().last().map(|(_, s)| s.clone())
    }

    /// Number of recorded updates.
    pub fn len(&self) -> usize {
        self.updates.lock().len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.updates.lock().is_empty()
    }
}

impl StatusSink for RecordingStatus {
    fn status(&self, node_id: NodeId, status: NodeStatus) {
        self.updates.lock().push((node_id, status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clear_status_serializes_empty() {
        assert_eq!(serde_json::to_value(NodeStatus::clear()).unwrap(), json!({}));
        assert!(NodeStatus::clear().is_clear());
    }

    #[test]
    fn status_serializes_lowercase() {
        let status = NodeStatus::new(StatusFill::Blue, StatusShape::Dot, "looping");
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"fill": "blue", "shape": "dot", "text": "looping"})
        );
    }

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingStatus::new();
        recorder.status(NodeId::new(1), NodeStatus::new(StatusFill::Blue, StatusShape::Dot, "a"));
        recorder.status(NodeId::new(1), NodeStatus::clear());

        assert_eq!(recorder.len(), 2);
        assert!(recorder.last().unwrap().is_clear());
    }
}
