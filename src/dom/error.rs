use thiserror::Error;

use crate::dom::dom_model::NodeId;

/// Failures raised by page-model operations. These correspond to the
/// exceptions a browser DOM throws while reading or mutating a control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("<{tag}> does not support {operation}")]
    Unsupported { tag: String, operation: &'static str },

    #[error("invalid state on node {node:?}: {reason}")]
    InvalidState { node: NodeId, reason: String },
}
