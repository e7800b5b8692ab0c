// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene errors.

use crate::node::NodeId;
use framescript_timeline::TimelineError;
use thiserror::Error;

/// Errors raised while mounting or querying the scene
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Animation and media nodes are leaves
    #[error("Node {0} cannot have children")]
    LeafNode(NodeId),

    /// The node is not of the kind the operation needs
    #[error("Node {node} is not a {expected} node")]
    WrongKind {
        /// The node
        node: NodeId,
        /// Kind the operation needs
        expected: &'static str,
    },

    /// A frame query was made with no enclosing clip
    #[error("Node {0} is not inside a clip")]
    OutsideClipScope(NodeId),

    /// Usage error from the timeline core
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
