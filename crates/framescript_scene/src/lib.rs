// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph for FrameScript.
//!
//! This crate turns a tree of declarative nodes into registered clips:
//! - Clips with fixed or child-derived durations
//! - `Serial` and `ClipSequence` back-to-back layouts
//! - Animation sequences reporting their length upward
//! - Video/sound nodes publishing audio plan segments
//!
//! ## Architecture
//!
//! Nodes live in an arena owned by [`Scene`] and are addressed by
//! [`NodeId`]. Mounting, unmounting or changing a node relayouts the whole
//! tree and publishes the result to the [`framescript_timeline::ProjectContext`]
//! registries the scene was created with.

pub mod capture;
pub mod error;
pub mod node;
pub mod scene;

pub use capture::{FrameCapture, VariableSample};
pub use error::{Result, SceneError};
pub use node::{
    AnimationProps, ClipProps, MediaProps, NodeId, NodeKind, SequenceBody, SequenceProps,
    SerialProps,
};
pub use scene::Scene;
