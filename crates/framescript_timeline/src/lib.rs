// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-indexed timeline core for FrameScript.
//!
//! This crate provides the pure scheduling layer:
//! - Easing curves (cubic-bezier solver and presets)
//! - Typed animation variables with segment timelines
//! - Animation sequences on a virtual frame clock
//! - Clip intervals, clamping and activation
//! - The timeline registry and lane packing
//! - Audio/video segment planning
//!
//! ## Architecture
//!
//! Everything is frame based. Shared registries live in a
//! [`ProjectContext`] that a scene passes to every mounted node; there is no
//! global state. Sampling is pure and may happen from any thread once
//! segments are settled, which [`PendingWork::wait_ready`] signals.

pub mod animation;
pub mod clip;
pub mod easing;
pub mod error;
pub mod frame;
pub mod lanes;
pub mod media;
pub mod pending;
pub mod playback;
pub mod project;
pub mod registry;
pub mod value;
pub mod variable;

pub use animation::{AnimationSequence, MoveBuilder, MoveHandle, SequenceContext, SequenceId};
pub use clip::{
    aggregate_duration, mount_interval, resolve_activation, sequential_layout, Activation, Clip,
    ClipId, ClipInterval, ClipScope, DurationReports, SequentialLayout,
};
pub use easing::{cubic_bezier, CubicBezier, Easing};
pub use error::{Result, TimelineError};
pub use frame::{frames_to_seconds, millis_to_frames, seconds_to_frames, Frame};
pub use lanes::{stack_clips_into_tracks, track_count, LaneAssignment};
pub use media::{
    flatten_for_display, plan_segment, resolve_trim, AudioPlan, AudioSegment, MediaKind,
    MediaMetadata, MediaSource, ResolvedTrim, SegmentEvent, SegmentId, SegmentRegistry,
    SharedSegments, Trim,
};
pub use pending::{PendingGuard, PendingWork};
pub use playback::{PlaybackState, Transport};
pub use project::{ProjectContext, ProjectSettings};
pub use registry::{
    ActiveClip, RegistryEvent, SharedTimeline, Subscribers, SubscriptionId, TimelineRegistry,
};
pub use value::{VariableKind, VariableValue};
pub use variable::{sample_segments, Segment, Variable, VariableId};
