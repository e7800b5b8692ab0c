// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the scene graph.

use framescript_timeline::{
    Frame, MediaMetadata, MediaSource, SequenceContext, TimelineError, Trim,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Arena index of a mounted node, stable until unmount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A time-scoped clip.
///
/// With `end` set the interval is fixed. Without it the clip is duration
/// aware: its length is `duration` if given, else the largest extent
/// reported by its children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClipProps {
    /// First frame, relative to the parent
    pub start: Frame,
    /// Last frame (inclusive), relative to the parent
    pub end: Option<Frame>,
    /// Explicit length for a duration-aware clip
    pub duration: Option<Frame>,
    /// Display label
    pub label: Option<String>,
    /// Lane grouping hint
    pub lane: Option<String>,
}

impl ClipProps {
    /// Clip covering `[start, end]`
    pub fn fixed(start: Frame, end: Frame) -> Self {
        Self {
            start,
            end: Some(end),
            ..Self::default()
        }
    }

    /// Duration-aware clip starting at `start`
    pub fn auto(start: Frame) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    /// Override the aggregated length
    pub fn with_duration(mut self, duration: Frame) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the lane
    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    /// Whether the length comes from children
    pub fn is_duration_aware(&self) -> bool {
        self.end.is_none()
    }
}

/// Back-to-back layout keeping each child's own span
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerialProps {
    /// First frame; defaults to the first child's start
    pub base: Option<Frame>,
    /// Shared lane for the children
    pub lane: Option<String>,
}

/// Back-to-back layout driven by the children's live duration reports
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceProps {
    /// First frame
    pub base: Frame,
    /// Shared lane for the children
    pub lane: Option<String>,
}

/// A video or sound placed in the enclosing clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProps {
    /// Media file
    pub source: MediaSource,
    /// Trim request
    pub trim: Option<Trim>,
    /// Duration lookup, unknown until fetched
    pub metadata: Option<MediaMetadata>,
}

impl MediaProps {
    /// Untrimmed media with unknown duration
    pub fn new(source: MediaSource) -> Self {
        Self {
            source,
            trim: None,
            metadata: None,
        }
    }

    /// Set the trim
    pub fn with_trim(mut self, trim: Trim) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Set already known metadata
    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Body of an animation sequence
pub type SequenceBody =
    Arc<dyn Fn(&mut SequenceContext<'_>) -> Result<(), TimelineError> + Send + Sync>;

/// An animation sequence reporting its length to the enclosing clip
#[derive(Clone)]
pub struct AnimationProps {
    /// Display label
    pub label: Option<String>,
    /// Sequence body, run on mount and whenever dependencies change
    pub body: SequenceBody,
}

impl AnimationProps {
    /// Wrap a sequence body
    pub fn new(
        body: impl Fn(&mut SequenceContext<'_>) -> Result<(), TimelineError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: None,
            body: Arc::new(body),
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Debug for AnimationProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationProps")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// What a mounted node does
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Transparent container; a nested timeline root behaves the same
    Group,
    /// Time-scoped clip
    Clip(ClipProps),
    /// Sequential layout of existing spans
    Serial(SerialProps),
    /// Sequential layout of reported durations
    ClipSequence(SequenceProps),
    /// Animation sequence
    Animation(AnimationProps),
    /// Video or sound
    Media(MediaProps),
}

impl NodeKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::Clip(_) => "Clip",
            Self::Serial(_) => "Serial",
            Self::ClipSequence(_) => "ClipSequence",
            Self::Animation(_) => "Animation",
            Self::Media(_) => "Media",
        }
    }

    /// Whether children may be mounted under this node
    pub fn accepts_children(&self) -> bool {
        !matches!(self, Self::Animation(_) | Self::Media(_))
    }
}
