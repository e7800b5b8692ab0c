// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio/video segment planning.
//!
//! A media node maps its clip interval, trim and source duration onto an
//! [`AudioSegment`] in project frames. Live segments are kept in a
//! [`SegmentRegistry`]; its flattened content is the audio plan handed to the
//! external mixdown step before export.

use crate::clip::ClipInterval;
use crate::frame::{millis_to_frames, Frame};
use crate::registry::{SubscriptionId, Subscribers};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Fallback frame rate for plans carrying an unusable rate
pub const DEFAULT_PLAN_FPS: f64 = 60.0;

/// Kind of media source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video file; its audio track is mixed
    Video,
    /// Audio-only file
    Sound,
}

/// Reference to a media file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaSource {
    /// Video file
    Video {
        /// File path as understood by the backend
        path: String,
    },
    /// Audio file
    Sound {
        /// File path as understood by the backend
        path: String,
    },
}

impl MediaSource {
    /// Video source
    pub fn video(path: impl Into<String>) -> Self {
        Self::Video { path: path.into() }
    }

    /// Sound source
    pub fn sound(path: impl Into<String>) -> Self {
        Self::Sound { path: path.into() }
    }

    /// Source kind
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video { .. } => MediaKind::Video,
            Self::Sound { .. } => MediaKind::Sound,
        }
    }

    /// Source path
    pub fn path(&self) -> &str {
        match self {
            Self::Video { path } | Self::Sound { path } => path,
        }
    }
}

/// Duration lookup result for a source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Source duration in milliseconds
    pub duration_ms: u64,
    /// Native frame rate, video only
    #[serde(default)]
    pub fps: Option<f64>,
}

impl MediaMetadata {
    /// Source duration in project frames
    pub fn frames(&self, project_fps: f64) -> Frame {
        millis_to_frames(self.duration_ms, project_fps)
    }
}

/// Trim request on a media node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trim {
    /// Frames cut from both ends
    Explicit {
        /// Frames skipped at the start
        trim_start: Frame,
        /// Frames skipped at the end
        trim_end: Frame,
    },
    /// Window into the source
    Range {
        /// First source frame used
        from: Frame,
        /// Frames used from `from`
        duration: Frame,
    },
}

/// Trim converted to start/end offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedTrim {
    /// Frames skipped at the start
    pub trim_start: Frame,
    /// Frames skipped at the end
    pub trim_end: Frame,
}

/// Convert a trim request into start/end offsets
pub fn resolve_trim(raw_duration: Frame, trim: Option<&Trim>) -> ResolvedTrim {
    match trim {
        None => ResolvedTrim::default(),
        Some(Trim::Explicit {
            trim_start,
            trim_end,
        }) => ResolvedTrim {
            trim_start: (*trim_start).max(0),
            trim_end: (*trim_end).max(0),
        },
        Some(Trim::Range { from, duration }) => ResolvedTrim {
            trim_start: (*from).max(0),
            trim_end: (raw_duration - (from + duration)).max(0),
        },
    }
}

/// Unique identifier for a planned segment, stable per mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    /// Create a new random segment ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source range placed on the project timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSegment {
    /// Segment ID
    pub id: SegmentId,
    /// Media source
    pub source: MediaSource,
    /// First project frame
    pub project_start_frame: Frame,
    /// Source frame played at `project_start_frame`
    pub source_start_frame: Frame,
    /// Number of frames
    pub duration_frames: Frame,
}

impl AudioSegment {
    /// Covered project interval
    pub fn project_interval(&self) -> ClipInterval {
        ClipInterval::with_len(self.project_start_frame, self.duration_frames)
    }
}

/// Place a source inside `clip`; `None` if nothing would play
pub fn plan_segment(
    id: SegmentId,
    clip: ClipInterval,
    raw_duration: Frame,
    trim: ResolvedTrim,
    source: MediaSource,
) -> Option<AudioSegment> {
    let available = raw_duration - trim.trim_start - trim.trim_end;
    let duration = clip.len().min(available);
    if duration <= 0 {
        return None;
    }
    Some(AudioSegment {
        id,
        source,
        project_start_frame: clip.start,
        source_start_frame: trim.trim_start,
        duration_frames: duration,
    })
}

/// Clip every segment to `clip`, shifting source offsets by the clamp delta
pub fn flatten_for_display<'a>(
    segments: impl IntoIterator<Item = &'a AudioSegment>,
    clip: ClipInterval,
) -> Vec<AudioSegment> {
    segments
        .into_iter()
        .filter_map(|segment| {
            let overlap = segment.project_interval().intersect(&clip);
            if overlap.is_empty() {
                return None;
            }
            let delta = overlap.start - segment.project_start_frame;
            Some(AudioSegment {
                project_start_frame: overlap.start,
                source_start_frame: segment.source_start_frame + delta,
                duration_frames: overlap.len(),
                ..segment.clone()
            })
        })
        .collect()
}

/// Flattened segment list handed to the mixdown step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPlan {
    /// Project frame rate
    pub fps: f64,
    /// Planned segments
    pub segments: Vec<AudioSegment>,
}

impl AudioPlan {
    /// Normalize for submission: usable fps, no negative frames, no empty segments
    pub fn sanitized(self) -> Self {
        let fps = if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            DEFAULT_PLAN_FPS
        };
        let segments = self
            .segments
            .into_iter()
            .filter(|segment| segment.duration_frames > 0)
            .map(|segment| AudioSegment {
                project_start_frame: segment.project_start_frame.max(0),
                source_start_frame: segment.source_start_frame.max(0),
                ..segment
            })
            .collect();
        Self { fps, segments }
    }

    /// Last project frame covered plus one
    pub fn end_frame(&self) -> Frame {
        self.segments
            .iter()
            .map(|s| s.project_start_frame + s.duration_frames)
            .max()
            .unwrap_or(0)
    }
}

impl Default for AudioPlan {
    fn default() -> Self {
        Self {
            fps: DEFAULT_PLAN_FPS,
            segments: Vec::new(),
        }
    }
}

/// Segment registry mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEvent {
    /// A segment was added
    Registered(SegmentId),
    /// A segment was replaced
    Updated(SegmentId),
    /// A segment was removed
    Unregistered(SegmentId),
}

/// All live media segments
#[derive(Debug, Default)]
pub struct SegmentRegistry {
    segments: IndexMap<SegmentId, AudioSegment>,
    subscribers: Subscribers<SegmentEvent>,
}

/// Segment registry shared between the scene and the exporter
pub type SharedSegments = Arc<RwLock<SegmentRegistry>>;

impl SegmentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry behind a shared lock
    pub fn shared() -> SharedSegments {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Add or replace a segment. Returns `false` if an identical entry existed.
    pub fn register(&mut self, segment: AudioSegment) -> bool {
        let id = segment.id;
        let event = match self.segments.get(&id) {
            Some(existing) if *existing == segment => return false,
            Some(_) => SegmentEvent::Updated(id),
            None => SegmentEvent::Registered(id),
        };
        tracing::debug!(
            "Segment {} planned: {} frames at {}",
            id,
            segment.duration_frames,
            segment.project_start_frame
        );
        self.segments.insert(id, segment);
        self.subscribers.notify(&event);
        true
    }

    /// Remove a segment
    pub fn unregister(&mut self, id: SegmentId) -> Option<AudioSegment> {
        let segment = self.segments.shift_remove(&id)?;
        self.subscribers.notify(&SegmentEvent::Unregistered(id));
        Some(segment)
    }

    /// Get a segment
    pub fn get(&self, id: SegmentId) -> Option<&AudioSegment> {
        self.segments.get(&id)
    }

    /// All segments in registration order
    pub fn snapshot(&self) -> Vec<AudioSegment> {
        self.segments.values().cloned().collect()
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether nothing is planned
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments overlapping `clip`, clipped to it
    pub fn flatten(&self, clip: ClipInterval) -> Vec<AudioSegment> {
        flatten_for_display(self.segments.values(), clip)
    }

    /// The audio plan at `fps`
    pub fn plan(&self, fps: f64) -> AudioPlan {
        AudioPlan {
            fps,
            segments: self.snapshot(),
        }
        .sanitized()
    }

    /// Add a listener
    pub fn subscribe(
        &mut self,
        listener: impl Fn(&SegmentEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
