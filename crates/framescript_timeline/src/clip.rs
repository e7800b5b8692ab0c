// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip intervals, parent clamping and activation.
//!
//! All frames here are absolute project frames unless stated otherwise.
//! A clip's interval is inclusive on both ends; `end == start - 1` is the
//! canonical empty interval and such a clip is never active.

use crate::frame::Frame;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

/// Unique identifier for a mounted clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive frame interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipInterval {
    /// First frame
    pub start: Frame,
    /// Last frame
    pub end: Frame,
}

impl ClipInterval {
    /// Create an interval, normalizing anything shorter than empty
    pub fn new(start: Frame, end: Frame) -> Self {
        Self {
            start,
            end: end.max(start - 1),
        }
    }

    /// Interval of `len` frames starting at `start`
    pub fn with_len(start: Frame, len: Frame) -> Self {
        Self::new(start, start.saturating_add(len.max(0)) - 1)
    }

    /// Empty interval anchored at `start`
    pub fn empty_at(start: Frame) -> Self {
        Self { start, end: start - 1 }
    }

    /// Whether the interval covers at least one frame
    pub fn has_span(&self) -> bool {
        self.end >= self.start
    }

    /// Number of frames covered
    pub fn len(&self) -> Frame {
        self.end.saturating_sub(self.start).saturating_add(1).max(0)
    }

    /// Whether the interval is empty
    pub fn is_empty(&self) -> bool {
        !self.has_span()
    }

    /// Whether `frame` lies inside the interval
    pub fn contains(&self, frame: Frame) -> bool {
        self.has_span() && frame >= self.start && frame <= self.end
    }

    /// Shift both ends by `offset`
    pub fn offset(&self, offset: Frame) -> Self {
        Self {
            start: self.start.saturating_add(offset),
            end: self.end.saturating_add(offset),
        }
    }

    /// Intersection with `other`, empty when they do not overlap
    pub fn intersect(&self, other: &ClipInterval) -> ClipInterval {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end < start {
            Self::empty_at(start)
        } else {
            Self { start, end }
        }
    }
}

/// A mounted clip as stored in the timeline registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Absolute first frame
    pub start: Frame,
    /// Absolute last frame (inclusive)
    pub end: Frame,
    /// Display label
    pub label: Option<String>,
    /// Enclosing clip, a lookup key only
    pub parent_id: Option<ClipId>,
    /// Nesting depth, 0 at top level
    pub depth: u32,
    /// Lane grouping hint
    pub lane_id: Option<String>,
}

impl Clip {
    /// Mount a clip inside `scope` with an interval relative to the scope base
    pub fn mount(scope: &ClipScope, declared: ClipInterval) -> Self {
        let interval = mount_interval(scope, declared);
        Self {
            id: ClipId::new(),
            start: interval.start,
            end: interval.end,
            label: None,
            parent_id: scope.parent,
            depth: scope.depth,
            lane_id: None,
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the lane
    pub fn with_lane(mut self, lane: impl Into<String>) -> Self {
        self.lane_id = Some(lane.into());
        self
    }

    /// The absolute interval
    pub fn interval(&self) -> ClipInterval {
        ClipInterval {
            start: self.start,
            end: self.end,
        }
    }

    /// Whether the clip covers at least one frame
    pub fn has_span(&self) -> bool {
        self.end >= self.start
    }

    /// Activation at `frame` given the clip's resolved visibility
    pub fn activation(&self, frame: Frame, visible: bool) -> Activation {
        resolve_activation(self.interval(), visible, frame)
    }

    /// Scope for clips nested inside this one
    pub fn child_scope(&self) -> ClipScope {
        ClipScope {
            base: self.start,
            end: Some(self.end),
            depth: self.depth + 1,
            parent: Some(self.id),
        }
    }
}

/// Placement context for clips mounted under a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipScope {
    /// Offset added to declared frames
    pub base: Frame,
    /// Last frame a child may occupy, unbounded at the root
    pub end: Option<Frame>,
    /// Depth assigned to clips mounted here
    pub depth: u32,
    /// Clip that owns this scope
    pub parent: Option<ClipId>,
}

impl ClipScope {
    /// Top-level scope
    pub fn root() -> Self {
        Self {
            base: 0,
            end: None,
            depth: 0,
            parent: None,
        }
    }

    /// Same parent and depth, shifted base
    pub fn rebased(&self, base: Frame) -> Self {
        Self { base, ..*self }
    }
}

impl Default for ClipScope {
    fn default() -> Self {
        Self::root()
    }
}

/// Translate a relative interval into `scope` and clamp it to the parent
pub fn mount_interval(scope: &ClipScope, declared: ClipInterval) -> ClipInterval {
    let shifted = declared.offset(scope.base);
    let start = shifted.start.max(scope.base);
    let end = match scope.end {
        Some(parent_end) => shifted.end.min(parent_end),
        None => shifted.end,
    };
    ClipInterval::new(start, end)
}

/// Activation state of a clip at one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    /// Inside the interval and visible
    pub active: bool,
    /// Frame relative to the clip start, never negative
    pub local_frame: Frame,
}

/// Resolve whether an interval is active at `frame`
pub fn resolve_activation(interval: ClipInterval, visible: bool, frame: Frame) -> Activation {
    Activation {
        active: visible && interval.contains(frame),
        local_frame: (frame - interval.start).max(0),
    }
}

/// Aggregate duration: the explicit override, else the largest report
pub fn aggregate_duration(reports: impl IntoIterator<Item = Frame>, explicit: Option<Frame>) -> Frame {
    explicit
        .unwrap_or_else(|| reports.into_iter().max().unwrap_or(0))
        .max(0)
}

/// Duration reports collected by a duration-aware clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationReports<K: Hash + Eq> {
    reports: IndexMap<K, Frame>,
}

impl<K: Hash + Eq> DurationReports<K> {
    /// Create an empty report table
    pub fn new() -> Self {
        Self {
            reports: IndexMap::new(),
        }
    }

    /// Record a report; returns whether anything changed
    pub fn report(&mut self, reporter: K, frames: Frame) -> bool {
        let frames = frames.max(0);
        self.reports.insert(reporter, frames) != Some(frames)
    }

    /// Drop a reporter; returns whether it was present
    pub fn remove(&mut self, reporter: &K) -> bool {
        self.reports.shift_remove(reporter).is_some()
    }

    /// Current report of one reporter
    pub fn get(&self, reporter: &K) -> Option<Frame> {
        self.reports.get(reporter).copied()
    }

    /// Aggregate over the live reports
    pub fn aggregate(&self, explicit: Option<Frame>) -> Frame {
        aggregate_duration(self.reports.values().copied(), explicit)
    }

    /// Number of reporters
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether nothing has reported
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl<K: Hash + Eq> Default for DurationReports<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of laying children out back to back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialLayout {
    /// Repositioned intervals, one per child
    pub intervals: Vec<ClipInterval>,
    /// Frame after the last child
    pub cursor: Frame,
}

/// Place children one after another, preserving each span length.
///
/// Starts at `base` if given, else at the first child's start.
pub fn sequential_layout(children: &[ClipInterval], base: Option<Frame>) -> SequentialLayout {
    let mut cursor = base
        .or_else(|| children.first().map(|c| c.start))
        .unwrap_or(0);
    let intervals = children
        .iter()
        .map(|child| {
            let placed = ClipInterval::with_len(cursor, child.len());
            cursor = placed.end.saturating_add(1);
            placed
        })
        .collect();
    SequentialLayout { intervals, cursor }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_clamped_to_parent() {
        let parent = Clip::mount(&ClipScope::root(), ClipInterval::new(100, 199));
        let scope = parent.child_scope();

        let child = mount_interval(&scope, ClipInterval::new(-20, 150));
        assert_eq!(child, ClipInterval::new(100, 199));

        let inside = mount_interval(&scope, ClipInterval::new(10, 19));
        assert_eq!(inside, ClipInterval::new(110, 119));

        // Same inputs, same interval
        assert_eq!(mount_interval(&scope, ClipInterval::new(-20, 150)), child);
    }

    #[test]
    fn test_child_outside_parent_is_inert() {
        let parent = Clip::mount(&ClipScope::root(), ClipInterval::new(0, 59));
        let child = Clip::mount(&parent.child_scope(), ClipInterval::new(80, 90));
        assert!(!child.has_span());
        assert_eq!(child.end, child.start - 1);
        assert!(!child.activation(60, true).active);
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_id, Some(parent.id));
    }

    #[test]
    fn test_activation() {
        let clip = Clip::mount(&ClipScope::root(), ClipInterval::new(30, 59));
        assert_eq!(
            clip.activation(10, true),
            Activation {
                active: false,
                local_frame: 0
            }
        );
        assert_eq!(
            clip.activation(45, true),
            Activation {
                active: true,
                local_frame: 15
            }
        );
        assert!(!clip.activation(45, false).active);
        assert!(!clip.activation(60, true).active);
        assert_eq!(clip.activation(60, true).local_frame, 30);
    }

    #[test]
    fn test_duration_reports() {
        let mut reports = DurationReports::new();
        reports.report("a", 30);
        reports.report("b", 50);
        reports.report("c", 10);
        assert_eq!(reports.aggregate(None), 50);
        assert_eq!(reports.aggregate(Some(12)), 12);

        assert!(reports.remove(&"b"));
        assert_eq!(reports.aggregate(None), 30);
        assert!(!reports.report("a", 30));
        assert!(reports.report("a", -5));
        assert_eq!(reports.aggregate(None), 10);
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate_duration([], None), 0);
        assert_eq!(aggregate_duration([], Some(-3)), 0);
    }

    #[test]
    fn test_sequential_layout() {
        let children = [
            ClipInterval::with_len(0, 60),
            ClipInterval::with_len(0, 30),
            ClipInterval::with_len(0, 90),
        ];
        let layout = sequential_layout(&children, Some(0));
        let starts: Vec<_> = layout.intervals.iter().map(|c| c.start).collect();
        let ends: Vec<_> = layout.intervals.iter().map(|c| c.end).collect();
        assert_eq!(starts, vec![0, 60, 90]);
        assert_eq!(ends, vec![59, 89, 179]);
        assert_eq!(layout.cursor, 180);
    }

    #[test]
    fn test_sequential_layout_keeps_first_start() {
        let children = [ClipInterval::new(12, 21), ClipInterval::empty_at(0), ClipInterval::new(0, 4)];
        let layout = sequential_layout(&children, None);
        assert_eq!(layout.intervals[0], ClipInterval::new(12, 21));
        assert!(layout.intervals[1].is_empty());
        assert_eq!(layout.intervals[2], ClipInterval::new(22, 26));
        assert_eq!(layout.cursor, 27);
    }

    #[test]
    fn test_intersect() {
        let a = ClipInterval::new(0, 99);
        assert_eq!(a.intersect(&ClipInterval::new(50, 150)), ClipInterval::new(50, 99));
        assert!(a.intersect(&ClipInterval::new(200, 300)).is_empty());
    }
}
