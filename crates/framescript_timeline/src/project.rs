// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project settings and the shared services every mounted node sees.

use crate::frame::{seconds_to_frames, Frame};
use crate::media::{AudioPlan, SegmentRegistry, SharedSegments};
use crate::pending::PendingWork;
use crate::registry::{SharedTimeline, TimelineRegistry};
use serde::{Deserialize, Serialize};

/// Default project frame rate
pub const DEFAULT_FPS: f64 = 60.0;

/// Output resolution and frame rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Output width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Output height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl ProjectSettings {
    /// Convert seconds to frames at the project rate
    pub fn seconds(&self, seconds: f64) -> Frame {
        seconds_to_frames(seconds, self.fps)
    }
}

/// Registries and counters shared by one scene tree.
///
/// Cloning shares the same registries.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Project settings
    pub settings: ProjectSettings,
    /// Mounted clips
    pub timeline: SharedTimeline,
    /// Planned media segments
    pub segments: SharedSegments,
    /// In-flight animation work
    pub pending: PendingWork,
}

impl ProjectContext {
    /// Fresh registries for `settings`
    pub fn new(settings: ProjectSettings) -> Self {
        Self {
            settings,
            timeline: TimelineRegistry::shared(),
            segments: SegmentRegistry::shared(),
            pending: PendingWork::new(),
        }
    }

    /// Project frame rate
    pub fn fps(&self) -> f64 {
        self.settings.fps
    }

    /// Total frames across all mounted clips
    pub fn total_duration(&self) -> Frame {
        self.timeline.read().total_duration()
    }

    /// Current audio plan
    pub fn audio_plan(&self) -> AudioPlan {
        self.segments.read().plan(self.settings.fps)
    }
}

impl Default for ProjectContext {
    fn default() -> Self {
        Self::new(ProjectSettings::default())
    }
}
