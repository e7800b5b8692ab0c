// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interactive playback transport driving the frame cursor.

use crate::frame::Frame;
use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Stopped
    #[default]
    Stopped,
    /// Playing forward
    Playing,
    /// Paused
    Paused,
    /// Playing in reverse
    Reverse,
}

/// Wall-clock transport producing integer frames
#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    /// Fractional frame position
    position: f64,
    /// Project frame rate
    fps: f64,
    /// Playback state
    pub state: PlaybackState,
    /// Playback speed multiplier
    pub speed: f64,
    /// Wrap around at the ends instead of stopping
    pub looping: bool,
}

impl Transport {
    /// Create a stopped transport at frame 0
    pub fn new(fps: f64) -> Self {
        Self {
            position: 0.0,
            fps,
            state: PlaybackState::Stopped,
            speed: 1.0,
            looping: false,
        }
    }

    /// Advance by `delta_seconds` of wall-clock time, bounded by `total_frames`.
    /// Returns the resulting frame.
    pub fn update(&mut self, delta_seconds: f64, total_frames: Frame) -> Frame {
        let step = delta_seconds * self.fps * self.speed;
        if step.is_finite() {
            match self.state {
                PlaybackState::Playing => {
                    self.position += step;
                    self.check_bounds(total_frames);
                }
                PlaybackState::Reverse => {
                    self.position -= step;
                    self.check_bounds_reverse(total_frames);
                }
                PlaybackState::Paused | PlaybackState::Stopped => {}
            }
        }
        self.frame()
    }

    fn check_bounds(&mut self, total_frames: Frame) {
        let end = total_frames.max(0) as f64;
        if self.position < 0.0 {
            self.position = 0.0;
            return;
        }
        if self.position < end {
            return;
        }
        if self.looping && end > 0.0 {
            self.position %= end;
        } else {
            self.position = (end - 1.0).max(0.0);
            self.state = PlaybackState::Stopped;
        }
    }

    fn check_bounds_reverse(&mut self, total_frames: Frame) {
        let end = total_frames.max(0) as f64;
        if self.position >= end {
            self.position = (end - 1.0).max(0.0);
            return;
        }
        if self.position >= 0.0 {
            return;
        }
        if self.looping && end > 0.0 {
            self.position = end + (self.position % end);
            if self.position >= end {
                self.position = 0.0;
            }
        } else {
            self.position = 0.0;
            self.state = PlaybackState::Stopped;
        }
    }

    /// Current frame
    pub fn frame(&self) -> Frame {
        self.position.floor() as Frame
    }

    /// Project frame rate
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Play from current position
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.position = 0.0;
    }

    /// Toggle play/pause
    pub fn toggle_playback(&mut self) {
        match self.state {
            PlaybackState::Playing | PlaybackState::Reverse => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Play in reverse
    pub fn play_reverse(&mut self) {
        self.state = PlaybackState::Reverse;
    }

    /// Jump to a frame
    pub fn seek(&mut self, frame: Frame) {
        self.position = frame.max(0) as f64;
    }

    /// Is currently playing (forward or reverse)
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Reverse)
    }
}
