// SPDX-License-Identifier: MIT OR Apache-2.0
//! Greedy lane packing for timeline display.

use crate::clip::{Clip, ClipId};
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display track chosen for one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneAssignment {
    /// The clip
    pub clip: ClipId,
    /// Track index, 0 at the top
    pub track: usize,
}

/// Pack clips into display tracks.
///
/// Clips are visited by `(start, end)`. A clip with a lane id goes back to
/// that lane's track when it is free at the clip's start; otherwise it takes
/// the first free track, or a new one. Clips without span are skipped.
pub fn stack_clips_into_tracks(clips: &[&Clip]) -> Vec<LaneAssignment> {
    let mut ordered: Vec<&Clip> = clips.iter().copied().filter(|c| c.has_span()).collect();
    ordered.sort_by_key(|clip| (clip.start, clip.end));

    let mut next_free: Vec<Frame> = Vec::new();
    let mut lane_tracks: HashMap<&str, usize> = HashMap::new();
    let mut assignments = Vec::with_capacity(ordered.len());

    for clip in ordered {
        let lane = clip.lane_id.as_deref();
        let sticky = lane
            .and_then(|lane| lane_tracks.get(lane).copied())
            .filter(|&track| next_free[track] <= clip.start);
        let track = sticky
            .or_else(|| next_free.iter().position(|&free| free <= clip.start))
            .unwrap_or_else(|| {
                next_free.push(clip.start);
                next_free.len() - 1
            });

        next_free[track] = clip.end + 1;
        if let Some(lane) = lane {
            lane_tracks.insert(lane, track);
        }
        assignments.push(LaneAssignment {
            clip: clip.id,
            track,
        });
    }

    assignments
}

/// Number of tracks used by an assignment list
pub fn track_count(assignments: &[LaneAssignment]) -> usize {
    assignments
        .iter()
        .map(|a| a.track + 1)
        .max()
        .unwrap_or(0)
}
