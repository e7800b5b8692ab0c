// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation variables and their segment timelines.
//!
//! A [`Variable`] is a shared handle: cloning it clones the handle, not the
//! timeline. Segments are only written by the sequence currently owning the
//! variable (see [`crate::animation`]); sampling is a pure function of the
//! settled segment list.

use crate::animation::SequenceId;
use crate::easing::Easing;
use crate::error::{Result, TimelineError};
use crate::frame::Frame;
use crate::value::{VariableKind, VariableValue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    /// Create a new random variable ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A time-bounded interpolation instruction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First frame (inclusive)
    pub start: Frame,
    /// Last frame (inclusive)
    pub end: Frame,
    /// Value at `start`
    pub from: VariableValue,
    /// Value at `end`
    pub to: VariableValue,
    /// Easing, linear when absent
    pub easing: Option<Easing>,
}

impl Segment {
    /// Inclusive length, never below one
    pub fn duration(&self) -> Frame {
        self.end.saturating_sub(self.start).saturating_add(1).max(1)
    }

    /// Interpolated value for a frame inside `[start, end]`
    pub fn value_at(&self, frame: Frame) -> VariableValue {
        let duration = self.duration();
        if duration == 1 {
            return self.to;
        }
        let t = (frame.saturating_sub(self.start) as f64 / (duration - 1) as f64).clamp(0.0, 1.0);
        let eased = match self.easing {
            Some(easing) => easing.apply(t),
            None => t,
        };
        self.from.lerp(&self.to, eased)
    }
}

/// Sample a segment list at `frame`, holding the last reached value
pub fn sample_segments(initial: VariableValue, segments: &[Segment], frame: Frame) -> VariableValue {
    let mut value = initial;
    for segment in segments {
        if frame < segment.start {
            return value;
        }
        if frame <= segment.end {
            return segment.value_at(frame);
        }
        value = segment.to;
    }
    value
}

#[derive(Debug)]
struct VariableState {
    kind: VariableKind,
    initial: VariableValue,
    segments: Vec<Segment>,
    owner: Option<SequenceId>,
}

/// An animatable value with a segment timeline
#[derive(Debug, Clone)]
pub struct Variable {
    id: VariableId,
    state: Arc<RwLock<VariableState>>,
}

impl Variable {
    /// Create a variable; its kind is fixed by the initial value
    pub fn new(initial: impl Into<VariableValue>) -> Self {
        let initial = initial.into();
        Self {
            id: VariableId::new(),
            state: Arc::new(RwLock::new(VariableState {
                kind: initial.kind(),
                initial,
                segments: Vec::new(),
                owner: None,
            })),
        }
    }

    /// Create a variable from a flat component list
    pub fn from_components(components: &[f64]) -> Result<Self> {
        VariableValue::from_components(components).map(Self::new)
    }

    /// Get the variable ID
    pub fn id(&self) -> VariableId {
        self.id
    }

    /// Get the kind fixed at creation
    pub fn kind(&self) -> VariableKind {
        self.state.read().kind
    }

    /// Get the initial value
    pub fn initial(&self) -> VariableValue {
        self.state.read().initial
    }

    /// Replace the initial value; the kind must not change
    pub fn set_initial(&self, value: impl Into<VariableValue>) -> Result<()> {
        let value = value.into();
        let mut state = self.state.write();
        value.expect_kind(state.kind)?;
        state.initial = value;
        Ok(())
    }

    /// Sample the value at `frame`
    pub fn sample(&self, frame: Frame) -> VariableValue {
        let state = self.state.read();
        sample_segments(state.initial, &state.segments, frame)
    }

    /// Copy of the current segment list
    pub fn segments(&self) -> Vec<Segment> {
        self.state.read().segments.clone()
    }

    /// Get segment count
    pub fn segment_count(&self) -> usize {
        self.state.read().segments.len()
    }

    /// The sequence currently driving this variable
    pub fn owner(&self) -> Option<SequenceId> {
        self.state.read().owner
    }

    /// Claim ownership for `sequence`. Returns `true` if newly claimed.
    pub(crate) fn claim(&self, sequence: SequenceId) -> Result<bool> {
        let mut state = self.state.write();
        match state.owner {
            Some(owner) if owner == sequence => Ok(false),
            Some(owner) => Err(TimelineError::OwnershipConflict {
                variable: self.id,
                owner,
            }),
            None => {
                state.owner = Some(sequence);
                Ok(true)
            }
        }
    }

    /// Append a segment anchored at `start`; the caller must own the variable
    pub(crate) fn push_segment(
        &self,
        sequence: SequenceId,
        start: Frame,
        frames: Frame,
        to: VariableValue,
        easing: Option<Easing>,
    ) -> Result<Segment> {
        let mut state = self.state.write();
        if let Some(owner) = state.owner.filter(|owner| *owner != sequence) {
            return Err(TimelineError::OwnershipConflict {
                variable: self.id,
                owner,
            });
        }
        to.expect_kind(state.kind)?;

        let frames = frames.max(1);
        let from = sample_segments(state.initial, &state.segments, start);
        let segment = Segment {
            start,
            end: start.saturating_add(frames - 1),
            from,
            to,
            easing,
        };
        state.segments.push(segment);
        Ok(segment)
    }

    /// Drop ownership and clear segments if `sequence` owns this variable
    pub(crate) fn release(&self, sequence: SequenceId) {
        let mut state = self.state.write();
        if state.owner == Some(sequence) {
            state.owner = None;
            state.segments.clear();
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}
