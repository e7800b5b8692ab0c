// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation sequences driving variables on a virtual clock.
//!
//! A sequence body runs against a [`SequenceContext`]. Every
//! `animate(..).to(..)` call writes a segment immediately, anchored at the
//! context's current `now`, and hands back a [`MoveHandle`] carrying the
//! segment's end frame. Waiting on a handle only advances the clock, so
//! parallel branches are expressed by creating several handles before
//! joining them with [`SequenceContext::parallel`].

use crate::easing::Easing;
use crate::error::Result;
use crate::frame::{seconds_to_frames, Frame};
use crate::pending::PendingWork;
use crate::value::VariableValue;
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Unique identifier for an animation sequence instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub Uuid);

impl SequenceId {
    /// Create a new random sequence ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a move: the frame range of the written segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveHandle {
    start: Frame,
    end: Frame,
}

impl MoveHandle {
    /// First frame of the segment
    pub fn start(&self) -> Frame {
        self.start
    }

    /// Last frame of the segment (inclusive)
    pub fn end(&self) -> Frame {
        self.end
    }

    /// Clock position after waiting on this handle
    pub fn resolves_at(&self) -> Frame {
        self.end.saturating_add(1)
    }
}

/// Execution context handed to a sequence body
#[derive(Debug)]
pub struct SequenceContext<'a> {
    sequence: SequenceId,
    fps: f64,
    now: Frame,
    max_frame: Frame,
    touched: &'a mut Vec<Variable>,
}

impl<'a> SequenceContext<'a> {
    /// Current virtual clock position
    pub fn now(&self) -> Frame {
        self.now
    }

    /// High-water mark across all branches so far
    pub fn max_frame(&self) -> Frame {
        self.max_frame
    }

    /// Project frame rate
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Convert seconds to frames at the project rate
    pub fn seconds(&self, seconds: f64) -> Frame {
        seconds_to_frames(seconds, self.fps)
    }

    /// Advance the clock without writing a segment
    pub fn sleep(&mut self, frames: Frame) {
        self.now = self.now.saturating_add(frames.max(0));
        self.max_frame = self.max_frame.max(self.now);
    }

    /// Start a move of `variable`
    pub fn animate(&mut self, variable: &Variable) -> MoveBuilder<'_, 'a> {
        MoveBuilder {
            context: self,
            variable: variable.clone(),
            easing: None,
        }
    }

    /// Wait for one move to finish
    pub fn wait(&mut self, handle: MoveHandle) {
        self.advance_to(handle.resolves_at());
    }

    /// Wait for every given move; the clock lands on the latest end
    pub fn parallel(&mut self, handles: &[MoveHandle]) {
        if let Some(end) = handles.iter().map(MoveHandle::resolves_at).max() {
            self.advance_to(end);
        }
    }

    fn advance_to(&mut self, frame: Frame) {
        self.now = self.now.max(frame);
        self.max_frame = self.max_frame.max(self.now);
    }
}

/// Pending move of one variable
#[derive(Debug)]
pub struct MoveBuilder<'c, 'a> {
    context: &'c mut SequenceContext<'a>,
    variable: Variable,
    easing: Option<Easing>,
}

impl MoveBuilder<'_, '_> {
    /// Use an easing for this move
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Write a segment towards `value` lasting `frames` (at least one)
    pub fn to(self, value: impl Into<VariableValue>, frames: Frame) -> Result<MoveHandle> {
        let context = self.context;
        if self.variable.claim(context.sequence)? {
            context.touched.push(self.variable.clone());
        }
        let segment = self.variable.push_segment(
            context.sequence,
            context.now,
            frames,
            value.into(),
            self.easing,
        )?;
        context.max_frame = context.max_frame.max(segment.end.saturating_add(1));
        Ok(MoveHandle {
            start: segment.start,
            end: segment.end,
        })
    }
}

/// One animation sequence instance and the variables it drives
#[derive(Debug)]
pub struct AnimationSequence {
    id: SequenceId,
    fps: f64,
    touched: Vec<Variable>,
    deps: Option<u64>,
    duration: Frame,
    ready: bool,
    pending: PendingWork,
}

impl AnimationSequence {
    /// Create an idle sequence
    pub fn new(fps: f64, pending: PendingWork) -> Self {
        Self {
            id: SequenceId::new(),
            fps,
            touched: Vec::new(),
            deps: None,
            duration: 0,
            ready: false,
            pending,
        }
    }

    /// Get the sequence ID
    pub fn id(&self) -> SequenceId {
        self.id
    }

    /// Total duration of the last completed run
    pub fn duration(&self) -> Frame {
        self.duration
    }

    /// Whether the last run completed
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Variables owned by the last run
    pub fn variables(&self) -> &[Variable] {
        &self.touched
    }

    /// Run `body` unless `deps` is unchanged since the last completed run.
    /// Returns whether the body ran.
    pub fn run<D, F>(&mut self, deps: &D, body: F) -> Result<bool>
    where
        D: Hash + ?Sized,
        F: FnOnce(&mut SequenceContext<'_>) -> Result<()>,
    {
        let fingerprint = fingerprint(deps);
        if self.ready && self.deps == Some(fingerprint) {
            return Ok(false);
        }
        self.rerun(body)?;
        self.deps = Some(fingerprint);
        Ok(true)
    }

    /// Tear down the previous run and execute `body` unconditionally
    pub fn rerun<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut SequenceContext<'_>) -> Result<()>,
    {
        let _pending = self.pending.guard();
        self.teardown();

        let mut touched = Vec::new();
        let (outcome, max_frame) = {
            let mut context = SequenceContext {
                sequence: self.id,
                fps: self.fps,
                now: 0,
                max_frame: 0,
                touched: &mut touched,
            };
            let outcome = body(&mut context);
            (outcome, context.max_frame)
        };
        self.touched = touched;

        if let Err(err) = outcome {
            tracing::debug!("Sequence {} failed: {}", self.id, err);
            self.teardown();
            return Err(err);
        }

        self.duration = max_frame;
        self.ready = true;
        tracing::debug!(
            "Sequence {} ready: {} frames across {} variables",
            self.id,
            self.duration,
            self.touched.len()
        );
        Ok(())
    }

    /// Release every variable and forget the last run
    pub fn dispose(&mut self) {
        self.teardown();
        self.deps = None;
    }

    fn teardown(&mut self) {
        for variable in self.touched.drain(..) {
            variable.release(self.id);
        }
        self.duration = 0;
        self.ready = false;
    }
}

impl Drop for AnimationSequence {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn fingerprint<D: Hash + ?Sized>(deps: &D) -> u64 {
    let mut hasher = DefaultHasher::new();
    deps.hash(&mut hasher);
    hasher.finish()
}
