// SPDX-License-Identifier: MIT OR Apache-2.0
//! The mounted scene tree.
//!
//! Every mutation (mount, unmount, property change, animation re-run) ends
//! with a relayout: a bottom-up measure pass computing each node's relative
//! start and length, followed by a top-down placement pass that clamps
//! clips to their parents and publishes clips and media segments to the
//! project registries.

use crate::capture::{FrameCapture, VariableSample};
use crate::error::{Result, SceneError};
use crate::node::{ClipProps, MediaProps, NodeId, NodeKind};
use framescript_timeline::{
    mount_interval, plan_segment, resolve_trim, sequential_layout, AnimationSequence, AudioPlan,
    Clip, ClipId, ClipInterval, ClipScope, DurationReports, Frame, LaneAssignment,
    MediaMetadata, ProjectContext, SegmentId, SegmentRegistry, TimelineRegistry, Trim,
    Variable, VariableValue,
};
use indexmap::IndexMap;
use std::hash::Hash;
use std::sync::Arc;

/// Relative placement computed by the measure pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Measure {
    start: Frame,
    len: Frame,
}

impl Measure {
    /// Relative end plus one; what a child reports upward
    fn extent(&self) -> Frame {
        self.start.saturating_add(self.len)
    }

    fn interval(&self) -> ClipInterval {
        ClipInterval::with_len(self.start, self.len)
    }
}

/// Interval imposed by a sequential parent
#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    interval: ClipInterval,
    lane: Option<String>,
}

#[derive(Debug)]
struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    clip_id: Option<ClipId>,
    segment_id: Option<SegmentId>,
    reports: DurationReports<NodeId>,
    measure: Measure,
    scope: ClipScope,
    sequence: Option<AnimationSequence>,
}

impl SceneNode {
    fn new(parent: Option<NodeId>, kind: NodeKind) -> Self {
        let clip_id = matches!(kind, NodeKind::Clip(_)).then(ClipId::new);
        let segment_id = matches!(kind, NodeKind::Media(_)).then(SegmentId::new);
        Self {
            parent,
            children: Vec::new(),
            kind,
            clip_id,
            segment_id,
            reports: DurationReports::new(),
            measure: Measure::default(),
            scope: ClipScope::root(),
            sequence: None,
        }
    }
}

/// Scope for a non-clip node placed into a slot
fn slot_scope(scope: &ClipScope, slot: &ClipInterval) -> ClipScope {
    let interval = mount_interval(scope, *slot);
    ClipScope {
        base: interval.start,
        end: Some(interval.end),
        ..*scope
    }
}

/// A scene tree bound to one project context
#[derive(Debug)]
pub struct Scene {
    context: ProjectContext,
    nodes: IndexMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    next_id: u32,
    frame: Frame,
}

impl Scene {
    /// Create an empty scene
    pub fn new(context: ProjectContext) -> Self {
        Self {
            context,
            nodes: IndexMap::new(),
            roots: Vec::new(),
            next_id: 0,
            frame: 0,
        }
    }

    /// Shared registries
    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    /// Mount a node under `parent` (or at the top level).
    ///
    /// Animation bodies run immediately; a usage error aborts the mount and
    /// leaves the scene unchanged.
    pub fn mount(&mut self, parent: Option<NodeId>, kind: NodeKind) -> Result<NodeId> {
        if let Some(parent_id) = parent {
            let parent_node = self
                .nodes
                .get(&parent_id)
                .ok_or(SceneError::NodeNotFound(parent_id))?;
            if !parent_node.kind.accepts_children() {
                return Err(SceneError::LeafNode(parent_id));
            }
        }

        let mut node = SceneNode::new(parent, kind);
        if let NodeKind::Animation(props) = &node.kind {
            let body = Arc::clone(&props.body);
            let mut sequence =
                AnimationSequence::new(self.context.fps(), self.context.pending.clone());
            sequence.run(&(), &*body)?;
            node.sequence = Some(sequence);
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        tracing::debug!("Mounted {} {}", node.kind.name(), id);
        self.nodes.insert(id, node);
        match parent.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }

        self.relayout();
        Ok(id)
    }

    /// Unmount a node and its subtree, releasing clips, segments and variables
    pub fn unmount(&mut self, id: NodeId) -> Result<()> {
        let parent = self
            .nodes
            .get(&id)
            .ok_or(SceneError::NodeNotFound(id))?
            .parent;

        let mut subtree = Vec::new();
        self.collect_subtree(id, &mut subtree);
        {
            let mut timeline = self.context.timeline.write();
            let mut segments = self.context.segments.write();
            for node_id in subtree {
                let Some(node) = self.nodes.shift_remove(&node_id) else {
                    continue;
                };
                if let Some(clip_id) = node.clip_id {
                    timeline.unregister(clip_id);
                }
                if let Some(segment_id) = node.segment_id {
                    segments.unregister(segment_id);
                }
                if let Some(mut sequence) = node.sequence {
                    sequence.dispose();
                }
            }
        }

        match parent.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            Some(parent_node) => {
                parent_node.children.retain(|child| *child != id);
                parent_node.reports.remove(&id);
            }
            None => self.roots.retain(|root| *root != id),
        }
        tracing::debug!("Unmounted {}", id);

        self.relayout();
        Ok(())
    }

    fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(node) = self.nodes.get(&id) {
            for &child in &node.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Re-run an animation if `deps` changed since its last run.
    /// Returns whether the body ran.
    pub fn rerun_animation<D: Hash + ?Sized>(&mut self, id: NodeId, deps: &D) -> Result<bool> {
        let fps = self.context.fps();
        let pending = self.context.pending.clone();
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::NodeNotFound(id))?;
        let NodeKind::Animation(props) = &node.kind else {
            return Err(SceneError::WrongKind {
                node: id,
                expected: "Animation",
            });
        };
        let body = Arc::clone(&props.body);
        let sequence = node
            .sequence
            .get_or_insert_with(|| AnimationSequence::new(fps, pending));
        let outcome = sequence.run(deps, &*body);

        self.relayout();
        outcome.map_err(SceneError::from)
    }

    /// Replace a clip's properties
    pub fn update_clip(&mut self, id: NodeId, props: ClipProps) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::NodeNotFound(id))?;
        match &mut node.kind {
            NodeKind::Clip(current) => *current = props,
            _ => {
                return Err(SceneError::WrongKind {
                    node: id,
                    expected: "Clip",
                })
            }
        }
        self.relayout();
        Ok(())
    }

    /// Record fetched metadata for a media node
    pub fn set_media_metadata(&mut self, id: NodeId, metadata: MediaMetadata) -> Result<()> {
        self.media_mut(id)?.metadata = Some(metadata);
        self.relayout();
        Ok(())
    }

    /// Change a media node's trim
    pub fn set_media_trim(&mut self, id: NodeId, trim: Option<Trim>) -> Result<()> {
        self.media_mut(id)?.trim = trim;
        self.relayout();
        Ok(())
    }

    fn media_mut(&mut self, id: NodeId) -> Result<&mut MediaProps> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(SceneError::NodeNotFound(id))?;
        match &mut node.kind {
            NodeKind::Media(props) => Ok(props),
            _ => Err(SceneError::WrongKind {
                node: id,
                expected: "Media",
            }),
        }
    }

    /// Media nodes still waiting for metadata
    pub fn pending_media(&self) -> Vec<(NodeId, MediaProps)> {
        self.nodes
            .iter()
            .filter_map(|(id, node)| match &node.kind {
                NodeKind::Media(props) if props.metadata.is_none() => Some((*id, props.clone())),
                _ => None,
            })
            .collect()
    }

    /// Hide or show a clip and, through it, its descendants
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<()> {
        let clip_id = self.clip_id(id)?;
        self.context.timeline.write().set_visible(clip_id, !hidden);
        Ok(())
    }

    /// Registry id of a clip node
    pub fn clip_id(&self, id: NodeId) -> Result<ClipId> {
        self.nodes
            .get(&id)
            .ok_or(SceneError::NodeNotFound(id))?
            .clip_id
            .ok_or(SceneError::WrongKind {
                node: id,
                expected: "Clip",
            })
    }

    /// Registered clip of a clip node
    pub fn clip(&self, id: NodeId) -> Result<Clip> {
        let clip_id = self.clip_id(id)?;
        self.context
            .timeline
            .read()
            .get(clip_id)
            .cloned()
            .ok_or(SceneError::NodeNotFound(id))
    }

    /// Whether a clip node is active at `frame`
    pub fn is_active(&self, id: NodeId, frame: Frame) -> Result<bool> {
        let clip_id = self.clip_id(id)?;
        Ok(self
            .context
            .timeline
            .read()
            .resolve_activation(clip_id, frame)
            .is_some_and(|activation| activation.active))
    }

    /// Whether a clip node and all its ancestors are visible
    pub fn is_visible(&self, id: NodeId) -> Result<bool> {
        let clip_id = self.clip_id(id)?;
        Ok(self.context.timeline.read().is_visible(clip_id))
    }

    fn enclosing_clip(&self, id: NodeId) -> Option<ClipId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            if let Some(clip_id) = node.clip_id {
                return Some(clip_id);
            }
            current = node.parent;
        }
        None
    }

    /// Frame relative to the nearest clip at or above `id`
    pub fn local_frame(&self, id: NodeId, frame: Frame) -> Result<Frame> {
        if !self.nodes.contains_key(&id) {
            return Err(SceneError::NodeNotFound(id));
        }
        let clip_id = self
            .enclosing_clip(id)
            .ok_or(SceneError::OutsideClipScope(id))?;
        self.context
            .timeline
            .read()
            .resolve_activation(clip_id, frame)
            .map(|activation| activation.local_frame)
            .ok_or(SceneError::OutsideClipScope(id))
    }

    /// Sample a variable driven by an animation node at a project frame
    pub fn sample(&self, id: NodeId, variable: &Variable, frame: Frame) -> Result<VariableValue> {
        let node = self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))?;
        if !matches!(node.kind, NodeKind::Animation(_)) {
            return Err(SceneError::WrongKind {
                node: id,
                expected: "Animation",
            });
        }
        Ok(variable.sample((frame - node.scope.base).max(0)))
    }

    /// Move the frame cursor
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame.max(0);
    }

    /// Current frame cursor
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Resolve active clips and animated values at `frame`
    pub fn capture(&self, frame: Frame) -> FrameCapture {
        let timeline = self.context.timeline.read();
        let active = timeline.active_at(frame);

        let mut samples = Vec::new();
        for (&id, node) in &self.nodes {
            let (Some(sequence), NodeKind::Animation(props)) = (&node.sequence, &node.kind) else {
                continue;
            };
            if let Some(clip_id) = self.enclosing_clip(id) {
                let clip_active = timeline
                    .resolve_activation(clip_id, frame)
                    .is_some_and(|activation| activation.active);
                if !clip_active {
                    continue;
                }
            }
            let local_frame = (frame - node.scope.base).max(0);
            samples.extend(sequence.variables().iter().map(|variable| VariableSample {
                node: id,
                label: props.label.clone(),
                variable: variable.id(),
                local_frame,
                value: variable.sample(local_frame),
            }));
        }

        FrameCapture {
            frame,
            active,
            samples,
        }
    }

    /// Capture at the frame cursor
    pub fn capture_current(&self) -> FrameCapture {
        self.capture(self.frame)
    }

    /// Total frames across all mounted clips
    pub fn total_duration(&self) -> Frame {
        self.context.total_duration()
    }

    /// Current audio plan
    pub fn audio_plan(&self) -> AudioPlan {
        self.context.audio_plan()
    }

    /// Display lanes
    pub fn lanes(&self) -> Vec<LaneAssignment> {
        self.context.timeline.read().lanes()
    }

    /// Get the kind of a node
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id).map(|node| &node.kind)
    }

    /// Children of a node in mount order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map_or(&[], |node| node.children.as_slice())
    }

    /// Get the number of mounted nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn relayout(&mut self) {
        let roots = self.roots.clone();
        for &root in &roots {
            self.measure(root);
        }

        let timeline_lock = Arc::clone(&self.context.timeline);
        let segments_lock = Arc::clone(&self.context.segments);
        let mut timeline = timeline_lock.write();
        let mut segments = segments_lock.write();
        for root in roots {
            self.place(root, ClipScope::root(), None, &mut timeline, &mut segments);
        }
    }

    fn measure(&mut self, id: NodeId) -> Measure {
        let children = match self.nodes.get(&id) {
            Some(node) => node.children.clone(),
            None => return Measure::default(),
        };
        let child_measures: Vec<(NodeId, Measure)> = children
            .iter()
            .map(|&child| (child, self.measure(child)))
            .collect();

        let fps = self.context.fps();
        let Some(node) = self.nodes.get_mut(&id) else {
            return Measure::default();
        };
        let measure = match &node.kind {
            NodeKind::Group => Measure {
                start: 0,
                len: child_measures
                    .iter()
                    .map(|(_, m)| m.extent())
                    .max()
                    .unwrap_or(0)
                    .max(0),
            },
            NodeKind::Clip(props) => match props.end {
                Some(end) => Measure {
                    start: props.start,
                    len: end.saturating_sub(props.start).saturating_add(1).max(0),
                },
                None => {
                    for (child, m) in &child_measures {
                        node.reports.report(*child, m.extent());
                    }
                    Measure {
                        start: props.start,
                        len: node.reports.aggregate(props.duration),
                    }
                }
            },
            NodeKind::Serial(props) => {
                let intervals: Vec<ClipInterval> =
                    child_measures.iter().map(|(_, m)| m.interval()).collect();
                let layout = sequential_layout(&intervals, props.base);
                let start = props
                    .base
                    .or_else(|| intervals.first().map(|i| i.start))
                    .unwrap_or(0);
                Measure {
                    start,
                    len: (layout.cursor - start).max(0),
                }
            }
            NodeKind::ClipSequence(props) => {
                for (child, m) in &child_measures {
                    node.reports.report(*child, m.len);
                }
                Measure {
                    start: props.base,
                    len: children.iter().filter_map(|c| node.reports.get(c)).sum(),
                }
            }
            NodeKind::Animation(_) => Measure {
                start: 0,
                len: node.sequence.as_ref().map_or(0, AnimationSequence::duration),
            },
            NodeKind::Media(props) => {
                let raw = props.metadata.map_or(0, |m| m.frames(fps));
                let trim = resolve_trim(raw, props.trim.as_ref());
                Measure {
                    start: 0,
                    len: (raw - trim.trim_start - trim.trim_end).max(0),
                }
            }
        };
        node.measure = measure;
        measure
    }

    fn place(
        &mut self,
        id: NodeId,
        scope: ClipScope,
        slot: Option<Slot>,
        timeline: &mut TimelineRegistry,
        segments: &mut SegmentRegistry,
    ) {
        let children = match self.nodes.get(&id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        let child_measures: Vec<Measure> = children
            .iter()
            .map(|child| self.nodes.get(child).map_or_else(Measure::default, |n| n.measure))
            .collect();
        let fps = self.context.fps();

        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let slotted = slot.is_some();
        let inner_scope = match &slot {
            Some(slot) => slot_scope(&scope, &slot.interval),
            None => scope,
        };

        let plan: Vec<(NodeId, ClipScope, Option<Slot>)> = match &node.kind {
            NodeKind::Clip(props) => {
                let (declared, lane) = match slot {
                    Some(slot) => (slot.interval, props.lane.clone().or(slot.lane)),
                    None => (node.measure.interval(), props.lane.clone()),
                };
                let interval = mount_interval(&scope, declared);
                let clip = Clip {
                    id: *node.clip_id.get_or_insert_with(ClipId::new),
                    start: interval.start,
                    end: interval.end,
                    label: props.label.clone(),
                    parent_id: scope.parent,
                    depth: scope.depth,
                    lane_id: lane,
                };
                let child_scope = clip.child_scope();
                node.scope = scope;
                timeline.register(clip);
                children
                    .into_iter()
                    .map(|child| (child, child_scope, None))
                    .collect()
            }
            NodeKind::Group => {
                node.scope = inner_scope;
                children
                    .into_iter()
                    .map(|child| (child, inner_scope, None))
                    .collect()
            }
            NodeKind::Serial(props) => {
                let origin = if slotted { 0 } else { node.measure.start };
                let lane = props
                    .lane
                    .clone()
                    .unwrap_or_else(|| format!("serial-{}", id.0));
                let intervals: Vec<ClipInterval> =
                    child_measures.iter().map(Measure::interval).collect();
                let layout = sequential_layout(&intervals, Some(origin));
                node.scope = inner_scope;
                children
                    .into_iter()
                    .zip(layout.intervals)
                    .map(|(child, interval)| {
                        let slot = Slot {
                            interval,
                            lane: Some(lane.clone()),
                        };
                        (child, inner_scope, Some(slot))
                    })
                    .collect()
            }
            NodeKind::ClipSequence(props) => {
                let origin = if slotted { 0 } else { props.base };
                let lane = props
                    .lane
                    .clone()
                    .unwrap_or_else(|| format!("sequence-{}", id.0));
                let intervals: Vec<ClipInterval> = children
                    .iter()
                    .map(|child| ClipInterval::with_len(0, node.reports.get(child).unwrap_or(0)))
                    .collect();
                let layout = sequential_layout(&intervals, Some(origin));
                node.scope = inner_scope;
                children
                    .into_iter()
                    .zip(layout.intervals)
                    .map(|(child, interval)| {
                        let slot = Slot {
                            interval,
                            lane: Some(lane.clone()),
                        };
                        (child, inner_scope, Some(slot))
                    })
                    .collect()
            }
            NodeKind::Animation(_) => {
                node.scope = inner_scope;
                Vec::new()
            }
            NodeKind::Media(props) => {
                node.scope = inner_scope;
                let raw = props.metadata.map_or(0, |m| m.frames(fps));
                let trim = resolve_trim(raw, props.trim.as_ref());
                let range = match inner_scope.end {
                    Some(end) => ClipInterval::new(inner_scope.base, end),
                    None => ClipInterval::with_len(inner_scope.base, node.measure.len),
                };
                let segment_id = *node.segment_id.get_or_insert_with(SegmentId::new);
                match plan_segment(segment_id, range, raw, trim, props.source.clone()) {
                    Some(segment) => {
                        segments.register(segment);
                    }
                    None => {
                        segments.unregister(segment_id);
                    }
                }
                Vec::new()
            }
        };

        for (child, child_scope, child_slot) in plan {
            self.place(child, child_scope, child_slot, timeline, segments);
        }
    }
}
