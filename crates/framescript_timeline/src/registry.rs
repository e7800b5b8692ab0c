// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline registry: every mounted clip plus the hidden set.
//!
//! One registry exists per project context. Mutations notify subscribers
//! synchronously, before the mutating call returns. Listeners run while the
//! caller still holds the registry, so they must not call back into it.

use crate::clip::{Activation, Clip, ClipId};
use crate::frame::Frame;
use crate::lanes::{stack_clips_into_tracks, LaneAssignment};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Synchronous listener list
pub struct Subscribers<E> {
    next_id: u64,
    listeners: IndexMap<SubscriptionId, Listener<E>>,
}

impl<E> Subscribers<E> {
    /// Create an empty listener list
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: IndexMap::new(),
        }
    }

    /// Add a listener
    pub fn subscribe(&mut self, listener: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Remove a listener; returns whether it existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.shift_remove(&id).is_some()
    }

    /// Call every listener in subscription order
    pub fn notify(&self, event: &E) {
        for listener in self.listeners.values() {
            listener(event);
        }
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether nobody listens
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Registry mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A clip was added
    Registered(ClipId),
    /// A clip's interval or metadata changed
    Updated(ClipId),
    /// A clip was removed
    Unregistered(ClipId),
    /// A clip's explicit visibility flag changed
    VisibilityChanged {
        /// The clip
        id: ClipId,
        /// New flag
        visible: bool,
    },
}

/// An active clip at a queried frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveClip {
    /// The clip
    pub id: ClipId,
    /// Display label
    pub label: Option<String>,
    /// Nesting depth
    pub depth: u32,
    /// Frame relative to the clip start
    pub local_frame: Frame,
}

/// All currently mounted clips
#[derive(Debug, Default)]
pub struct TimelineRegistry {
    clips: IndexMap<ClipId, Clip>,
    hidden: HashSet<ClipId>,
    subscribers: Subscribers<RegistryEvent>,
}

/// Registry shared between the scene and its consumers
pub type SharedTimeline = Arc<RwLock<TimelineRegistry>>;

impl TimelineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry behind a shared lock
    pub fn shared() -> SharedTimeline {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Add or replace a clip. Returns `false` if an identical entry existed.
    pub fn register(&mut self, clip: Clip) -> bool {
        let id = clip.id;
        let event = match self.clips.get(&id) {
            Some(existing) if *existing == clip => return false,
            Some(_) => RegistryEvent::Updated(id),
            None => RegistryEvent::Registered(id),
        };
        tracing::debug!("Clip {} registered at [{}, {}]", id, clip.start, clip.end);
        self.clips.insert(id, clip);
        self.subscribers.notify(&event);
        true
    }

    /// Remove a clip and its hidden flag
    pub fn unregister(&mut self, id: ClipId) -> Option<Clip> {
        let clip = self.clips.shift_remove(&id)?;
        self.hidden.remove(&id);
        tracing::debug!("Clip {} unregistered", id);
        self.subscribers.notify(&RegistryEvent::Unregistered(id));
        Some(clip)
    }

    /// Set a clip's explicit visibility. Returns whether the flag changed.
    pub fn set_visible(&mut self, id: ClipId, visible: bool) -> bool {
        let changed = if visible {
            self.hidden.remove(&id)
        } else {
            self.hidden.insert(id)
        };
        if changed {
            self.subscribers
                .notify(&RegistryEvent::VisibilityChanged { id, visible });
        }
        changed
    }

    /// Whether the clip itself is explicitly hidden
    pub fn is_hidden(&self, id: ClipId) -> bool {
        self.hidden.contains(&id)
    }

    /// Visible unless the clip or any ancestor is hidden
    pub fn is_visible(&self, id: ClipId) -> bool {
        let mut current = Some(id);
        // Bounded so a malformed parent cycle cannot loop forever.
        for _ in 0..=self.clips.len() {
            let Some(clip_id) = current else {
                return true;
            };
            if self.hidden.contains(&clip_id) {
                return false;
            }
            current = self.clips.get(&clip_id).and_then(|clip| clip.parent_id);
        }
        true
    }

    /// Add a listener
    pub fn subscribe(
        &mut self,
        listener: impl Fn(&RegistryEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Get a clip
    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }

    /// All clips in registration order
    pub fn snapshot(&self) -> Vec<Clip> {
        self.clips.values().cloned().collect()
    }

    /// Iterate clips in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.values()
    }

    /// Number of clips
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether no clip is mounted
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Activation of a registered clip at `frame`
    pub fn resolve_activation(&self, id: ClipId, frame: Frame) -> Option<Activation> {
        let clip = self.clips.get(&id)?;
        Some(clip.activation(frame, self.is_visible(id)))
    }

    /// Every active clip at `frame`, in registration order
    pub fn active_at(&self, frame: Frame) -> Vec<ActiveClip> {
        self.clips
            .values()
            .filter_map(|clip| {
                let activation = clip.activation(frame, self.is_visible(clip.id));
                activation.active.then(|| ActiveClip {
                    id: clip.id,
                    label: clip.label.clone(),
                    depth: clip.depth,
                    local_frame: activation.local_frame,
                })
            })
            .collect()
    }

    /// Frames needed to play every clip to its end
    pub fn total_duration(&self) -> Frame {
        self.clips
            .values()
            .filter(|clip| clip.has_span())
            .map(|clip| clip.end + 1)
            .max()
            .unwrap_or(0)
            .max(0)
    }

    /// Display lanes for the current clips
    pub fn lanes(&self) -> Vec<LaneAssignment> {
        let clips: Vec<&Clip> = self.clips.values().collect();
        stack_clips_into_tracks(&clips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{ClipInterval, ClipScope};
    use parking_lot::Mutex;

    fn mount(scope: &ClipScope, start: Frame, end: Frame) -> Clip {
        Clip::mount(scope, ClipInterval::new(start, end))
    }

    #[test]
    fn test_register_and_unregister() {
        let mut registry = TimelineRegistry::new();
        let clip = mount(&ClipScope::root(), 0, 59);
        let id = clip.id;

        assert!(registry.register(clip.clone()));
        assert!(!registry.register(clip.clone()));
        assert_eq!(registry.total_duration(), 60);

        let mut moved = clip;
        moved.end = 89;
        assert!(registry.register(moved));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.total_duration(), 90);

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert_eq!(registry.total_duration(), 0);
    }

    #[test]
    fn test_visibility_inherited() {
        let mut registry = TimelineRegistry::new();
        let root = mount(&ClipScope::root(), 0, 99);
        let child = mount(&root.child_scope(), 0, 49);
        let grandchild = mount(&child.child_scope(), 10, 20);
        let (root_id, child_id, grand_id) = (root.id, child.id, grandchild.id);
        registry.register(root);
        registry.register(child);
        registry.register(grandchild);

        assert!(registry.is_visible(grand_id));
        registry.set_visible(root_id, false);
        assert!(!registry.is_visible(child_id));
        assert!(!registry.is_visible(grand_id));
        // Own flag does not override a hidden ancestor
        registry.set_visible(grand_id, true);
        assert!(!registry.is_visible(grand_id));
        assert!(registry.active_at(15).is_empty());

        registry.set_visible(root_id, true);
        let active = registry.active_at(15);
        assert_eq!(active.len(), 3);
        assert_eq!(active[2].local_frame, 5);
        assert_eq!(active[2].depth, 2);
    }

    #[test]
    fn test_listeners_notified() {
        let mut registry = TimelineRegistry::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = registry.subscribe(move |event| sink.lock().push(event.clone()));

        let clip = mount(&ClipScope::root(), 0, 9);
        let id = clip.id;
        registry.register(clip);
        registry.set_visible(id, false);
        registry.set_visible(id, false);
        registry.unregister(id);

        assert_eq!(
            *events.lock(),
            vec![
                RegistryEvent::Registered(id),
                RegistryEvent::VisibilityChanged { id, visible: false },
                RegistryEvent::Unregistered(id),
            ]
        );

        assert!(registry.unsubscribe(subscription));
        registry.register(mount(&ClipScope::root(), 0, 9));
        assert_eq!(events.lock().len(), 3);
    }

    #[test]
    fn test_resolve_activation_unknown() {
        let registry = TimelineRegistry::new();
        assert_eq!(registry.resolve_activation(ClipId::new(), 0), None);
        assert!(registry.is_visible(ClipId::new()));
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let mut registry = TimelineRegistry::new();
        let mut a = mount(&ClipScope::root(), 0, 9);
        let mut b = mount(&ClipScope::root(), 0, 9);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);
        let id = a.id;
        registry.register(a);
        registry.register(b);
        assert!(registry.is_visible(id));
    }
}
