//! DOM Events
//!
//! Listener registry and capture/bubble dispatch planning.
//!
//! Listeners are registered as `HandlerId`s rather than closures: the
//! registry computes the ordered list of (node, handler, phase) steps for an
//! event and the owner of the document invokes each handler itself. That keeps
//! listener state outside the tree and lets components mutate the document
//! while handling an event.

use std::collections::HashMap;

use crate::{DomTree, NodeId};

/// Event type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PointerDown,
    PointerUp,
    Click,
    Scroll,
    Resize,
    Custom(u32),
}

impl EventType {
    /// Check if this event type can bubble
    pub fn bubbles(&self) -> bool {
        !matches!(self, EventType::Scroll | EventType::Resize)
    }
}

/// Event handler ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub u64);

/// addEventListener options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Capture phase
    pub capture: bool,
    /// Once (auto-remove after first dispatch)
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self { capture: true, once: false }
    }
}

#[derive(Debug, Clone)]
struct EventListener {
    handler_id: HandlerId,
    options: ListenerOptions,
}

/// Event dispatch phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// One listener invocation in a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStep {
    pub node: NodeId,
    pub handler: HandlerId,
    pub phase: EventPhase,
}

/// DOM event
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub event_type: EventType,
    pub target: NodeId,
    pub current_target: Option<NodeId>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl DomEvent {
    /// Create an event aimed at `target`
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            current_target: None,
            phase: EventPhase::None,
            bubbles: event_type.bubbles(),
            cancelable: matches!(event_type, EventType::PointerDown | EventType::PointerUp | EventType::Click),
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// Move the event to the next dispatch step
    ///
    /// Returns false once propagation has been stopped: listeners on the
    /// current target still run after `stop_propagation`, listeners on other
    /// nodes do not.
    pub fn enter(&mut self, step: &DispatchStep) -> bool {
        if self.immediate_propagation_stopped {
            return false;
        }
        if self.propagation_stopped && self.current_target != Some(step.node) {
            return false;
        }
        self.current_target = Some(step.node);
        self.phase = step.phase;
        true
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation, including remaining listeners on the current node
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Check if propagation was stopped
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Listener registry for all nodes of one document
#[derive(Debug, Default)]
pub struct EventRegistry {
    listeners: HashMap<(NodeId, EventType), Vec<EventListener>>,
    next_handler: u64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh handler ID
    pub fn new_handler_id(&mut self) -> HandlerId {
        self.next_handler += 1;
        HandlerId(self.next_handler)
    }

    /// Register a listener; a duplicate (same handler and capture flag) is ignored
    pub fn add_listener(
        &mut self,
        target: NodeId,
        event_type: EventType,
        handler_id: HandlerId,
        options: ListenerOptions,
    ) -> bool {
        let list = self.listeners.entry((target, event_type)).or_default();
        if list.iter().any(|l| l.handler_id == handler_id && l.options.capture == options.capture) {
            return false;
        }
        list.push(EventListener { handler_id, options });
        true
    }

    /// Remove a listener
    pub fn remove_listener(
        &mut self,
        target: NodeId,
        event_type: EventType,
        handler_id: HandlerId,
        capture: bool,
    ) -> bool {
        let Some(list) = self.listeners.get_mut(&(target, event_type)) else {
            return false;
        };
        let Some(index) = list.iter()
            .position(|l| l.handler_id == handler_id && l.options.capture == capture)
        else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            self.listeners.remove(&(target, event_type));
        }
        true
    }

    /// Remove every registration of a handler, returning how many were removed
    pub fn remove_handler(&mut self, handler_id: HandlerId) -> usize {
        let mut removed = 0;
        self.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|l| l.handler_id != handler_id);
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// Number of listeners for a node and event type
    pub fn listener_count(&self, target: NodeId, event_type: EventType) -> usize {
        self.listeners.get(&(target, event_type)).map_or(0, Vec::len)
    }

    /// Remove all listeners
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Plan the dispatch of an event: capture from the root down, target,
    /// then bubble back up (for bubbling types). `once` listeners are removed
    /// as they are planned.
    pub fn dispatch_path(&mut self, tree: &DomTree, target: NodeId, event_type: EventType) -> Vec<DispatchStep> {
        let ancestors = tree.ancestors(target);
        let mut steps = Vec::new();

        for &node in ancestors.iter().rev() {
            self.collect(node, event_type, EventPhase::Capturing, Some(true), &mut steps);
        }
        self.collect(target, event_type, EventPhase::AtTarget, None, &mut steps);
        if event_type.bubbles() {
            for &node in &ancestors {
                self.collect(node, event_type, EventPhase::Bubbling, Some(false), &mut steps);
            }
        }
        steps
    }

    fn collect(
        &mut self,
        node: NodeId,
        event_type: EventType,
        phase: EventPhase,
        capture: Option<bool>,
        steps: &mut Vec<DispatchStep>,
    ) {
        let Some(list) = self.listeners.get_mut(&(node, event_type)) else {
            return;
        };
        list.retain(|l| {
            let matches = capture.is_none_or(|c| l.options.capture == c);
            if matches {
                steps.push(DispatchStep { node, handler: l.handler_id, phase });
            }
            !(matches && l.options.once)
        });
        if list.is_empty() {
            self.listeners.remove(&(node, event_type));
        }
    }
}
