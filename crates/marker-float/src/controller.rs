//! Floating panel lifecycle
//!
//! `Hidden -> Showing` on `show`, back to `Hidden` on `hide`/`destroy`;
//! re-showing hides first. Every `show` starts a new generation and position
//! results are applied only to the generation that requested them, so a
//! result that arrives after `hide` (or after a newer `show`) is dropped.

use std::collections::VecDeque;
use std::rc::Rc;

use marker_dom::{DOMRect, Document, DomEvent, EventType, HandlerId, ListenerOptions, NodeId};
use marker_html::{escape_attr, set_inner_html};
use smol::future::Boxed;

use crate::position::{Middleware, Placement, PositionRequest, PositionResult, PositionService, Size};
use crate::FloatResult;

/// Class of the arrow element inside panel content, if any
const ARROW_CLASS: &str = "floating-arrow";

/// What to show
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    /// Element the panel is anchored to
    pub reference: NodeId,
    /// Panel content markup
    pub content: String,
    /// Panel size
    pub size: Size,
    /// Tint for the panel and its arrow
    pub color: Option<String>,
}

/// Identifies one requested position computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionTicket {
    pub generation: u64,
}

/// Outcome of a panel listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEvent {
    /// Not for this panel, or nothing to report
    Ignored,
    /// A scroll container moved; a new position was requested
    Repositioned,
    /// Pointer-up inside the panel was kept from reaching the document
    Shielded,
    /// An element inside the panel was clicked
    Activated(NodeId),
}

#[derive(Debug)]
struct Showing {
    panel: NodeId,
    reference: NodeId,
    size: Size,
    color: Option<String>,
    /// Scroll containers being listened to
    parents: Vec<NodeId>,
    generation: u64,
}

/// Controller for one floating panel
pub struct FloatingController {
    class: &'static str,
    service: Rc<dyn PositionService>,
    placement: Placement,
    middleware: Vec<Middleware>,
    state: Option<Showing>,
    generation: u64,
    pending: VecDeque<(PositionTicket, Boxed<PositionResult>)>,
    last: Option<PositionResult>,
    on_scroll: HandlerId,
    on_pointer_up: HandlerId,
    on_click: HandlerId,
}

impl FloatingController {
    /// Create a hidden controller; `class` is given to the panel element
    pub fn new(
        doc: &mut Document,
        class: &'static str,
        service: Rc<dyn PositionService>,
        placement: Placement,
        middleware: Vec<Middleware>,
    ) -> Self {
        Self {
            class,
            service,
            placement,
            middleware,
            state: None,
            generation: 0,
            pending: VecDeque::new(),
            last: None,
            on_scroll: doc.new_handler_id(),
            on_pointer_up: doc.new_handler_id(),
            on_click: doc.new_handler_id(),
        }
    }

    pub fn is_showing(&self) -> bool {
        self.state.is_some()
    }

    /// Panel element while showing
    pub fn panel(&self) -> Option<NodeId> {
        self.state.as_ref().map(|s| s.panel)
    }

    /// Reference element while showing
    pub fn reference(&self) -> Option<NodeId> {
        self.state.as_ref().map(|s| s.reference)
    }

    /// Generation of the current (or last) `show`
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last applied position
    pub fn last_position(&self) -> Option<PositionResult> {
        self.last
    }

    /// Number of position computations not yet settled
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Mount a panel anchored to `spec.reference` and request its position
    pub fn show(&mut self, doc: &mut Document, spec: PanelSpec) -> FloatResult<NodeId> {
        self.hide(doc);

        let panel = doc.tree_mut().create_element("div");
        if let Err(err) = self.mount(doc, panel, &spec) {
            if let Err(cleanup) = doc.tree_mut().remove(panel) {
                tracing::warn!("Failed to discard {} panel {}: {}", self.class, panel, cleanup);
            }
            return Err(err);
        }
        self.generation += 1;

        let mut parents = self.service.scroll_parents(doc, spec.reference);
        for parent in self.service.scroll_parents(doc, panel) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        for &parent in &parents {
            doc.add_event_listener(parent, EventType::Scroll, self.on_scroll, ListenerOptions::default());
            doc.add_event_listener(parent, EventType::Resize, self.on_scroll, ListenerOptions::default());
        }
        doc.add_event_listener(panel, EventType::PointerUp, self.on_pointer_up, ListenerOptions::default());
        doc.add_event_listener(panel, EventType::Click, self.on_click, ListenerOptions::default());

        tracing::debug!(
            "Showing {} panel {} at {} (generation {}, {} scroll parents)",
            self.class, panel, spec.reference, self.generation, parents.len()
        );
        self.state = Some(Showing {
            panel,
            reference: spec.reference,
            size: spec.size,
            color: spec.color,
            parents,
            generation: self.generation,
        });
        self.update_position(doc);
        Ok(panel)
    }

    /// Fill a detached panel, then attach it under `<body>`
    fn mount(&self, doc: &mut Document, panel: NodeId, spec: &PanelSpec) -> FloatResult<()> {
        let body = doc.body();
        let (scroll_x, scroll_y) = doc.scroll_position();
        let tree = doc.tree_mut();
        tree.set_attr(panel, "class", self.class)?;
        tree.set_attr(panel, "style", panel_style(0.0, 0.0, false, spec.color.as_deref()))?;
        set_inner_html(tree, panel, &spec.content)?;
        doc.set_box(panel, DOMRect::from_xywh(scroll_x, scroll_y, spec.size.width, spec.size.height))?;
        doc.tree_mut().append_child(body, panel)?;
        Ok(())
    }

    /// Request a new position for the showing panel. A request still
    /// pending for the same `show` is superseded.
    pub fn update_position(&mut self, doc: &mut Document) -> Option<PositionTicket> {
        let showing = self.state.as_ref()?;
        let Some(reference) = doc.bounding_client_rect(showing.reference) else {
            tracing::warn!("Reference {} of {} panel is gone", showing.reference, self.class);
            let panel = showing.panel;
            let color = showing.color.clone();
            let (x, y) = self.last.map_or((0.0, 0.0), |p| (p.x, p.y));
            if let Err(err) = doc.tree_mut().set_attr(panel, "style", panel_style(x, y, true, color.as_deref())) {
                tracing::warn!("Failed to hide {} panel {}: {}", self.class, panel, err);
            }
            return None;
        };

        let request = PositionRequest {
            reference,
            reference_rects: doc.client_rects(showing.reference),
            floating: showing.size,
            viewport: doc.viewport(),
            clip: doc.clipping_rect(showing.reference),
            placement: self.placement,
            middleware: self.middleware.clone(),
        };
        let ticket = PositionTicket { generation: showing.generation };
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != ticket);
        if self.pending.len() < before {
            tracing::trace!("Superseded pending position of {} panel (generation {})", self.class, ticket.generation);
        }
        self.pending.push_back((ticket, self.service.compute_position(request)));
        Some(ticket)
    }

    /// Apply a computed position; stale tickets are ignored
    pub fn apply_position(&mut self, doc: &mut Document, ticket: PositionTicket, result: PositionResult) -> bool {
        let Some(showing) = self.state.as_ref().filter(|s| s.generation == ticket.generation) else {
            tracing::trace!("Dropping stale position for generation {}", ticket.generation);
            return false;
        };
        let panel = showing.panel;
        let size = showing.size;
        let color = showing.color.clone();

        let (scroll_x, scroll_y) = doc.scroll_position();
        let x = result.x + scroll_x;
        let y = result.y + scroll_y;
        if doc.set_box(panel, DOMRect::from_xywh(x, y, size.width, size.height)).is_err() {
            return false;
        }

        let tree = doc.tree_mut();
        if let Err(err) = tree.set_attr(panel, "style", panel_style(x, y, result.reference_hidden, color.as_deref())) {
            tracing::warn!("Failed to style {} panel {}: {}", self.class, panel, err);
        }
        if let Some(offset) = result.arrow_offset {
            let arrow = tree.find_descendant(panel, |n| {
                n.as_element().is_some_and(|e| e.has_class(ARROW_CLASS))
            });
            if let Some(arrow) = arrow {
                let mut style = format!("left: {offset}px");
                if let Some(color) = &color {
                    style.push_str(&format!("; border-top-color: {}", escape_attr(color)));
                }
                if let Err(err) = tree.set_attr(arrow, "style", style) {
                    tracing::warn!("Failed to place arrow of {} panel: {}", self.class, err);
                }
            }
        }
        tracing::trace!("Positioned {} panel at ({}, {}), hidden: {}", self.class, x, y, result.reference_hidden);
        self.last = Some(result);
        true
    }

    /// Await pending position computations and apply the current ones.
    /// Returns how many were applied.
    pub async fn settle(&mut self, doc: &mut Document) -> usize {
        let mut applied = 0;
        while let Some((ticket, future)) = self.pending.pop_front() {
            let result = future.await;
            if self.apply_position(doc, ticket, result) {
                applied += 1;
            }
        }
        applied
    }

    /// Unmount the panel and stop listening; no-op when hidden
    pub fn hide(&mut self, doc: &mut Document) -> bool {
        let Some(showing) = self.state.take() else {
            return false;
        };
        for &parent in &showing.parents {
            doc.remove_event_listener(parent, EventType::Scroll, self.on_scroll, false);
            doc.remove_event_listener(parent, EventType::Resize, self.on_scroll, false);
        }
        doc.remove_event_listener(showing.panel, EventType::PointerUp, self.on_pointer_up, false);
        doc.remove_event_listener(showing.panel, EventType::Click, self.on_click, false);
        doc.release_selection_in(showing.panel);
        if let Err(err) = doc.tree_mut().remove(showing.panel) {
            tracing::warn!("Failed to remove {} panel: {}", self.class, err);
        }
        self.last = None;
        tracing::debug!("Hid {} panel (generation {})", self.class, showing.generation);
        true
    }

    /// Irreversible teardown
    pub fn destroy(&mut self, doc: &mut Document) {
        self.hide(doc);
        self.pending.clear();
    }

    /// Whether `handler` belongs to this controller
    pub fn handles(&self, handler: HandlerId) -> bool {
        handler == self.on_scroll || handler == self.on_pointer_up || handler == self.on_click
    }

    /// Run the listener registered as `handler`
    pub fn handle_event(&mut self, doc: &mut Document, handler: HandlerId, event: &mut DomEvent) -> PanelEvent {
        if !self.is_showing() {
            return PanelEvent::Ignored;
        }
        if handler == self.on_scroll {
            self.update_position(doc);
            PanelEvent::Repositioned
        } else if handler == self.on_pointer_up {
            event.stop_propagation();
            PanelEvent::Shielded
        } else if handler == self.on_click {
            PanelEvent::Activated(event.target)
        } else {
            PanelEvent::Ignored
        }
    }
}

impl std::fmt::Debug for FloatingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatingController")
            .field("class", &self.class)
            .field("placement", &self.placement)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("pending", &self.pending.len())
            .finish()
    }
}

fn panel_style(x: f64, y: f64, hidden: bool, color: Option<&str>) -> String {
    let mut style = format!(
        "position: absolute; left: {x}px; top: {y}px; visibility: {}",
        if hidden { "hidden" } else { "visible" }
    );
    if let Some(color) = color {
        style.push_str("; --panel-color: ");
        style.push_str(color);
    }
    style
}
