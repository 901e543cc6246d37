//! Document - High-level document API
//!
//! Owns the tree, the listener registry, the native selection and the
//! viewport. Any mutable access to the tree marks the document dirty; the
//! next `reflow` re-runs inline layout on the registered flow roots.

use crate::dom_events::{DispatchStep, EventRegistry, EventType, HandlerId, ListenerOptions};
use crate::layout::{layout_inline, InlineMetrics};
use crate::range::{Range, Selection};
use crate::{DOMRect, DomError, DomResult, DomTree, NodeId};

/// Headless document
#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    html_element: NodeId,
    body_element: NodeId,
    viewport: DOMRect,
    scroll_x: f64,
    scroll_y: f64,
    selection: Selection,
    listeners: EventRegistry,
    flow_roots: Vec<(NodeId, InlineMetrics)>,
    dirty: bool,
}

impl Document {
    /// Create a document with `<html><body>` whose viewport has the given size
    pub fn new(width: f64, height: f64) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        // Freshly created nodes cannot violate the hierarchy.
        let _ = tree.append_child(NodeId::ROOT, html);
        let _ = tree.append_child(html, body);

        let viewport = DOMRect::from_xywh(0.0, 0.0, width, height);
        for id in [html, body] {
            if let Some(node) = tree.get_mut(id) {
                node.layout = Some(viewport);
            }
        }

        Self {
            tree,
            html_element: html,
            body_element: body,
            viewport,
            scroll_x: 0.0,
            scroll_y: 0.0,
            selection: Selection::new(),
            listeners: EventRegistry::new(),
            flow_roots: Vec::new(),
            dirty: false,
        }
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably (invalidates layout)
    pub fn tree_mut(&mut self) -> &mut DomTree {
        self.dirty = true;
        &mut self.tree
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Viewport rectangle in client coordinates
    pub fn viewport(&self) -> DOMRect {
        self.viewport
    }

    /// Resize the viewport
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport = DOMRect::from_xywh(0.0, 0.0, width, height);
        self.dirty = true;
    }

    /// Viewport scroll offset
    pub fn scroll_position(&self) -> (f64, f64) {
        (self.scroll_x, self.scroll_y)
    }

    // --- Layout ---

    /// Give an element a fixed box in document coordinates
    pub fn set_box(&mut self, id: NodeId, rect: DOMRect) -> DomResult<()> {
        let node = self.tree.get_mut(id).ok_or(DomError::NotFound(id))?;
        node.layout = Some(rect);
        self.dirty = true;
        Ok(())
    }

    /// Register an element whose inline content is laid out on reflow
    pub fn register_flow_root(&mut self, id: NodeId, metrics: InlineMetrics) {
        self.flow_roots.retain(|(root, _)| *root != id);
        self.flow_roots.push((id, metrics));
        self.dirty = true;
    }

    /// Stop laying out an element's inline content
    pub fn unregister_flow_root(&mut self, id: NodeId) {
        self.flow_roots.retain(|(root, _)| *root != id);
    }

    /// Whether the tree changed since the last reflow
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Commit pending mutations to geometry; returns false if already clean
    pub fn reflow(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        for (root, metrics) in self.flow_roots.clone() {
            layout_inline(&mut self.tree, root, metrics);
        }
        self.dirty = false;
        true
    }

    // --- Scrolling ---

    /// Mark an element as a scroll container
    pub fn set_scrollable(&mut self, id: NodeId, scrollable: bool) -> DomResult<()> {
        let elem = self.tree.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        elem.scroll.scrollable = scrollable;
        Ok(())
    }

    /// Scroll the viewport (`NodeId::ROOT`) or a scroll container by a delta
    pub fn scroll_by(&mut self, id: NodeId, dx: f64, dy: f64) -> DomResult<()> {
        if id == NodeId::ROOT {
            self.scroll_x += dx;
            self.scroll_y += dy;
            return Ok(());
        }
        let elem = self.tree.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        if !elem.scroll.scrollable {
            return Err(DomError::InvalidNodeType(id));
        }
        elem.scroll.left += dx;
        elem.scroll.top += dy;
        Ok(())
    }

    /// Scroll containers enclosing a node, nearest first, ending with the
    /// viewport (`NodeId::ROOT`)
    pub fn scroll_parents(&self, id: NodeId) -> Vec<NodeId> {
        let mut parents: Vec<NodeId> = self.tree.ancestors(id)
            .into_iter()
            .filter(|a| {
                self.tree.get(*a)
                    .and_then(|n| n.as_element())
                    .is_some_and(|e| e.scroll.scrollable)
            })
            .collect();
        parents.push(NodeId::ROOT);
        parents
    }

    fn scroll_offset_above(&self, id: NodeId) -> (f64, f64) {
        let mut dx = self.scroll_x;
        let mut dy = self.scroll_y;
        for ancestor in self.tree.ancestors(id) {
            if let Some(elem) = self.tree.get(ancestor).and_then(|n| n.as_element()) {
                dx += elem.scroll.left;
                dy += elem.scroll.top;
            }
        }
        (dx, dy)
    }

    // --- Geometry ---

    /// getBoundingClientRect: the node's box in viewport coordinates
    pub fn bounding_client_rect(&self, id: NodeId) -> Option<DOMRect> {
        if !self.tree.is_connected(id) {
            return None;
        }
        let rect = self.tree.get(id)?.layout?;
        let (dx, dy) = self.scroll_offset_above(id);
        Some(rect.translate(-dx, -dy))
    }

    /// getClientRects: one box per line for inline content
    pub fn client_rects(&self, id: NodeId) -> Vec<DOMRect> {
        let Some(node) = self.tree.get(id) else {
            return Vec::new();
        };
        if !self.tree.is_connected(id) {
            return Vec::new();
        }
        let (dx, dy) = self.scroll_offset_above(id);
        if node.fragments.is_empty() {
            node.layout.map(|r| vec![r.translate(-dx, -dy)]).unwrap_or_default()
        } else {
            node.fragments.iter().map(|r| r.translate(-dx, -dy)).collect()
        }
    }

    /// Visible area for a node: the viewport clipped by every enclosing
    /// scroll container. `None` when nothing is visible.
    pub fn clipping_rect(&self, id: NodeId) -> Option<DOMRect> {
        let mut clip = self.viewport;
        for parent in self.scroll_parents(id) {
            if parent == NodeId::ROOT {
                continue;
            }
            let rect = self.bounding_client_rect(parent)?;
            clip = clip.intersection(&rect).filter(|r| !r.is_empty())?;
        }
        Some(clip)
    }

    // --- Selection ---

    /// The native selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection with a range
    pub fn set_selection(&mut self, range: Range) {
        self.selection.set_range(range);
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selection.remove_all_ranges();
    }

    /// Drop the selection if either endpoint lies in `root`'s subtree.
    /// Call before freeing those nodes: their slots are reused, and a
    /// selection left behind would resolve to whatever is created next.
    pub fn release_selection_in(&mut self, root: NodeId) -> bool {
        let Some(range) = self.selection.range_at(0) else {
            return false;
        };
        let inside = [range.start_container(), range.end_container()]
            .into_iter()
            .any(|node| self.tree.contains(root, node));
        if inside {
            tracing::trace!("Dropping selection inside {}", root);
            self.selection.remove_all_ranges();
        }
        inside
    }

    /// Select the characters `[start, end)` of an element's text content,
    /// the way a user drag would: boundary points land in the text nodes
    /// that contain them.
    pub fn select_text(&mut self, root: NodeId, start: usize, end: usize) -> Option<Range> {
        let start_point = self.locate_text_offset(root, start, false)?;
        let end_point = self.locate_text_offset(root, end, true)?;
        let range = Range::between(start_point.0, start_point.1, end_point.0, end_point.1);
        self.selection.set_range(range);
        Some(range)
    }

    /// Map an offset into `root`'s text content to (text node, local offset).
    /// An offset on a node boundary belongs to the following node unless
    /// `prefer_end` is set.
    fn locate_text_offset(&self, root: NodeId, offset: usize, prefer_end: bool) -> Option<(NodeId, usize)> {
        let prefer_end = prefer_end && offset > 0;
        let mut consumed = 0;
        let mut last = None;
        for id in self.tree.descendants(root) {
            let Some(text) = self.tree.get(id).and_then(|n| n.as_text()) else {
                continue;
            };
            let len = text.chars().count();
            let inside = if prefer_end {
                offset > consumed && offset <= consumed + len
            } else {
                offset >= consumed && offset < consumed + len
            };
            if inside {
                return Some((id, offset - consumed));
            }
            consumed += len;
            last = Some((id, len));
        }
        match last {
            Some((id, len)) if offset == consumed => Some((id, len)),
            _ => None,
        }
    }

    // --- Events ---

    /// Retarget text nodes to their parent element (text is never an event target)
    pub fn event_target(&self, id: NodeId) -> NodeId {
        match self.tree.get(id) {
            Some(node) if node.is_text() => self.tree.parent(id).unwrap_or(id),
            _ => id,
        }
    }

    /// Allocate a handler ID for `add_event_listener`
    pub fn new_handler_id(&mut self) -> HandlerId {
        self.listeners.new_handler_id()
    }

    /// addEventListener
    pub fn add_event_listener(
        &mut self,
        target: NodeId,
        event_type: EventType,
        handler: HandlerId,
        options: ListenerOptions,
    ) -> bool {
        self.listeners.add_listener(target, event_type, handler, options)
    }

    /// removeEventListener
    pub fn remove_event_listener(
        &mut self,
        target: NodeId,
        event_type: EventType,
        handler: HandlerId,
        capture: bool,
    ) -> bool {
        self.listeners.remove_listener(target, event_type, handler, capture)
    }

    /// Remove every listener registered with a handler
    pub fn remove_handler(&mut self, handler: HandlerId) -> usize {
        self.listeners.remove_handler(handler)
    }

    /// Number of listeners for a node and event type
    pub fn listener_count(&self, target: NodeId, event_type: EventType) -> usize {
        self.listeners.listener_count(target, event_type)
    }

    /// Plan the dispatch of an event at `target`
    pub fn dispatch_path(&mut self, target: NodeId, event_type: EventType) -> Vec<DispatchStep> {
        self.listeners.dispatch_path(&self.tree, target, event_type)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_structure() {
        let doc = Document::default();
        assert_eq!(doc.tree().parent(doc.body()), Some(doc.document_element()));
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_tree_mut_marks_dirty() {
        let mut doc = Document::default();
        let body = doc.body();
        let p = doc.tree_mut().create_element("p");
        doc.tree_mut().append_child(body, p).unwrap();
        assert!(doc.is_dirty());
        assert!(doc.reflow());
        assert!(!doc.reflow());
    }

    #[test]
    fn test_select_text_boundaries() {
        let mut doc = Document::default();
        let body = doc.body();
        let tree = doc.tree_mut();
        let p = tree.create_element("p");
        let a = tree.create_text("ab");
        let span = tree.create_element("span");
        let b = tree.create_text("cd");
        let c = tree.create_text("ef");
        tree.append_child(body, p).unwrap();
        tree.append_child(p, a).unwrap();
        tree.append_child(p, span).unwrap();
        tree.append_child(span, b).unwrap();
        tree.append_child(p, c).unwrap();

        let range = doc.select_text(p, 4, 6).unwrap();
        assert_eq!((range.start_container(), range.start_offset()), (c, 0));
        assert_eq!((range.end_container(), range.end_offset()), (c, 2));

        let range = doc.select_text(p, 0, 2).unwrap();
        assert_eq!(range.start_container(), a);
        assert_eq!(range.end_container(), a);

        assert!(doc.select_text(p, 2, 9).is_none());
    }

    #[test]
    fn test_selection_released_before_slots_are_reused() {
        let mut doc = Document::default();
        let body = doc.body();
        let tree = doc.tree_mut();
        let p = tree.create_element("p");
        let a = tree.create_text("ab");
        let span = tree.create_element("span");
        let b = tree.create_text("cd");
        tree.append_child(body, p).unwrap();
        tree.append_child(p, a).unwrap();
        tree.append_child(p, span).unwrap();
        tree.append_child(span, b).unwrap();

        doc.select_text(p, 2, 3).unwrap();
        // the selection sits in the span's text, not in `a`
        assert!(!doc.release_selection_in(a));
        assert_eq!(doc.selection().range_count(), 1);
        assert!(doc.release_selection_in(p));
        assert_eq!(doc.selection().range_count(), 0);

        doc.tree_mut().clear_children(p).unwrap();
        let fresh = doc.tree_mut().create_text("x");
        doc.tree_mut().append_child(p, fresh).unwrap();
        assert!(doc.selection().range_at(0).is_none());
    }

    #[test]
    fn test_scroll_parents_and_client_rect() {
        let mut doc = Document::new(800.0, 600.0);
        let body = doc.body();
        let tree = doc.tree_mut();
        let scroller = tree.create_element("div");
        let inner = tree.create_element("p");
        tree.append_child(body, scroller).unwrap();
        tree.append_child(scroller, inner).unwrap();
        doc.set_scrollable(scroller, true).unwrap();
        doc.set_box(scroller, DOMRect::from_xywh(0.0, 0.0, 200.0, 100.0)).unwrap();
        doc.set_box(inner, DOMRect::from_xywh(10.0, 50.0, 50.0, 20.0)).unwrap();

        assert_eq!(doc.scroll_parents(inner), vec![scroller, NodeId::ROOT]);

        doc.scroll_by(scroller, 0.0, 30.0).unwrap();
        doc.scroll_by(NodeId::ROOT, 0.0, 5.0).unwrap();
        assert_eq!(doc.bounding_client_rect(inner), Some(DOMRect::from_xywh(10.0, 15.0, 50.0, 20.0)));
        assert_eq!(doc.clipping_rect(inner), Some(DOMRect::from_xywh(0.0, 0.0, 200.0, 95.0)));
    }

    #[test]
    fn test_scroll_rejects_non_scrollable() {
        let mut doc = Document::default();
        let body = doc.body();
        assert_eq!(doc.scroll_by(body, 0.0, 10.0), Err(DomError::InvalidNodeType(body)));
    }
}
