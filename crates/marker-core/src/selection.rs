//! TextSelection - the annotation engine
//!
//! Owns the raw text and the ordered range list and renders them into a
//! container element. The container listens for pointer-up (native selection
//! becomes a new provisional range) and click (an annotated span reports
//! itself). The rendered subtree is a projection of the range list: spans are
//! looked up again by `data-index` after every render.

use std::collections::VecDeque;
use std::fmt;

use marker_dom::{DOMRect, Document, DomError, DomEvent, EventType, HandlerId, ListenerOptions, NodeId};
use marker_html::set_inner_html;

use crate::{
    render_markup, validate_ranges, EventEmitter, ListenerId, MarkerError, MarkerResult, Position, RangeId,
    RangeInput, RangeRef, TextIndex, TextRange, ValidationError,
};

/// Names of the events emitted by `TextSelection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionEventKind {
    /// `ranges:update`
    RangesUpdate,
    /// `range:insert`
    RangeInsert,
    /// `range:click`
    RangeClick,
}

impl SelectionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionEventKind::RangesUpdate => "ranges:update",
            SelectionEventKind::RangeInsert => "range:insert",
            SelectionEventKind::RangeClick => "range:click",
        }
    }
}

impl fmt::Display for SelectionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payloads of the events emitted by `TextSelection`
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// Copy of the current range list
    RangesUpdate(Vec<TextRange>),
    /// A provisional range was inserted at `index`
    RangeInsert { index: usize, range: TextRange },
    /// The span of the range at `index` was clicked
    RangeClick { index: usize, range: TextRange },
}

impl SelectionEvent {
    pub fn kind(&self) -> SelectionEventKind {
        match self {
            SelectionEvent::RangesUpdate(_) => SelectionEventKind::RangesUpdate,
            SelectionEvent::RangeInsert { .. } => SelectionEventKind::RangeInsert,
            SelectionEvent::RangeClick { .. } => SelectionEventKind::RangeClick,
        }
    }
}

/// Annotation engine bound to one container element
#[derive(Debug)]
pub struct TextSelection {
    container: NodeId,
    raw_text: String,
    ranges: Vec<TextRange>,
    next_id: u64,
    emitter: EventEmitter<SelectionEventKind, SelectionEvent>,
    pointer_up: HandlerId,
    click: HandlerId,
    /// Inserted ranges whose `range:insert` waits for the next reflow
    deferred: VecDeque<RangeId>,
    renders: usize,
}

impl TextSelection {
    /// Bind to `container`, listening for pointer-up and click on it
    pub fn new(doc: &mut Document, container: NodeId) -> MarkerResult<Self> {
        let node = doc.tree().get(container).ok_or(DomError::NotFound(container))?;
        if !node.is_element() {
            return Err(DomError::InvalidNodeType(container).into());
        }

        let pointer_up = doc.new_handler_id();
        let click = doc.new_handler_id();
        doc.add_event_listener(container, EventType::PointerUp, pointer_up, ListenerOptions::default());
        doc.add_event_listener(container, EventType::Click, click, ListenerOptions::default());
        tracing::debug!("TextSelection bound to {}", container);

        Ok(Self {
            container,
            raw_text: String::new(),
            ranges: Vec::new(),
            next_id: 0,
            emitter: EventEmitter::new(),
            pointer_up,
            click,
            deferred: VecDeque::new(),
            renders: 0,
        })
    }

    // --- Accessors ---

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// The ordered range list
    pub fn ranges(&self) -> &[TextRange] {
        &self.ranges
    }

    pub fn range(&self, index: usize) -> Option<&TextRange> {
        self.ranges.get(index)
    }

    /// Number of renders so far
    pub fn renders(&self) -> usize {
        self.renders
    }

    // --- Events ---

    /// Subscribe to an event
    pub fn on(&mut self, kind: SelectionEventKind, listener: impl FnMut(&SelectionEvent) + 'static) -> ListenerId {
        self.emitter.on(kind, listener)
    }

    /// Unsubscribe
    pub fn off(&mut self, kind: SelectionEventKind, id: ListenerId) -> bool {
        self.emitter.off(&kind, id)
    }

    fn emit(&mut self, event: SelectionEvent) {
        tracing::trace!("emit {}", event.kind());
        let kind = event.kind();
        self.emitter.emit(&kind, &event);
    }

    fn emit_update(&mut self) {
        self.emit(SelectionEvent::RangesUpdate(self.ranges.clone()));
    }

    // --- Range list ---

    fn alloc_id(&mut self) -> RangeId {
        self.next_id += 1;
        RangeId(self.next_id)
    }

    fn is_current(&self, raw_text: &str, ranges: &[RangeInput]) -> bool {
        self.raw_text == raw_text
            && self.ranges.len() == ranges.len()
            && ranges.iter().zip(&self.ranges).all(|(input, range)| input.matches(range))
    }

    /// Replace text and ranges
    ///
    /// A call with the current text and ranges does nothing and returns
    /// `false`. Invalid ranges are rejected before anything changes.
    pub fn init(&mut self, doc: &mut Document, raw_text: &str, ranges: &[RangeInput]) -> MarkerResult<bool> {
        if self.is_current(raw_text, ranges) {
            tracing::trace!("init skipped: text and ranges unchanged");
            return Ok(false);
        }

        let index = TextIndex::new(raw_text);
        let validated = validate_ranges(index.char_len(), ranges)?;

        let mut next = Vec::with_capacity(validated.len());
        for (start, end, data) in validated {
            next.push(TextRange {
                id: self.alloc_id(),
                start,
                end,
                text: index.slice(start, end).to_owned(),
                data,
            });
        }
        self.raw_text = raw_text.to_owned();
        self.ranges = next;
        self.deferred.clear();

        tracing::debug!("init: {} chars, {} ranges", index.char_len(), self.ranges.len());
        self.emit_update();
        self.render_html(doc)?;
        Ok(true)
    }

    /// Insert a provisional range at its sorted position and return its index
    pub fn insert_range(&mut self, doc: &mut Document, start: usize, end: usize) -> MarkerResult<usize> {
        let index = TextIndex::new(&self.raw_text);
        let len = index.char_len();
        let text = index.slice(start, end).to_owned();

        let mut at = self.ranges.len();
        while at > 0 && self.ranges[at - 1].end > start {
            at -= 1;
        }

        if start >= end {
            return Err(ValidationError::Empty { index: at, start, end }.into());
        }
        if end > len {
            return Err(ValidationError::OutOfBounds { index: at, end, len }.into());
        }
        if self.ranges.get(at).is_some_and(|next| next.start < end) {
            return Err(ValidationError::Overlap { index: at, start, end }.into());
        }

        let range = TextRange {
            id: self.alloc_id(),
            start,
            end,
            text,
            data: String::new(),
        };
        self.ranges.insert(at, range);

        tracing::debug!("Inserted range [{}, {}) at {}", start, end, at);
        self.emit_update();
        self.render_html(doc)?;
        Ok(at)
    }

    /// Position of a range in the list
    pub fn get_range_index(&self, id: RangeId) -> Option<usize> {
        self.ranges.iter().position(|r| r.id == id)
    }

    fn resolve(&self, range: RangeRef) -> Option<usize> {
        match range {
            RangeRef::Index(i) => (i < self.ranges.len()).then_some(i),
            RangeRef::Id(id) => self.get_range_index(id),
        }
    }

    /// Remove the range at `index`, returning it
    pub fn remove_range_at(&mut self, doc: &mut Document, index: usize) -> MarkerResult<Option<TextRange>> {
        if index >= self.ranges.len() {
            return Ok(None);
        }
        let removed = self.ranges.remove(index);
        tracing::debug!("Removed range [{}, {}) at {}", removed.start, removed.end, index);
        self.emit_update();
        self.render_html(doc)?;
        Ok(Some(removed))
    }

    /// Remove a range by identity, returning the index it had
    pub fn remove_range(&mut self, doc: &mut Document, id: RangeId) -> MarkerResult<Option<usize>> {
        let Some(index) = self.get_range_index(id) else {
            return Ok(None);
        };
        self.remove_range_at(doc, index)?;
        Ok(Some(index))
    }

    /// Assign a label to a range; returns whether the range exists
    pub fn set_range_data(&mut self, doc: &mut Document, range: RangeRef, data: &str) -> MarkerResult<bool> {
        let Some(index) = self.resolve(range) else {
            return Ok(false);
        };
        self.ranges[index].data = data.to_owned();
        self.emit_update();
        self.render_html(doc)?;
        Ok(true)
    }

    // --- Rendering ---

    /// Markup for the current text and ranges
    pub fn markup(&self) -> String {
        render_markup(&self.raw_text, &self.ranges)
    }

    /// Rebuild the container contents
    pub fn render_html(&mut self, doc: &mut Document) -> MarkerResult<()> {
        let html = self.markup();
        doc.release_selection_in(self.container);
        set_inner_html(doc.tree_mut(), self.container, &html)?;
        self.renders += 1;
        tracing::debug!("Rendered {} ranges into {} (render #{})", self.ranges.len(), self.container, self.renders);
        Ok(())
    }

    // --- Event handling ---

    /// Whether `handler` is one of this selection's listeners
    pub fn handles(&self, handler: HandlerId) -> bool {
        handler == self.pointer_up || handler == self.click
    }

    /// Run the listener registered as `handler` for `event`
    pub fn handle_event(&mut self, doc: &mut Document, handler: HandlerId, event: &mut DomEvent) -> MarkerResult<()> {
        if handler == self.pointer_up {
            self.on_pointer_up(doc, event)
        } else if handler == self.click {
            self.on_click(doc, event);
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Turn the native selection into a provisional range
    fn on_pointer_up(&mut self, doc: &mut Document, event: &mut DomEvent) -> MarkerResult<()> {
        let Some(range) = doc.selection().range_at(0).copied() else {
            tracing::trace!("pointer-up without selection");
            return Ok(());
        };
        let node = range.start_container();
        if range.start_offset() == range.end_offset() {
            tracing::trace!("Ignoring collapsed selection");
            return Ok(());
        }
        if node != range.end_container() {
            tracing::trace!("Ignoring selection across nodes");
            return Ok(());
        }
        if doc.tree().parent(node) != Some(self.container) {
            tracing::trace!("Ignoring selection outside the container");
            return Ok(());
        }

        // Text after a span starts where that span ends.
        let mut shift = 0;
        if let Some(prev) = doc.tree().prev_sibling(node) {
            if doc.tree().get(prev).is_some_and(|n| n.is_tag("span")) {
                let Some(end) = doc.tree().attr(prev, "data-end").and_then(|v| v.parse::<usize>().ok()) else {
                    tracing::warn!("Span {} has no valid data-end, ignoring selection", prev);
                    return Ok(());
                };
                shift = end;
            }
        }
        let start = range.start_offset() + shift;
        let end = range.end_offset() + shift;

        let index = match self.insert_range(doc, start, end) {
            Ok(index) => index,
            Err(MarkerError::Validation(err)) => {
                tracing::warn!("Ignoring selection: {}", err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        // The selected text node was replaced by the render.
        doc.clear_selection();
        self.deferred.push_back(self.ranges[index].id);
        event.stop_propagation();
        Ok(())
    }

    /// Report a click on an annotated span
    fn on_click(&mut self, doc: &Document, event: &mut DomEvent) {
        let target = event.target;
        let tree = doc.tree();
        if !tree.get(target).is_some_and(|n| n.is_tag("span")) || tree.parent(target) != Some(self.container) {
            return;
        }
        event.stop_propagation();

        let Some(index) = tree.attr(target, "data-index").and_then(|v| v.parse::<usize>().ok()) else {
            tracing::warn!("Span {} has no valid data-index", target);
            return;
        };
        let Some(range) = self.ranges.get(index).cloned() else {
            tracing::warn!("Span {} points at missing range {}", target, index);
            return;
        };
        self.emit(SelectionEvent::RangeClick { index, range });
    }

    /// Deliver queued `range:insert` notifications
    ///
    /// Runs only once the document has been reflowed, so listeners can query
    /// the geometry of the new span. Returns the number delivered.
    pub fn run_deferred(&mut self, doc: &Document) -> usize {
        if self.deferred.is_empty() {
            return 0;
        }
        if doc.is_dirty() {
            tracing::trace!("Deferring {} notifications until reflow", self.deferred.len());
            return 0;
        }
        let mut delivered = 0;
        while let Some(id) = self.deferred.pop_front() {
            let Some(index) = self.get_range_index(id) else {
                tracing::trace!("Dropping insert notification for removed range");
                continue;
            };
            let range = self.ranges[index].clone();
            self.emit(SelectionEvent::RangeInsert { index, range });
            delivered += 1;
        }
        delivered
    }

    /// Number of queued `range:insert` notifications
    pub fn pending_notifications(&self) -> usize {
        self.deferred.len()
    }

    // --- Geometry ---

    fn span_of(&self, doc: &Document, index: usize) -> Option<NodeId> {
        let key = index.to_string();
        doc.tree().find_descendant(self.container, |n| {
            n.is_tag("span") && n.as_element().and_then(|e| e.get_attr("data-index")) == Some(key.as_str())
        })
    }

    /// Live span element of a range
    pub fn get_range_element(&self, doc: &Document, range: impl Into<RangeRef>) -> Option<NodeId> {
        let range = range.into();
        let Some(index) = self.resolve(range) else {
            tracing::warn!("Range {:?} does not exist", range);
            return None;
        };
        let span = self.span_of(doc, index);
        if span.is_none() {
            tracing::warn!("No span[data-index='{}'] in {}", index, self.container);
        }
        span
    }

    /// Viewport box of a range's span
    pub fn get_range_bbox(&self, doc: &Document, range: impl Into<RangeRef>) -> Option<DOMRect> {
        let span = self.get_range_element(doc, range)?;
        doc.bounding_client_rect(span)
    }

    /// Viewport box of the container
    pub fn get_bbox(&self, doc: &Document) -> Option<DOMRect> {
        doc.bounding_client_rect(self.container)
    }

    /// Box of a range relative to the container
    pub fn get_range_position(&self, doc: &Document, range: impl Into<RangeRef>) -> Option<Position> {
        let rect = self.get_range_bbox(doc, range)?;
        let bbox = self.get_bbox(doc)?;
        Some(Position {
            left: rect.left() - bbox.left(),
            top: rect.top() - bbox.top(),
            width: rect.width,
            height: rect.height,
        })
    }

    /// Detach listeners and drop all subscriptions
    pub fn destroy(&mut self, doc: &mut Document) {
        doc.remove_handler(self.pointer_up);
        doc.remove_handler(self.click);
        self.emitter.clear();
        self.deferred.clear();
        tracing::debug!("TextSelection on {} destroyed", self.container);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, TextSelection) {
        let mut doc = Document::default();
        let body = doc.body();
        let div = doc.tree_mut().create_element("div");
        doc.tree_mut().append_child(body, div).unwrap();
        let sel = TextSelection::new(&mut doc, div).unwrap();
        (doc, sel)
    }

    #[test]
    fn test_new_rejects_text_container() {
        let mut doc = Document::default();
        let text = doc.tree_mut().create_text("x");
        assert!(TextSelection::new(&mut doc, text).is_err());
    }

    #[test]
    fn test_init_renders_and_derives_text() {
        let (mut doc, mut sel) = setup();
        assert!(sel.init(&mut doc, "hello world", &[RangeInput::new(6, 11, "w")]).unwrap());
        assert_eq!(sel.ranges()[0].text, "world");
        assert_eq!(doc.tree().text_content(sel.container()), "hello world");
        assert_eq!(sel.renders(), 1);
    }

    #[test]
    fn test_insert_scans_backwards() {
        let (mut doc, mut sel) = setup();
        sel.init(&mut doc, "0123456789", &[RangeInput::new(2, 3, "a"), RangeInput::new(7, 8, "b")]).unwrap();
        assert_eq!(sel.insert_range(&mut doc, 4, 6).unwrap(), 1);
        assert_eq!(sel.insert_range(&mut doc, 0, 1).unwrap(), 0);
        assert_eq!(sel.insert_range(&mut doc, 9, 10).unwrap(), 4);
        let starts: Vec<usize> = sel.ranges().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0, 2, 4, 7, 9]);
    }

    #[test]
    fn test_insert_rejects_overlap() {
        let (mut doc, mut sel) = setup();
        sel.init(&mut doc, "0123456789", &[RangeInput::new(2, 5, "a")]).unwrap();
        assert!(sel.insert_range(&mut doc, 4, 6).is_err());
        assert!(sel.insert_range(&mut doc, 0, 3).is_err());
        assert!(sel.insert_range(&mut doc, 8, 11).is_err());
        assert_eq!(sel.ranges().len(), 1);
    }

    #[test]
    fn test_set_range_data() {
        let (mut doc, mut sel) = setup();
        sel.init(&mut doc, "abc", &[]).unwrap();
        let index = sel.insert_range(&mut doc, 0, 2).unwrap();
        assert!(sel.set_range_data(&mut doc, RangeRef::Index(index), "label").unwrap());
        assert!(!sel.set_range_data(&mut doc, RangeRef::Index(5), "label").unwrap());
        assert_eq!(sel.ranges()[0].data, "label");
        assert!(sel.markup().contains(r#"data-data="label""#));
    }
}
