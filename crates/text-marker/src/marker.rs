//! TextMarker - the annotation widget
//!
//! One document holding a `<div class="text-mark"><p class="paragraph">`
//! container, the annotation engine bound to the paragraph, an action popover
//! and a label dropdown. Input arrives through the event pump
//! (`pointer_up`, `click`, `scroll`, `resize`); each call dispatches through
//! the document, commits the re-render and then reacts to the engine's
//! notifications.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use marker_core::{
    EventEmitter, ListenerId, RangeId, RangeInput, RangeRef, SelectionEvent, SelectionEventKind, TextRange,
    TextSelection,
};
use marker_dom::{Document, DomEvent, EventType, HandlerId, ListenerOptions, NodeId};
use marker_float::{AnchoredPositioner, DropdownMenu, MenuItem, Popover, PopoverAction, PositionService};

use crate::{EditMode, EditState, MarkOption, MarkerConfig, MarkerDocument, WidgetError, WidgetResult};

/// Names of the events emitted by `TextMarker`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerEventKind {
    /// `update:ranges`
    UpdateRanges,
    /// `change`
    Change,
    /// `addMark`
    AddMark,
    /// `removeMark`
    RemoveMark,
}

impl MarkerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerEventKind::UpdateRanges => "update:ranges",
            MarkerEventKind::Change => "change",
            MarkerEventKind::AddMark => "addMark",
            MarkerEventKind::RemoveMark => "removeMark",
        }
    }
}

impl fmt::Display for MarkerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payloads of the events emitted by `TextMarker`
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
    /// The range list after a label was added or a range removed
    UpdateRanges(Vec<TextRange>),
    /// Same list as `UpdateRanges`
    Change(Vec<TextRange>),
    /// The range that just got its label
    AddMark(TextRange),
    /// The range that was removed
    RemoveMark(TextRange),
}

impl MarkerEvent {
    pub fn kind(&self) -> MarkerEventKind {
        match self {
            MarkerEvent::UpdateRanges(_) => MarkerEventKind::UpdateRanges,
            MarkerEvent::Change(_) => MarkerEventKind::Change,
            MarkerEvent::AddMark(_) => MarkerEventKind::AddMark,
            MarkerEvent::RemoveMark(_) => MarkerEventKind::RemoveMark,
        }
    }
}

/// Listener outcome handled once dispatch is over
enum Reaction {
    Popover(PopoverAction),
    Select(String),
    Outside,
}

/// Text annotation widget
#[derive(Debug)]
pub struct TextMarker {
    doc: Document,
    root: NodeId,
    selection: TextSelection,
    popover: Popover,
    dropdown: DropdownMenu,
    raw_text: String,
    ranges: Vec<RangeInput>,
    options: Vec<MarkOption>,
    config: MarkerConfig,
    state: EditState,
    /// `range:insert` and `range:click` notifications not yet handled
    inbox: Rc<RefCell<VecDeque<SelectionEvent>>>,
    emitter: EventEmitter<MarkerEventKind, MarkerEvent>,
    /// Document-level pointer-up listener
    outside: HandlerId,
    destroyed: bool,
}

impl TextMarker {
    /// Create an empty widget using the built-in positioner
    pub fn new(config: MarkerConfig) -> WidgetResult<Self> {
        Self::with_service(config, Rc::new(AnchoredPositioner))
    }

    /// Create an empty widget positioning its panels through `service`
    pub fn with_service(config: MarkerConfig, service: Rc<dyn PositionService>) -> WidgetResult<Self> {
        let mut doc = Document::new(config.viewport.width, config.viewport.height);
        let body = doc.body();
        let tree = doc.tree_mut();
        let root = tree.create_element("div");
        tree.set_attr(root, "class", "text-mark")?;
        tree.append_child(body, root)?;
        let paragraph = tree.create_element("p");
        tree.set_attr(paragraph, "class", "paragraph")?;
        tree.append_child(root, paragraph)?;
        doc.set_box(root, config.container.into())?;
        doc.set_box(paragraph, config.container.into())?;
        doc.register_flow_root(paragraph, config.metrics());

        let mut selection = TextSelection::new(&mut doc, paragraph)?;
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        for kind in [SelectionEventKind::RangeInsert, SelectionEventKind::RangeClick] {
            let inbox = inbox.clone();
            selection.on(kind, move |event| inbox.borrow_mut().push_back(event.clone()));
        }

        let popover = Popover::new(&mut doc, service.clone(), config.popover_offset);
        let dropdown = DropdownMenu::new(&mut doc, service, config.empty_label.clone());
        let outside = doc.new_handler_id();
        doc.add_event_listener(NodeId::ROOT, EventType::PointerUp, outside, ListenerOptions::default());
        doc.reflow();
        tracing::debug!("TextMarker mounted on {}", paragraph);

        Ok(Self {
            doc,
            root,
            selection,
            popover,
            dropdown,
            raw_text: String::new(),
            ranges: Vec::new(),
            options: Vec::new(),
            config,
            state: EditState::Idle,
            inbox,
            emitter: EventEmitter::new(),
            outside,
            destroyed: false,
        })
    }

    /// Create a widget and apply the document's props
    pub fn mount(document: MarkerDocument) -> WidgetResult<Self> {
        let MarkerDocument { raw_text, ranges, options, config } = document;
        let mut marker = Self::new(config)?;
        marker.set_options(options);
        marker.set_props(&raw_text, ranges)?;
        Ok(marker)
    }

    // --- Accessors ---

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Outer `div.text-mark`
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The paragraph the ranges are rendered into
    pub fn container(&self) -> NodeId {
        self.selection.container()
    }

    pub fn selection(&self) -> &TextSelection {
        &self.selection
    }

    pub fn popover(&self) -> &Popover {
        &self.popover
    }

    pub fn dropdown(&self) -> &DropdownMenu {
        &self.dropdown
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn raw_text(&self) -> &str {
        self.selection.raw_text()
    }

    /// Current ranges, including a provisional one
    pub fn ranges(&self) -> &[TextRange] {
        self.selection.ranges()
    }

    pub fn options(&self) -> &[MarkOption] {
        &self.options
    }

    pub fn config(&self) -> &MarkerConfig {
        &self.config
    }

    /// Markup of the paragraph
    pub fn markup(&self) -> String {
        self.selection.markup()
    }

    /// Span of the range at `index`
    pub fn range_element(&self, index: usize) -> Option<NodeId> {
        self.selection.get_range_element(&self.doc, index)
    }

    // --- Events ---

    /// Subscribe to an event
    pub fn on(&mut self, kind: MarkerEventKind, listener: impl FnMut(&MarkerEvent) + 'static) -> ListenerId {
        self.emitter.on(kind, listener)
    }

    /// Unsubscribe
    pub fn off(&mut self, kind: MarkerEventKind, id: ListenerId) -> bool {
        self.emitter.off(&kind, id)
    }

    fn emit(&mut self, event: MarkerEvent) {
        let kind = event.kind();
        tracing::debug!("emit {}", kind);
        self.emitter.emit(&kind, &event);
    }

    /// `update:ranges`, `change`, then `mark`
    fn emit_change(&mut self, mark: MarkerEvent) {
        let ranges = self.selection.ranges().to_vec();
        self.ranges = ranges.iter().map(RangeInput::from).collect();
        self.emit(MarkerEvent::UpdateRanges(ranges.clone()));
        self.emit(MarkerEvent::Change(ranges));
        self.emit(mark);
    }

    // --- Props ---

    /// Replace the text, keeping the current ranges prop
    pub fn set_raw_text(&mut self, raw_text: &str) -> WidgetResult<bool> {
        let ranges = self.ranges.clone();
        self.set_props(raw_text, ranges)
    }

    /// Replace the ranges, keeping the current text
    pub fn set_ranges(&mut self, ranges: Vec<RangeInput>) -> WidgetResult<bool> {
        let raw_text = self.raw_text.clone();
        self.set_props(&raw_text, ranges)
    }

    /// Replace text and ranges; returns whether anything was re-rendered
    ///
    /// Invalid ranges leave the widget untouched.
    pub fn set_props(&mut self, raw_text: &str, ranges: Vec<RangeInput>) -> WidgetResult<bool> {
        self.ensure_alive()?;
        let changed = self.selection.init(&mut self.doc, raw_text, &ranges)?;
        self.raw_text = raw_text.to_owned();
        self.ranges = ranges;
        if changed {
            // Range identities were replaced, nothing is being edited anymore.
            self.reset();
            self.doc.reflow();
        }
        Ok(changed)
    }

    /// Replace the label vocabulary
    pub fn set_options(&mut self, options: Vec<MarkOption>) {
        self.options = options;
    }

    // --- Event pump ---

    /// Pointer released over `target`
    pub fn pointer_up(&mut self, target: NodeId) -> WidgetResult<DomEvent> {
        self.dispatch(EventType::PointerUp, target)
    }

    /// Click on `target`
    pub fn click(&mut self, target: NodeId) -> WidgetResult<DomEvent> {
        self.dispatch(EventType::Click, target)
    }

    /// Pointer-up followed by click, as a mouse click delivers them
    pub fn tap(&mut self, target: NodeId) -> WidgetResult<()> {
        self.pointer_up(target)?;
        self.click(target)?;
        Ok(())
    }

    /// Scroll `node` (or the viewport, `NodeId::ROOT`) by a delta
    pub fn scroll(&mut self, node: NodeId, dx: f64, dy: f64) -> WidgetResult<DomEvent> {
        self.ensure_alive()?;
        self.doc.scroll_by(node, dx, dy)?;
        self.dispatch(EventType::Scroll, node)
    }

    /// `node` changed size
    pub fn resize(&mut self, node: NodeId) -> WidgetResult<DomEvent> {
        self.dispatch(EventType::Resize, node)
    }

    /// Resize the viewport
    pub fn set_viewport_size(&mut self, width: f64, height: f64) -> WidgetResult<DomEvent> {
        self.ensure_alive()?;
        self.doc.set_viewport_size(width, height);
        self.resize(NodeId::ROOT)
    }

    /// Drag-select the characters `[start, end)` of the paragraph and release
    /// the pointer; `None` when the offsets are outside the text
    pub fn select_text(&mut self, start: usize, end: usize) -> WidgetResult<Option<DomEvent>> {
        self.ensure_alive()?;
        let container = self.selection.container();
        let Some(range) = self.doc.select_text(container, start, end) else {
            tracing::trace!("No text at [{}, {})", start, end);
            return Ok(None);
        };
        self.pointer_up(range.start_container()).map(Some)
    }

    fn dispatch(&mut self, event_type: EventType, target: NodeId) -> WidgetResult<DomEvent> {
        self.ensure_alive()?;
        let target = self.doc.event_target(target);
        let mut event = DomEvent::new(event_type, target);
        let mut reactions = Vec::new();

        for step in self.doc.dispatch_path(target, event_type) {
            if !event.enter(&step) {
                break;
            }
            let handler = step.handler;
            if self.selection.handles(handler) {
                self.selection.handle_event(&mut self.doc, handler, &mut event)?;
            } else if self.popover.handles(handler) {
                if let Some(action) = self.popover.handle_event(&mut self.doc, handler, &mut event) {
                    reactions.push(Reaction::Popover(action));
                }
            } else if self.dropdown.handles(handler) {
                if let Some(value) = self.dropdown.handle_event(&mut self.doc, handler, &mut event) {
                    reactions.push(Reaction::Select(value));
                }
            } else if handler == self.outside {
                reactions.push(Reaction::Outside);
            }
        }

        for reaction in reactions {
            match reaction {
                Reaction::Popover(PopoverAction::Add) => {
                    self.add_mark()?;
                }
                Reaction::Popover(PopoverAction::Remove) => {
                    self.remove_mark()?;
                }
                Reaction::Select(value) => {
                    self.select(&value)?;
                }
                Reaction::Outside => self.dismiss()?,
            }
        }
        self.pump()?;
        Ok(event)
    }

    /// Commit the render, deliver deferred notifications and react to them
    fn pump(&mut self) -> WidgetResult<()> {
        loop {
            self.doc.reflow();
            self.selection.run_deferred(&self.doc);
            let next = self.inbox.borrow_mut().pop_front();
            let Some(event) = next else {
                return Ok(());
            };
            match event {
                SelectionEvent::RangeInsert { range, .. } => self.on_range_insert(range.id)?,
                SelectionEvent::RangeClick { range, .. } => self.on_range_click(&range)?,
                SelectionEvent::RangesUpdate(_) => {}
            }
        }
    }

    /// Drive pending panel positioning; returns how many positions were applied
    pub async fn flush(&mut self) -> usize {
        let applied = self.popover.settle(&mut self.doc).await;
        applied + self.dropdown.settle(&mut self.doc).await
    }

    // --- Editing ---

    fn on_range_insert(&mut self, id: RangeId) -> WidgetResult<()> {
        self.discard_provisional(Some(id))?;
        self.dropdown.hide(&mut self.doc);
        self.state = EditState::Editing { range: id, mode: EditMode::Add };
        self.doc.reflow();

        let Some(index) = self.selection.get_range_index(id) else {
            return Ok(());
        };
        let Some(span) = self.selection.get_range_element(&self.doc, index) else {
            return Ok(());
        };
        let color = self.config.color(index);
        self.popover.show(&mut self.doc, span, PopoverAction::Add, &self.config.add_label, color)?;
        tracing::debug!("Offering a label for range {}", index);
        Ok(())
    }

    fn on_range_click(&mut self, range: &TextRange) -> WidgetResult<()> {
        self.popover.hide(&mut self.doc);
        self.dropdown.hide(&mut self.doc);
        self.discard_provisional(Some(range.id))?;
        self.state = EditState::Editing { range: range.id, mode: EditMode::Remove };
        self.doc.reflow();

        let Some(index) = self.selection.get_range_index(range.id) else {
            return Ok(());
        };
        let Some(span) = self.selection.get_range_element(&self.doc, index) else {
            return Ok(());
        };
        let label = self.options.iter()
            .find(|o| o.value == range.data)
            .map_or(range.data.as_str(), |o| o.label.as_str());
        let color = self.config.color(index);
        self.popover.show(&mut self.doc, span, PopoverAction::Remove, label, color)?;
        tracing::debug!("Offering removal of range {}", index);
        Ok(())
    }

    /// Open the label dropdown for the range being edited
    pub fn add_mark(&mut self) -> WidgetResult<bool> {
        self.ensure_alive()?;
        let Some(id) = self.state.range() else {
            return Ok(false);
        };
        self.popover.hide(&mut self.doc);
        self.doc.reflow();
        let Some(span) = self.selection.get_range_element(&self.doc, id) else {
            return Ok(false);
        };
        let items: Vec<MenuItem> = self.options.iter()
            .map(|o| MenuItem::new(o.label.as_str(), o.value.as_str()))
            .collect();
        self.dropdown.show(&mut self.doc, span, &items)?;
        Ok(true)
    }

    /// Give the range being edited the label `value`
    pub fn select(&mut self, value: &str) -> WidgetResult<bool> {
        self.ensure_alive()?;
        let Some(id) = self.state.range() else {
            return Ok(false);
        };
        self.popover.hide(&mut self.doc);
        self.dropdown.hide(&mut self.doc);
        self.state = EditState::Idle;
        if !self.selection.set_range_data(&mut self.doc, RangeRef::Id(id), value)? {
            return Ok(false);
        }
        self.doc.reflow();

        let range = self.selection.get_range_index(id).and_then(|i| self.selection.range(i)).cloned();
        let Some(range) = range else {
            return Ok(false);
        };
        tracing::debug!("Labelled [{}, {}) as {:?}", range.start, range.end, range.data);
        self.emit_change(MarkerEvent::AddMark(range));
        Ok(true)
    }

    /// Remove the range being edited
    pub fn remove_mark(&mut self) -> WidgetResult<bool> {
        self.ensure_alive()?;
        let Some(id) = self.state.range() else {
            return Ok(false);
        };
        self.popover.hide(&mut self.doc);
        self.state = EditState::Idle;
        let Some(index) = self.selection.get_range_index(id) else {
            return Ok(false);
        };
        let Some(removed) = self.selection.remove_range_at(&mut self.doc, index)? else {
            return Ok(false);
        };
        self.doc.reflow();
        tracing::debug!("Removed mark [{}, {})", removed.start, removed.end);
        self.emit_change(MarkerEvent::RemoveMark(removed));
        Ok(true)
    }

    /// Pointer-up that no container or panel claimed
    fn dismiss(&mut self) -> WidgetResult<()> {
        self.discard_provisional(None)?;
        self.reset();
        Ok(())
    }

    /// Remove the edited range if it never got a label, unless it is `keep`
    fn discard_provisional(&mut self, keep: Option<RangeId>) -> WidgetResult<()> {
        let Some(id) = self.state.range() else {
            return Ok(());
        };
        if keep == Some(id) {
            return Ok(());
        }
        self.state = EditState::Idle;
        let provisional = self.selection.get_range_index(id)
            .and_then(|i| self.selection.range(i))
            .is_some_and(|r| r.is_provisional());
        if provisional {
            self.selection.remove_range(&mut self.doc, id)?;
            tracing::debug!("Discarded provisional range");
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.popover.hide(&mut self.doc);
        self.dropdown.hide(&mut self.doc);
        self.state = EditState::Idle;
    }

    fn ensure_alive(&self) -> WidgetResult<()> {
        if self.destroyed {
            return Err(WidgetError::Destroyed);
        }
        Ok(())
    }

    /// Tear everything down; later calls fail with `WidgetError::Destroyed`
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.popover.destroy(&mut self.doc);
        self.dropdown.destroy(&mut self.doc);
        self.selection.destroy(&mut self.doc);
        self.doc.remove_handler(self.outside);
        self.doc.unregister_flow_root(self.selection.container());
        self.emitter.clear();
        self.inbox.borrow_mut().clear();
        self.state = EditState::Idle;
        self.destroyed = true;
        tracing::debug!("TextMarker destroyed");
    }
}
