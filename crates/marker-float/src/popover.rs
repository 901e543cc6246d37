//! Popover - the add/remove action bubble shown above a range

use std::rc::Rc;

use marker_dom::{Document, DomEvent, HandlerId, NodeId};
use marker_html::{escape_attr, escape_text};

use crate::controller::{FloatingController, PanelEvent, PanelSpec};
use crate::position::{Middleware, Placement, PositionService, Size};
use crate::FloatResult;

const CHAR_WIDTH: f64 = 8.0;
const PADDING: f64 = 12.0;
const ICON_WIDTH: f64 = 16.0;
const HEIGHT: f64 = 32.0;
const ARROW_SIZE: f64 = 8.0;

/// Action offered by the popover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopoverAction {
    /// Assign a label to a provisional range
    Add,
    /// Remove a labelled range
    Remove,
}

impl PopoverAction {
    fn as_str(&self) -> &'static str {
        match self {
            PopoverAction::Add => "add",
            PopoverAction::Remove => "remove",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(PopoverAction::Add),
            "remove" => Some(PopoverAction::Remove),
            _ => None,
        }
    }
}

/// Action bubble anchored above a span
#[derive(Debug)]
pub struct Popover {
    controller: FloatingController,
    action: Option<PopoverAction>,
}

impl Popover {
    /// `offset` is the gap between the span and the bubble
    pub fn new(doc: &mut Document, service: Rc<dyn PositionService>, offset: f64) -> Self {
        let middleware = vec![
            Middleware::Offset(offset),
            Middleware::Shift { padding: 4.0 },
            Middleware::Arrow { size: ARROW_SIZE },
            Middleware::Hide,
        ];
        Self {
            controller: FloatingController::new(doc, "popover", service, Placement::Top, middleware),
            action: None,
        }
    }

    /// Show `action` with `label` next to `reference`, tinted with `color`
    pub fn show(
        &mut self,
        doc: &mut Document,
        reference: NodeId,
        action: PopoverAction,
        label: &str,
        color: &str,
    ) -> FloatResult<NodeId> {
        let content = match action {
            PopoverAction::Add => format!(
                r#"<div class="popover-content add-mark" data-action="add" style="background-color: {color}">{label}</div>"#,
                color = escape_attr(color),
                label = escape_text(label),
            ),
            PopoverAction::Remove => format!(
                r#"<div class="popover-content remove-mark" style="background-color: {color}">{label}<i class="close-icon" data-action="remove">×</i></div>"#,
                color = escape_attr(color),
                label = escape_text(label),
            ),
        };
        let content = format!(r#"{content}<i class="floating-arrow"></i>"#);

        let mut width = label.chars().count() as f64 * CHAR_WIDTH + 2.0 * PADDING;
        if action == PopoverAction::Remove {
            width += ICON_WIDTH;
        }
        let spec = PanelSpec {
            reference,
            content,
            size: Size::new(width, HEIGHT),
            color: Some(color.to_owned()),
        };
        let panel = self.controller.show(doc, spec)?;
        tracing::debug!("Popover {} for {}", action.as_str(), reference);
        self.action = Some(action);
        Ok(panel)
    }

    /// The action on display
    pub fn action(&self) -> Option<PopoverAction> {
        self.action.filter(|_| self.controller.is_showing())
    }

    pub fn is_showing(&self) -> bool {
        self.controller.is_showing()
    }

    pub fn controller(&self) -> &FloatingController {
        &self.controller
    }

    pub fn hide(&mut self, doc: &mut Document) -> bool {
        self.action = None;
        self.controller.hide(doc)
    }

    pub fn destroy(&mut self, doc: &mut Document) {
        self.action = None;
        self.controller.destroy(doc);
    }

    pub async fn settle(&mut self, doc: &mut Document) -> usize {
        self.controller.settle(doc).await
    }

    pub fn handles(&self, handler: HandlerId) -> bool {
        self.controller.handles(handler)
    }

    /// Run a panel listener; returns the action when one was clicked
    pub fn handle_event(&mut self, doc: &mut Document, handler: HandlerId, event: &mut DomEvent) -> Option<PopoverAction> {
        let PanelEvent::Activated(target) = self.controller.handle_event(doc, handler, event) else {
            return None;
        };
        let panel = self.controller.panel()?;
        let tree = doc.tree();
        let mut node = Some(target);
        while let Some(id) = node {
            if let Some(action) = tree.attr(id, "data-action").and_then(PopoverAction::parse) {
                return Some(action);
            }
            if id == panel {
                break;
            }
            node = tree.parent(id);
        }
        None
    }
}
