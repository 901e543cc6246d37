//! DropdownMenu - label picker anchored below a range

use std::rc::Rc;

use marker_dom::{Document, DomEvent, HandlerId, NodeId};
use marker_html::{escape_attr, escape_text};

use crate::controller::{FloatingController, PanelEvent, PanelSpec};
use crate::position::{Middleware, Placement, PositionService, Size};
use crate::FloatResult;

const CHAR_WIDTH: f64 = 8.0;
const ITEM_HEIGHT: f64 = 32.0;
const MIN_WIDTH: f64 = 120.0;
const PADDING: f64 = 8.0;

/// One selectable entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub value: String,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// Menu of labels
#[derive(Debug)]
pub struct DropdownMenu {
    controller: FloatingController,
    empty_label: String,
}

impl DropdownMenu {
    /// `empty_label` is shown when there is nothing to pick
    pub fn new(doc: &mut Document, service: Rc<dyn PositionService>, empty_label: impl Into<String>) -> Self {
        let middleware = vec![Middleware::Inline, Middleware::Flip, Middleware::Hide];
        Self {
            controller: FloatingController::new(doc, "dropdown-menu", service, Placement::BottomStart, middleware),
            empty_label: empty_label.into(),
        }
    }

    /// Show `items` below `reference`
    pub fn show(&mut self, doc: &mut Document, reference: NodeId, items: &[MenuItem]) -> FloatResult<NodeId> {
        let mut content = String::from("<ul>");
        let mut widest = self.empty_label.chars().count();
        if items.is_empty() {
            content.push_str(&format!(r#"<li class="no-data">{}</li>"#, escape_text(&self.empty_label)));
        } else {
            widest = 0;
            for item in items {
                content.push_str(&format!(
                    r#"<li class="menu-item" title="{}" data-value="{}">{}</li>"#,
                    escape_attr(&item.label),
                    escape_attr(&item.value),
                    escape_text(&item.label),
                ));
                widest = widest.max(item.label.chars().count());
            }
        }
        content.push_str("</ul>");

        let rows = items.len().max(1) as f64;
        let size = Size::new(
            (widest as f64 * CHAR_WIDTH + 2.0 * PADDING).max(MIN_WIDTH),
            rows * ITEM_HEIGHT + PADDING,
        );
        let panel = self.controller.show(doc, PanelSpec { reference, content, size, color: None })?;
        tracing::debug!("Dropdown with {} items for {}", items.len(), reference);
        Ok(panel)
    }

    pub fn is_showing(&self) -> bool {
        self.controller.is_showing()
    }

    pub fn controller(&self) -> &FloatingController {
        &self.controller
    }

    pub fn hide(&mut self, doc: &mut Document) -> bool {
        self.controller.hide(doc)
    }

    pub fn destroy(&mut self, doc: &mut Document) {
        self.controller.destroy(doc);
    }

    pub async fn settle(&mut self, doc: &mut Document) -> usize {
        self.controller.settle(doc).await
    }

    pub fn handles(&self, handler: HandlerId) -> bool {
        self.controller.handles(handler)
    }

    /// Run a panel listener; returns the value of a clicked item
    pub fn handle_event(&mut self, doc: &mut Document, handler: HandlerId, event: &mut DomEvent) -> Option<String> {
        let PanelEvent::Activated(target) = self.controller.handle_event(doc, handler, event) else {
            return None;
        };
        let panel = self.controller.panel()?;
        let tree = doc.tree();
        let mut node = Some(target);
        while let Some(id) = node {
            if id == panel {
                break;
            }
            if tree.get(id).is_some_and(|n| n.is_tag("li")) {
                return tree.attr(id, "data-value").map(str::to_owned);
            }
            node = tree.parent(id);
        }
        None
    }
}
