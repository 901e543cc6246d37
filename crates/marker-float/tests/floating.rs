//! Floating panel tests
//!
//! Lifecycle, asynchronous position races, scroll tracking and event
//! shielding of the popover and dropdown menu.

use std::cell::RefCell;
use std::rc::Rc;

use marker_dom::{DOMRect, Document, DomEvent, EventType, HandlerId, ListenerOptions, NodeId};
use marker_float::{
    AnchoredPositioner, DropdownMenu, MenuItem, Placement, Popover, PopoverAction, PositionRequest,
    PositionResult, PositionService,
};
use smol::channel::{self, Sender};
use smol::future::Boxed;

/// Positioning service whose results are released by the test
#[derive(Default)]
struct ManualPositioner {
    senders: RefCell<Vec<Sender<PositionResult>>>,
}

impl ManualPositioner {
    fn resolve_all(&self, result: PositionResult) {
        for sender in self.senders.borrow_mut().drain(..) {
            sender.try_send(result).unwrap();
        }
    }
}

impl PositionService for ManualPositioner {
    fn compute_position(&self, _request: PositionRequest) -> Boxed<PositionResult> {
        let (tx, rx) = channel::bounded(1);
        self.senders.borrow_mut().push(tx);
        Box::pin(async move { rx.recv().await.unwrap() })
    }
}

/// Body > scrollable div (0,0,400,100) > span (50,50,40,20)
fn scene() -> (Document, NodeId, NodeId) {
    let mut doc = Document::new(800.0, 600.0);
    let body = doc.body();
    let tree = doc.tree_mut();
    let scroller = tree.create_element("div");
    let span = tree.create_element("span");
    let text = tree.create_text("word");
    tree.append_child(body, scroller).unwrap();
    tree.append_child(scroller, span).unwrap();
    tree.append_child(span, text).unwrap();
    doc.set_scrollable(scroller, true).unwrap();
    doc.set_box(scroller, DOMRect::from_xywh(0.0, 0.0, 400.0, 100.0)).unwrap();
    doc.set_box(span, DOMRect::from_xywh(50.0, 50.0, 40.0, 20.0)).unwrap();
    doc.reflow();
    (doc, scroller, span)
}

fn items() -> Vec<MenuItem> {
    vec![MenuItem::new("Person", "PER"), MenuItem::new("Place", "LOC")]
}

/// Dispatch an event, handing every step to `handle`
fn dispatch(
    doc: &mut Document,
    event_type: EventType,
    target: NodeId,
    mut handle: impl FnMut(&mut Document, HandlerId, &mut DomEvent),
) -> DomEvent {
    let mut event = DomEvent::new(event_type, target);
    for step in doc.dispatch_path(target, event_type) {
        if !event.enter(&step) {
            break;
        }
        handle(doc, step.handler, &mut event);
    }
    event
}

fn item_with_value(doc: &Document, panel: NodeId, value: &str) -> NodeId {
    doc.tree()
        .find_descendant(panel, |n| n.as_element().and_then(|e| e.get_attr("data-value")) == Some(value))
        .unwrap()
}

// ============================================================================
// ASYNC RACES
// ============================================================================

#[test]
fn test_result_after_hide_is_dropped() {
    let (mut doc, _, span) = scene();
    let service = Rc::new(ManualPositioner::default());
    let mut menu = DropdownMenu::new(&mut doc, service.clone(), "No data");

    let panel = menu.show(&mut doc, span, &items()).unwrap();
    assert!(menu.hide(&mut doc));
    service.resolve_all(PositionResult {
        x: 10.0,
        y: 10.0,
        placement: Placement::BottomStart,
        reference_hidden: false,
        arrow_offset: None,
    });

    assert_eq!(smol::block_on(menu.settle(&mut doc)), 0);
    assert!(!menu.is_showing());
    assert!(!doc.tree().is_connected(panel));
}

#[test]
fn test_result_of_older_show_is_dropped() {
    let (mut doc, _, span) = scene();
    let service = Rc::new(ManualPositioner::default());
    let mut menu = DropdownMenu::new(&mut doc, service.clone(), "No data");

    menu.show(&mut doc, span, &items()).unwrap();
    let panel = menu.show(&mut doc, span, &[]).unwrap();
    service.resolve_all(PositionResult {
        x: 33.0,
        y: 44.0,
        placement: Placement::BottomStart,
        reference_hidden: false,
        arrow_offset: None,
    });

    assert_eq!(smol::block_on(menu.settle(&mut doc)), 1);
    assert_eq!(doc.bounding_client_rect(panel).map(|r| (r.x, r.y)), Some((33.0, 44.0)));
    assert_eq!(doc.tree().text_content(panel), "No data");
}

// ============================================================================
// SCROLL TRACKING
// ============================================================================

#[test]
fn test_scroll_repositions_dropdown() {
    let (mut doc, scroller, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "No data");
    let panel = menu.show(&mut doc, span, &items()).unwrap();
    smol::block_on(menu.settle(&mut doc));
    assert_eq!(doc.bounding_client_rect(panel).map(|r| (r.x, r.y)), Some((50.0, 70.0)));

    doc.scroll_by(scroller, 0.0, 10.0).unwrap();
    dispatch(&mut doc, EventType::Scroll, scroller, |doc, handler, event| {
        if menu.handles(handler) {
            menu.handle_event(doc, handler, event);
        }
    });
    assert_eq!(smol::block_on(menu.settle(&mut doc)), 1);
    assert_eq!(doc.bounding_client_rect(panel).map(|r| r.y), Some(60.0));
}

#[test]
fn test_scroll_burst_keeps_one_request() {
    let (mut doc, scroller, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "No data");
    let panel = menu.show(&mut doc, span, &items()).unwrap();

    for _ in 0..5 {
        doc.scroll_by(scroller, 0.0, 2.0).unwrap();
        dispatch(&mut doc, EventType::Scroll, scroller, |doc, handler, event| {
            if menu.handles(handler) {
                menu.handle_event(doc, handler, event);
            }
        });
    }
    assert_eq!(menu.controller().pending(), 1);

    assert_eq!(smol::block_on(menu.settle(&mut doc)), 1);
    assert_eq!(doc.bounding_client_rect(panel).map(|r| (r.x, r.y)), Some((50.0, 60.0)));
}

#[test]
fn test_hidden_reference_hides_panel_by_visibility() {
    let (mut doc, scroller, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "No data");
    let panel = menu.show(&mut doc, span, &items()).unwrap();
    smol::block_on(menu.settle(&mut doc));

    doc.scroll_by(scroller, 0.0, 100.0).unwrap();
    dispatch(&mut doc, EventType::Scroll, scroller, |doc, handler, event| {
        if menu.handles(handler) {
            menu.handle_event(doc, handler, event);
        }
    });
    smol::block_on(menu.settle(&mut doc));

    assert!(menu.is_showing());
    assert!(doc.tree().is_connected(panel));
    assert!(doc.tree().attr(panel, "style").unwrap().contains("visibility: hidden"));
    assert!(menu.controller().last_position().unwrap().reference_hidden);
}

#[test]
fn test_listeners_follow_lifecycle() {
    let (mut doc, scroller, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "No data");
    menu.show(&mut doc, span, &items()).unwrap();
    assert_eq!(doc.listener_count(scroller, EventType::Scroll), 1);
    assert_eq!(doc.listener_count(NodeId::ROOT, EventType::Resize), 1);

    menu.destroy(&mut doc);
    assert_eq!(doc.listener_count(scroller, EventType::Scroll), 0);
    assert_eq!(doc.listener_count(NodeId::ROOT, EventType::Resize), 0);
}

// ============================================================================
// PANEL EVENTS
// ============================================================================

#[test]
fn test_panel_shields_pointer_up_from_document() {
    let (mut doc, _, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "No data");
    let panel = menu.show(&mut doc, span, &items()).unwrap();
    let outside = doc.new_handler_id();
    doc.add_event_listener(NodeId::ROOT, EventType::PointerUp, outside, ListenerOptions::default());

    let item = item_with_value(&doc, panel, "LOC");
    let mut reached_document = false;
    let event = dispatch(&mut doc, EventType::PointerUp, item, |doc, handler, event| {
        if handler == outside {
            reached_document = true;
        } else if menu.handles(handler) {
            menu.handle_event(doc, handler, event);
        }
    });
    assert!(event.is_propagation_stopped());
    assert!(!reached_document);
}

#[test]
fn test_dropdown_click_yields_value() {
    let (mut doc, _, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "No data");
    let panel = menu.show(&mut doc, span, &items()).unwrap();
    let item = item_with_value(&doc, panel, "PER");

    let mut picked = None;
    dispatch(&mut doc, EventType::Click, item, |doc, handler, event| {
        if menu.handles(handler) {
            picked = menu.handle_event(doc, handler, event);
        }
    });
    assert_eq!(picked.as_deref(), Some("PER"));
}

#[test]
fn test_empty_dropdown_has_no_values() {
    let (mut doc, _, span) = scene();
    let mut menu = DropdownMenu::new(&mut doc, Rc::new(AnchoredPositioner), "Nothing here");
    let panel = menu.show(&mut doc, span, &[]).unwrap();
    let li = doc.tree().find_descendant(panel, |n| n.is_tag("li")).unwrap();

    let mut picked = Some(String::new());
    dispatch(&mut doc, EventType::Click, li, |doc, handler, event| {
        if menu.handles(handler) {
            picked = menu.handle_event(doc, handler, event);
        }
    });
    assert_eq!(picked, None);
    assert_eq!(doc.tree().text_content(panel), "Nothing here");
}

#[test]
fn test_popover_actions() {
    let (mut doc, _, span) = scene();
    let mut popover = Popover::new(&mut doc, Rc::new(AnchoredPositioner), 10.0);

    let panel = popover.show(&mut doc, span, PopoverAction::Remove, "Person", "#FD4A4A").unwrap();
    assert_eq!(popover.action(), Some(PopoverAction::Remove));
    smol::block_on(popover.settle(&mut doc));

    let arrow = doc.tree()
        .find_descendant(panel, |n| n.as_element().is_some_and(|e| e.has_class("floating-arrow")))
        .unwrap();
    assert!(doc.tree().attr(arrow, "style").unwrap().contains("border-top-color: #FD4A4A"));

    let label = doc.tree().find_descendant(panel, |n| n.as_element().is_some_and(|e| e.has_class("remove-mark"))).unwrap();
    let close = doc.tree().find_descendant(panel, |n| n.as_element().is_some_and(|e| e.has_class("close-icon"))).unwrap();

    let mut clicked = Vec::new();
    for target in [label, close] {
        dispatch(&mut doc, EventType::Click, target, |doc, handler, event| {
            if popover.handles(handler) {
                clicked.push(popover.handle_event(doc, handler, event));
            }
        });
    }
    assert_eq!(clicked, vec![None, Some(PopoverAction::Remove)]);

    popover.hide(&mut doc);
    assert_eq!(popover.action(), None);
}

#[test]
fn test_popover_sits_above_reference() {
    let (mut doc, _, span) = scene();
    let mut popover = Popover::new(&mut doc, Rc::new(AnchoredPositioner), 10.0);
    let panel = popover.show(&mut doc, span, PopoverAction::Add, "Add", "#607AE3").unwrap();
    smol::block_on(popover.settle(&mut doc));

    let rect = doc.bounding_client_rect(panel).unwrap();
    assert_eq!(rect.bottom(), 40.0);
    assert_eq!(rect.center_x(), 70.0);
}
