//! Integration tests for marker-dom
//!
//! Exercises the document the way the annotation widget does: inline
//! content in a flow root, native selection, event dispatch and geometry.

use marker_dom::{
    DOMRect, Document, DomEvent, EventType, InlineMetrics, ListenerOptions, NodeId, SelectionType,
};

fn container_with(doc: &mut Document, parts: &[(&str, bool)]) -> NodeId {
    let body = doc.body();
    let tree = doc.tree_mut();
    let div = tree.create_element("div");
    tree.append_child(body, div).unwrap();
    for (text, marked) in parts {
        let text_node = tree.create_text(text);
        if *marked {
            let span = tree.create_element("span");
            tree.set_attr(span, "class", "default").unwrap();
            tree.append_child(div, span).unwrap();
            tree.append_child(span, text_node).unwrap();
        } else {
            tree.append_child(div, text_node).unwrap();
        }
    }
    doc.set_box(div, DOMRect::from_xywh(0.0, 0.0, 400.0, 200.0)).unwrap();
    doc.register_flow_root(div, InlineMetrics::default());
    div
}

// ============================================================================
// LAYOUT AND GEOMETRY
// ============================================================================

#[test]
fn test_reflow_assigns_span_boxes() {
    let mut doc = Document::new(800.0, 600.0);
    let div = container_with(&mut doc, &[("Hello ", false), ("world", true)]);
    assert!(doc.reflow());

    let span = doc.tree().find_descendant(div, |n| n.is_tag("span")).unwrap();
    assert_eq!(doc.bounding_client_rect(span), Some(DOMRect::from_xywh(48.0, 0.0, 40.0, 20.0)));
    assert_eq!(doc.client_rects(span).len(), 1);
}

#[test]
fn test_viewport_scroll_shifts_client_rects() {
    let mut doc = Document::new(800.0, 600.0);
    let div = container_with(&mut doc, &[("abc", true)]);
    doc.reflow();
    let span = doc.tree().find_descendant(div, |n| n.is_tag("span")).unwrap();

    doc.scroll_by(NodeId::ROOT, 0.0, 15.0).unwrap();
    assert_eq!(doc.bounding_client_rect(span).map(|r| r.y), Some(-15.0));
    assert_eq!(doc.scroll_position(), (0.0, 15.0));
}

#[test]
fn test_detached_node_has_no_rect() {
    let mut doc = Document::default();
    let div = container_with(&mut doc, &[("abc", true)]);
    doc.reflow();
    let span = doc.tree().find_descendant(div, |n| n.is_tag("span")).unwrap();
    doc.tree_mut().detach(span).unwrap();
    assert_eq!(doc.bounding_client_rect(span), None);
    assert!(doc.client_rects(span).is_empty());
}

#[test]
fn test_clipping_rect_hidden_when_scrolled_out() {
    let mut doc = Document::new(800.0, 600.0);
    let div = container_with(&mut doc, &[("abc", false)]);
    doc.set_scrollable(div, true).unwrap();
    doc.reflow();
    let text = doc.tree().children(div).next().map(|(id, _)| id).unwrap();
    assert_eq!(doc.clipping_rect(text), Some(DOMRect::from_xywh(0.0, 0.0, 400.0, 200.0)));

    doc.scroll_by(NodeId::ROOT, 0.0, 1000.0).unwrap();
    assert_eq!(doc.clipping_rect(text), None);
}

// ============================================================================
// SELECTION
// ============================================================================

#[test]
fn test_select_text_across_span() {
    let mut doc = Document::default();
    let div = container_with(&mut doc, &[("ab", false), ("cd", true), ("ef", false)]);

    let range = doc.select_text(div, 1, 5).unwrap();
    assert_eq!(doc.selection().selection_type(), SelectionType::Range);
    assert_ne!(range.start_container(), range.end_container());
    assert_eq!(range.start_offset(), 1);
    assert_eq!(range.end_offset(), 1);

    doc.clear_selection();
    assert_eq!(doc.selection().range_count(), 0);
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_container_listener_runs_before_document_listener() {
    let mut doc = Document::default();
    let div = container_with(&mut doc, &[("abc", true)]);
    let span = doc.tree().find_descendant(div, |n| n.is_tag("span")).unwrap();
    let text = doc.tree().children(span).next().map(|(id, _)| id).unwrap();

    let on_container = doc.new_handler_id();
    let on_document = doc.new_handler_id();
    doc.add_event_listener(NodeId::ROOT, EventType::PointerUp, on_document, ListenerOptions::default());
    doc.add_event_listener(div, EventType::PointerUp, on_container, ListenerOptions::default());

    let target = doc.event_target(text);
    assert_eq!(target, span);

    let steps = doc.dispatch_path(target, EventType::PointerUp);
    let mut event = DomEvent::new(EventType::PointerUp, target);
    let mut ran = Vec::new();
    for step in &steps {
        if !event.enter(step) {
            break;
        }
        ran.push(step.handler);
        if step.handler == on_container {
            event.stop_propagation();
        }
    }
    assert_eq!(ran, vec![on_container]);
}

#[test]
fn test_remove_handler_detaches_all() {
    let mut doc = Document::default();
    let body = doc.body();
    let h = doc.new_handler_id();
    doc.add_event_listener(body, EventType::Click, h, ListenerOptions::default());
    doc.add_event_listener(NodeId::ROOT, EventType::Resize, h, ListenerOptions::default());

    assert_eq!(doc.remove_handler(h), 2);
    assert_eq!(doc.listener_count(body, EventType::Click), 0);
}
