//! Inline layout
//!
//! A fixed-pitch line breaker for flow roots (the annotation container): every
//! character is `char_width` wide, lines are `line_height` tall and wrap at the
//! right edge of the root's box. It assigns `layout` and per-line `fragments`
//! to every descendant so geometry queries behave like `getBoundingClientRect`
//! and `getClientRects` on real inline content.

use crate::{DOMRect, DomTree, NodeId};

/// Character metrics for inline layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InlineMetrics {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for InlineMetrics {
    fn default() -> Self {
        Self { char_width: 8.0, line_height: 20.0 }
    }
}

struct Cursor {
    x: f64,
    y: f64,
    left: f64,
    right: f64,
    lines: usize,
}

impl Cursor {
    fn break_line(&mut self, metrics: &InlineMetrics) {
        self.x = self.left;
        self.y += metrics.line_height;
        self.lines += 1;
    }
}

/// Lay out the inline content of `root`, returning the number of lines
pub fn layout_inline(tree: &mut DomTree, root: NodeId, metrics: InlineMetrics) -> usize {
    let Some(bounds) = tree.get(root).and_then(|n| n.layout) else {
        tracing::warn!("Flow root {} has no box, skipping layout", root);
        return 0;
    };
    let mut cursor = Cursor {
        x: bounds.x,
        y: bounds.y,
        left: bounds.x,
        right: bounds.right(),
        lines: 1,
    };
    let children: Vec<NodeId> = tree.children(root).map(|(id, _)| id).collect();
    for child in children {
        flow(tree, child, &mut cursor, &metrics);
    }
    tracing::trace!("Inline layout of {}: {} lines", root, cursor.lines);
    cursor.lines
}

fn flow(tree: &mut DomTree, id: NodeId, cursor: &mut Cursor, metrics: &InlineMetrics) -> Vec<DOMRect> {
    let text = tree.get(id).and_then(|n| n.as_text()).map(str::to_owned);
    let fragments = match text {
        Some(text) => flow_text(&text, cursor, metrics),
        None => {
            let children: Vec<NodeId> = tree.children(id).map(|(c, _)| c).collect();
            let mut fragments = Vec::new();
            for child in children {
                fragments.extend(flow(tree, child, cursor, metrics));
            }
            merge_lines(fragments)
        }
    };

    let layout = fragments.iter()
        .copied()
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| DOMRect::from_xywh(cursor.x, cursor.y, 0.0, metrics.line_height));
    if let Some(node) = tree.get_mut(id) {
        node.layout = Some(layout);
        node.fragments = fragments.clone();
    }
    fragments
}

fn flow_text(text: &str, cursor: &mut Cursor, metrics: &InlineMetrics) -> Vec<DOMRect> {
    let mut fragments: Vec<DOMRect> = Vec::new();
    for ch in text.chars() {
        if ch == '\n' {
            cursor.break_line(metrics);
            continue;
        }
        if cursor.x + metrics.char_width > cursor.right && cursor.x > cursor.left {
            cursor.break_line(metrics);
        }
        let glyph = DOMRect::from_xywh(cursor.x, cursor.y, metrics.char_width, metrics.line_height);
        match fragments.last_mut() {
            Some(last) if last.y == glyph.y => *last = last.union(&glyph),
            _ => fragments.push(glyph),
        }
        cursor.x += metrics.char_width;
    }
    fragments
}

fn merge_lines(fragments: Vec<DOMRect>) -> Vec<DOMRect> {
    let mut merged: Vec<DOMRect> = Vec::with_capacity(fragments.len());
    for frag in fragments {
        match merged.last_mut() {
            Some(last) if last.y == frag.y => *last = last.union(&frag),
            _ => merged.push(frag),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(tree: &mut DomTree, width: f64) -> NodeId {
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p).unwrap();
        tree.get_mut(p).unwrap().layout = Some(DOMRect::from_xywh(10.0, 100.0, width, 200.0));
        p
    }

    #[test]
    fn test_single_line_boxes() {
        let mut tree = DomTree::new();
        let p = paragraph(&mut tree, 400.0);
        let a = tree.create_text("ab");
        let span = tree.create_element("span");
        let b = tree.create_text("cde");
        tree.append_child(p, a).unwrap();
        tree.append_child(p, span).unwrap();
        tree.append_child(span, b).unwrap();

        let lines = layout_inline(&mut tree, p, InlineMetrics::default());
        assert_eq!(lines, 1);
        assert_eq!(tree.get(span).unwrap().layout, Some(DOMRect::from_xywh(26.0, 100.0, 24.0, 20.0)));
    }

    #[test]
    fn test_wrapping_span_has_two_fragments() {
        let mut tree = DomTree::new();
        // four characters per line
        let p = paragraph(&mut tree, 32.0);
        let a = tree.create_text("abc");
        let span = tree.create_element("span");
        let b = tree.create_text("def");
        tree.append_child(p, a).unwrap();
        tree.append_child(p, span).unwrap();
        tree.append_child(span, b).unwrap();

        layout_inline(&mut tree, p, InlineMetrics::default());
        let node = tree.get(span).unwrap();
        assert_eq!(node.fragments.len(), 2);
        assert_eq!(node.fragments[0], DOMRect::from_xywh(34.0, 100.0, 8.0, 20.0));
        assert_eq!(node.fragments[1], DOMRect::from_xywh(10.0, 120.0, 16.0, 20.0));
        assert_eq!(node.layout, Some(DOMRect::from_xywh(10.0, 100.0, 32.0, 40.0)));
    }

    #[test]
    fn test_newline_breaks() {
        let mut tree = DomTree::new();
        let p = paragraph(&mut tree, 400.0);
        let a = tree.create_text("ab\ncd");
        tree.append_child(p, a).unwrap();

        assert_eq!(layout_inline(&mut tree, p, InlineMetrics::default()), 2);
        assert_eq!(tree.get(a).unwrap().fragments.len(), 2);
    }
}
