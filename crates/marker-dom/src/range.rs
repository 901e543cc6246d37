//! Range and Selection API
//!
//! Range represents a contiguous part of the document.
//! Selection represents the user's text selection.
//!
//! Offsets inside text nodes are counted in `char`s.

use crate::NodeId;

/// Range boundary point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPoint {
    /// The container node
    pub node: NodeId,
    /// Offset within the container (character offset for text, child index for elements)
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Range - a contiguous part of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: BoundaryPoint,
    end: BoundaryPoint,
}

impl Range {
    /// Create a new range at the given position (collapsed)
    pub fn new(container: NodeId, offset: usize) -> Self {
        let point = BoundaryPoint::new(container, offset);
        Self { start: point, end: point }
    }

    /// Create a range between two points
    ///
    /// Within one container the offsets are normalized so `start <= end`,
    /// as for a backwards drag.
    pub fn between(
        start_container: NodeId,
        start_offset: usize,
        end_container: NodeId,
        end_offset: usize,
    ) -> Self {
        let mut start = BoundaryPoint::new(start_container, start_offset);
        let mut end = BoundaryPoint::new(end_container, end_offset);
        if start.node == end.node && end.offset < start.offset {
            std::mem::swap(&mut start, &mut end);
        }
        Self { start, end }
    }

    /// Get the start container
    pub fn start_container(&self) -> NodeId {
        self.start.node
    }

    /// Get the start offset
    pub fn start_offset(&self) -> usize {
        self.start.offset
    }

    /// Get the end container
    pub fn end_container(&self) -> NodeId {
        self.end.node
    }

    /// Get the end offset
    pub fn end_offset(&self) -> usize {
        self.end.offset
    }

    /// Check if the range is collapsed
    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Collapse the range to one of its boundaries
    pub fn collapse(&mut self, to_start: bool) {
        if to_start {
            self.end = self.start;
        } else {
            self.start = self.end;
        }
    }
}

/// Selection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionType {
    #[default]
    None,
    Caret,
    Range,
}

/// Selection - the current selection in the document
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ranges: Vec<Range>,
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ranges (0 or 1)
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Range at index
    pub fn range_at(&self, index: usize) -> Option<&Range> {
        self.ranges.get(index)
    }

    /// Replace the selection with a single range
    pub fn set_range(&mut self, range: Range) {
        self.ranges.clear();
        self.ranges.push(range);
    }

    /// Remove all ranges
    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
    }

    /// Is the selection collapsed (or empty)?
    pub fn is_collapsed(&self) -> bool {
        self.ranges.first().is_none_or(Range::collapsed)
    }

    /// Selection type
    pub fn selection_type(&self) -> SelectionType {
        match self.ranges.first() {
            None => SelectionType::None,
            Some(r) if r.collapsed() => SelectionType::Caret,
            Some(_) => SelectionType::Range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_normalizes_backwards_drag() {
        let node = NodeId(3);
        let range = Range::between(node, 7, node, 2);
        assert_eq!(range.start_offset(), 2);
        assert_eq!(range.end_offset(), 7);
        assert!(!range.collapsed());
    }

    #[test]
    fn test_selection_type() {
        let mut sel = Selection::new();
        assert_eq!(sel.selection_type(), SelectionType::None);
        assert!(sel.is_collapsed());

        sel.set_range(Range::new(NodeId(1), 4));
        assert_eq!(sel.selection_type(), SelectionType::Caret);

        sel.set_range(Range::between(NodeId(1), 0, NodeId(1), 4));
        assert_eq!(sel.selection_type(), SelectionType::Range);
        assert_eq!(sel.range_count(), 1);

        sel.remove_all_ranges();
        assert!(sel.range_at(0).is_none());
    }
}
