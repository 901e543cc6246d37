//! Anchored positioning
//!
//! The positioning contract consumed by floating panels, and
//! `AnchoredPositioner`, the default implementation. All rectangles are in
//! viewport (client) coordinates.

use marker_dom::{DOMRect, Document, NodeId};
use smol::future::Boxed;

/// Preferred side and alignment of the floating element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Above, centred
    #[default]
    Top,
    /// Above, left edges aligned
    TopStart,
    /// Below, centred
    Bottom,
    /// Below, left edges aligned
    BottomStart,
}

impl Placement {
    pub fn is_top(&self) -> bool {
        matches!(self, Placement::Top | Placement::TopStart)
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Placement::TopStart | Placement::BottomStart)
    }

    /// Same alignment on the opposite side
    pub fn flipped(&self) -> Placement {
        match self {
            Placement::Top => Placement::Bottom,
            Placement::TopStart => Placement::BottomStart,
            Placement::Bottom => Placement::Top,
            Placement::BottomStart => Placement::TopStart,
        }
    }
}

/// Constraint strategies
///
/// They are applied in a fixed order regardless of list order: inline,
/// offset, flip, shift, arrow, hide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Middleware {
    /// Gap between reference and floating element
    Offset(f64),
    /// Move to the opposite side when the preferred one overflows the viewport
    Flip,
    /// Slide along the side to stay inside the viewport
    Shift { padding: f64 },
    /// Report whether the reference is clipped out of view
    Hide,
    /// Compute where an arrow of `size` must sit to point at the reference
    Arrow { size: f64 },
    /// Anchor to the nearest line box of an inline reference
    Inline,
}

/// Floating element size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Input of a position computation
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRequest {
    /// Bounding box of the reference
    pub reference: DOMRect,
    /// Line boxes of the reference (for `Middleware::Inline`)
    pub reference_rects: Vec<DOMRect>,
    pub floating: Size,
    pub viewport: DOMRect,
    /// Visible part of the page around the reference; `None` when every
    /// ancestor clip leaves nothing visible
    pub clip: Option<DOMRect>,
    pub placement: Placement,
    pub middleware: Vec<Middleware>,
}

/// Output of a position computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionResult {
    pub x: f64,
    pub y: f64,
    /// Placement after flipping
    pub placement: Placement,
    pub reference_hidden: bool,
    /// Arrow position from the floating element's left edge
    pub arrow_offset: Option<f64>,
}

/// Anchored-positioning service
pub trait PositionService {
    /// Compute where the floating element goes; the result may arrive later
    fn compute_position(&self, request: PositionRequest) -> Boxed<PositionResult>;

    /// Ancestors whose scroll or resize can move `node`, ending with the
    /// viewport (`NodeId::ROOT`)
    fn scroll_parents(&self, doc: &Document, node: NodeId) -> Vec<NodeId> {
        doc.scroll_parents(node)
    }
}

/// Default positioning service
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchoredPositioner;

impl AnchoredPositioner {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous position computation
    pub fn compute(&self, request: &PositionRequest) -> PositionResult {
        let offset = request.middleware.iter().find_map(|m| match m {
            Middleware::Offset(d) => Some(*d),
            _ => None,
        }).unwrap_or(0.0);

        let mut placement = request.placement;
        let mut reference = anchor_rect(request, placement);
        let mut floating = place(&reference, request.floating, placement, offset);

        if request.middleware.contains(&Middleware::Flip) {
            let overflow = side_overflow(&floating, &request.viewport, placement);
            if overflow > 0.0 {
                let alternative = placement.flipped();
                let alt_reference = anchor_rect(request, alternative);
                let alt_floating = place(&alt_reference, request.floating, alternative, offset);
                if side_overflow(&alt_floating, &request.viewport, alternative) < overflow {
                    tracing::trace!("Flipping {:?} to {:?}", placement, alternative);
                    placement = alternative;
                    reference = alt_reference;
                    floating = alt_floating;
                }
            }
        }

        if let Some(padding) = request.middleware.iter().find_map(|m| match m {
            Middleware::Shift { padding } => Some(*padding),
            _ => None,
        }) {
            let min_x = request.viewport.left() + padding;
            let max_x = request.viewport.right() - padding - floating.width;
            floating.x = if max_x < min_x { min_x } else { floating.x.clamp(min_x, max_x) };
        }

        let arrow_offset = request.middleware.iter().find_map(|m| match m {
            Middleware::Arrow { size } => {
                let max = (floating.width - size).max(0.0);
                Some((reference.center_x() - floating.x - size / 2.0).clamp(0.0, max))
            }
            _ => None,
        });

        let reference_hidden = request.middleware.contains(&Middleware::Hide)
            && !request.clip
                .and_then(|clip| clip.intersection(&request.reference))
                .is_some_and(|visible| !visible.is_empty());

        PositionResult {
            x: floating.x,
            y: floating.y,
            placement,
            reference_hidden,
            arrow_offset,
        }
    }
}

impl PositionService for AnchoredPositioner {
    fn compute_position(&self, request: PositionRequest) -> Boxed<PositionResult> {
        let result = self.compute(&request);
        Box::pin(async move { result })
    }
}

/// Reference rectangle to anchor to: with `Inline`, the first line box for
/// top placements and the last one for bottom placements
fn anchor_rect(request: &PositionRequest, placement: Placement) -> DOMRect {
    let inline = request.middleware.contains(&Middleware::Inline);
    if !inline || request.reference_rects.len() < 2 {
        return request.reference;
    }
    let line = if placement.is_top() {
        request.reference_rects.first()
    } else {
        request.reference_rects.last()
    };
    line.copied().unwrap_or(request.reference)
}

fn place(reference: &DOMRect, size: Size, placement: Placement, offset: f64) -> DOMRect {
    let x = if placement.is_start() {
        reference.left()
    } else {
        reference.center_x() - size.width / 2.0
    };
    let y = if placement.is_top() {
        reference.top() - size.height - offset
    } else {
        reference.bottom() + offset
    };
    DOMRect::from_xywh(x, y, size.width, size.height)
}

/// How far the floating rect sticks out of the viewport on its own side
fn side_overflow(floating: &DOMRect, viewport: &DOMRect, placement: Placement) -> f64 {
    if placement.is_top() {
        viewport.top() - floating.top()
    } else {
        floating.bottom() - viewport.bottom()
    }
}
