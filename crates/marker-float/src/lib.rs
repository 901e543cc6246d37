//! text-marker floating panels
//!
//! A `FloatingController` mounts a panel into the document, anchors it to a
//! reference element through a `PositionService` and keeps it anchored while
//! scroll containers move. `Popover` and `DropdownMenu` are the two panels
//! the annotation widget uses.

mod controller;
mod dropdown;
mod popover;
pub mod position;

pub use controller::{FloatingController, PanelEvent, PanelSpec, PositionTicket};
pub use dropdown::{DropdownMenu, MenuItem};
pub use popover::{Popover, PopoverAction};
pub use position::{
    AnchoredPositioner, Middleware, Placement, PositionRequest, PositionResult, PositionService, Size,
};

use marker_dom::DomError;
use marker_html::HtmlError;

/// Panel mounting error
#[derive(Debug, thiserror::Error)]
pub enum FloatError {
    #[error("Failed to mount panel content: {0}")]
    Html(#[from] HtmlError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

pub type FloatResult<T> = Result<T, FloatError>;
