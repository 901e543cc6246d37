//! text-marker
//!
//! Text annotation widget. Users select text in a paragraph, pick a label
//! from a dropdown and click labelled spans to remove them. `TextMarker`
//! composes the annotation engine (`marker_core::TextSelection`) with the
//! floating panels of `marker_float` over one headless document.

mod config;
mod marker;
mod state;

pub use config::{ContainerBox, MarkOption, MarkerConfig, MarkerDocument, Viewport, DEFAULT_PALETTE};
pub use marker::{MarkerEvent, MarkerEventKind, TextMarker};
pub use state::{EditMode, EditState};

use marker_core::MarkerError;
use marker_dom::DomError;
use marker_float::FloatError;

/// Widget error
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error(transparent)]
    Marker(#[from] MarkerError),

    #[error(transparent)]
    Float(#[from] FloatError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Widget has been destroyed")]
    Destroyed,
}

pub type WidgetResult<T> = Result<T, WidgetError>;
