//! text-marker core
//!
//! The annotation engine: an ordered list of non-overlapping character
//! ranges over a raw text, rendered as `<span>` markup into a container
//! element of a `marker_dom::Document`, with native selections converted
//! into new ranges and geometry queries for anchoring menus.

mod emitter;
mod error;
mod range;
mod render;
mod selection;

pub use emitter::{EventEmitter, ListenerId};
pub use error::{MarkerError, MarkerResult, ValidationError};
pub use range::{validate_ranges, Position, RangeId, RangeInput, RangeRef, TextIndex, TextRange};
pub use render::render_markup;
pub use selection::{SelectionEvent, SelectionEventKind, TextSelection};
