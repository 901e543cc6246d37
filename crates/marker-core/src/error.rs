//! Error types

use marker_dom::DomError;
use marker_html::HtmlError;

/// Malformed range supplied to `init` or `insert_range`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("range {index}: `{field}` must be a number")]
    NotNumeric { index: usize, field: &'static str },

    #[error("range {index}: `{field}` must be a non-negative integer")]
    NotOffset { index: usize, field: &'static str },

    #[error("range {index}: [{start}, {end}) is empty or inverted")]
    Empty { index: usize, start: usize, end: usize },

    #[error("range {index}: end {end} exceeds text length {len}")]
    OutOfBounds { index: usize, end: usize, len: usize },

    #[error("range {index}: start {start} comes before the previous range")]
    Unordered { index: usize, start: usize },

    #[error("range {index}: [{start}, {end}) overlaps another range")]
    Overlap { index: usize, start: usize, end: usize },
}

/// Errors raised by `TextSelection`
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to render markup: {0}")]
    Html(#[from] HtmlError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

pub type MarkerResult<T> = Result<T, MarkerError>;
