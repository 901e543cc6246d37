//! Range model
//!
//! Offsets are character (`char`) indices into the raw text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValidationError;

/// Stable identity of a range within one `TextSelection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RangeId(pub(crate) u64);

/// An annotated run of the raw text
///
/// Equality compares content (`start`, `end`, `text`, `data`), not identity.
#[derive(Debug, Clone, Serialize)]
pub struct TextRange {
    #[serde(skip)]
    pub id: RangeId,
    pub start: usize,
    pub end: usize,
    /// `rawText[start..end]`
    pub text: String,
    /// Label value; empty while the range is provisional
    pub data: String,
}

impl TextRange {
    /// Whether the range still waits for a label
    pub fn is_provisional(&self) -> bool {
        self.data.is_empty()
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl PartialEq for TextRange {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.text == other.text
            && self.data == other.data
    }
}

impl Eq for TextRange {}

/// Host-supplied range, as it arrives from props
///
/// `start` and `end` are kept as raw JSON values so that non-numeric input
/// is reported by validation instead of failing deserialization. Extra
/// fields (such as a stale `text`) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeInput {
    pub start: Value,
    pub end: Value,
    #[serde(default)]
    pub data: String,
}

impl RangeInput {
    pub fn new(start: usize, end: usize, data: impl Into<String>) -> Self {
        Self {
            start: Value::from(start),
            end: Value::from(end),
            data: data.into(),
        }
    }

    /// Whether this input describes `range` (offsets and label)
    pub fn matches(&self, range: &TextRange) -> bool {
        offset_value(&self.start) == Some(range.start)
            && offset_value(&self.end) == Some(range.end)
            && self.data == range.data
    }
}

impl From<&TextRange> for RangeInput {
    fn from(range: &TextRange) -> Self {
        Self::new(range.start, range.end, range.data.clone())
    }
}

/// A range addressed by list position or by identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRef {
    Index(usize),
    Id(RangeId),
}

impl From<usize> for RangeRef {
    fn from(index: usize) -> Self {
        RangeRef::Index(index)
    }
}

impl From<RangeId> for RangeRef {
    fn from(id: RangeId) -> Self {
        RangeRef::Id(id)
    }
}

impl From<&TextRange> for RangeRef {
    fn from(range: &TextRange) -> Self {
        RangeRef::Id(range.id)
    }
}

/// Box of a range relative to its container
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Char-indexed view of a string
#[derive(Debug, Clone)]
pub struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of every char boundary, including the end
    boundaries: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Characters `[start, end)`, clamped to the text
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let last = self.char_len();
        let end = end.min(last);
        let start = start.min(end);
        &self.text[self.boundaries[start]..self.boundaries[end]]
    }
}

fn offset_value(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64).then_some(f as usize)
}

fn offset_field(index: usize, field: &'static str, value: &Value) -> Result<usize, ValidationError> {
    if !value.is_number() {
        return Err(ValidationError::NotNumeric { index, field });
    }
    offset_value(value).ok_or(ValidationError::NotOffset { index, field })
}

/// Check host-supplied ranges against a text of `len` characters
///
/// Accepts only in-bounds, non-empty ranges in ascending, non-overlapping
/// order. Returns `(start, end, data)` triples.
pub fn validate_ranges(len: usize, inputs: &[RangeInput]) -> Result<Vec<(usize, usize, String)>, ValidationError> {
    let mut out: Vec<(usize, usize, String)> = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let start = offset_field(index, "start", &input.start)?;
        let end = offset_field(index, "end", &input.end)?;
        if start >= end {
            return Err(ValidationError::Empty { index, start, end });
        }
        if end > len {
            return Err(ValidationError::OutOfBounds { index, end, len });
        }
        if let Some((prev_start, prev_end, _)) = out.last() {
            if start < *prev_start {
                return Err(ValidationError::Unordered { index, start });
            }
            if start < *prev_end {
                return Err(ValidationError::Overlap { index, start, end });
            }
        }
        out.push((start, end, input.data.clone()));
    }
    Ok(out)
}
