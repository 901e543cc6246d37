//! Editing state of the widget

use marker_core::RangeId;

/// What the popover is offering for the range being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// A fresh selection waiting for a label
    Add,
    /// A labelled range that can be removed
    Remove,
}

/// `Idle` until a selection or a span click, back to `Idle` once a label is
/// chosen, the range is removed or the user clicks elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing { range: RangeId, mode: EditMode },
}

impl EditState {
    /// Range being edited
    pub fn range(&self) -> Option<RangeId> {
        match self {
            EditState::Idle => None,
            EditState::Editing { range, .. } => Some(*range),
        }
    }

    pub fn mode(&self) -> Option<EditMode> {
        match self {
            EditState::Idle => None,
            EditState::Editing { mode, .. } => Some(*mode),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, EditState::Idle)
    }
}
