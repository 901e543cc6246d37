//! Widget configuration and input documents
//!
//! Everything here deserializes from the camelCase JSON a host hands over:
//! `{ "rawText": ..., "ranges": [...], "options": [...], "config": {...} }`.

use marker_core::RangeInput;
use marker_dom::{DOMRect, InlineMetrics};
use serde::{Deserialize, Serialize};

/// Colours cycled through by range index
pub const DEFAULT_PALETTE: [&str; 6] = ["#607AE3", "#FD4A4A", "#31CCB9", "#FE9A35", "#8F68DF", "#45C26A"];

/// Box of the annotated paragraph, in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ContainerBox {
    fn default() -> Self {
        Self { left: 20.0, top: 40.0, width: 400.0, height: 200.0 }
    }
}

impl From<ContainerBox> for DOMRect {
    fn from(b: ContainerBox) -> Self {
        DOMRect::from_xywh(b.left, b.top, b.width, b.height)
    }
}

/// Viewport size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024.0, height: 768.0 }
    }
}

/// Widget configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerConfig {
    /// Range colours, picked by `index % palette.len()`
    pub palette: Vec<String>,
    /// Text of the "add" action in the popover
    pub add_label: String,
    /// Only entry of a dropdown without options
    pub empty_label: String,
    pub char_width: f64,
    pub line_height: f64,
    pub container: ContainerBox,
    pub viewport: Viewport,
    /// Gap between a range and its popover
    pub popover_offset: f64,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let metrics = InlineMetrics::default();
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            add_label: "Add mark".to_string(),
            empty_label: "No data".to_string(),
            char_width: metrics.char_width,
            line_height: metrics.line_height,
            container: ContainerBox::default(),
            viewport: Viewport::default(),
            popover_offset: 10.0,
        }
    }
}

impl MarkerConfig {
    /// Colour of the range at `index`
    pub fn color(&self, index: usize) -> &str {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()];
        }
        &self.palette[index % self.palette.len()]
    }

    pub fn metrics(&self) -> InlineMetrics {
        InlineMetrics { char_width: self.char_width, line_height: self.line_height }
    }
}

/// Label vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOption {
    pub label: String,
    pub value: String,
}

impl MarkOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// Everything needed to mount a widget
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerDocument {
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub ranges: Vec<RangeInput>,
    #[serde(default)]
    pub options: Vec<MarkOption>,
    #[serde(default)]
    pub config: MarkerConfig,
}

impl MarkerDocument {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let doc = MarkerDocument::from_json(r#"{"rawText": "abc", "config": {"addLabel": "Tag"}}"#).unwrap();
        assert_eq!(doc.raw_text, "abc");
        assert!(doc.ranges.is_empty());
        assert_eq!(doc.config.add_label, "Tag");
        assert_eq!(doc.config.empty_label, "No data");
        assert_eq!(doc.config.palette.len(), 6);
        assert_eq!(doc.config.container, ContainerBox::default());
    }

    #[test]
    fn test_ranges_keep_raw_values() {
        let doc = MarkerDocument::from_json(
            r#"{"rawText": "abcdef", "ranges": [{"start": 1, "end": "x"}], "options": [{"label": "L", "value": "v"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.ranges[0].end, serde_json::json!("x"));
        assert_eq!(doc.ranges[0].data, "");
        assert_eq!(doc.options, vec![MarkOption::new("L", "v")]);
    }

    #[test]
    fn test_color_cycles() {
        let mut config = MarkerConfig::default();
        assert_eq!(config.color(0), "#607AE3");
        assert_eq!(config.color(7), "#FD4A4A");
        config.palette.clear();
        assert_eq!(config.color(2), "#31CCB9");
    }
}
