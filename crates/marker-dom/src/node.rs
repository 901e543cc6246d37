//! DOM Node
//!
//! Nodes link to each other through `NodeId`s instead of pointers, so the
//! whole tree lives in one `Vec` and handles stay `Copy`.

use crate::NodeId;
use crate::geometry::DOMRect;

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
    /// Border box in document coordinates, set by layout or by the host
    pub layout: Option<DOMRect>,
    /// Per-line boxes for inline content (empty for block boxes)
    pub fragments: Vec<DOMRect>,
}

impl Node {
    fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
            layout: None,
            fragments: Vec::new(),
        }
    }

    /// Create a new element node
    pub fn element(tag: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a new text node
    pub fn text(content: String) -> Self {
        Self::with_data(NodeData::Text(content))
    }

    /// Create a comment node
    pub fn comment(content: String) -> Self {
        Self::with_data(NodeData::Comment(content))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    pub(crate) fn vacant() -> Self {
        Self::with_data(NodeData::Vacant)
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    #[inline]
    pub(crate) fn is_vacant(&self) -> bool {
        matches!(self.data, NodeData::Vacant)
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Check for an element with the given (lowercase) tag name
    pub fn is_tag(&self, tag: &str) -> bool {
        self.as_element().is_some_and(|e| e.tag == tag)
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
    /// Freed arena slot waiting for reuse
    Vacant,
}

/// Element-specific data
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Tag name (lowercase)
    pub tag: String,
    /// Attributes in insertion order
    pub attrs: Vec<Attribute>,
    /// Cached class list
    pub classes: Vec<String>,
    /// Scroll container state
    pub scroll: ScrollState,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing value
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if name == "class" {
            self.classes = value.split_whitespace().map(str::to_owned).collect();
        }
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value;
            return;
        }
        self.attrs.push(Attribute { name: name.to_owned(), value });
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|a| a.name == name)?;
        if name == "class" {
            self.classes.clear();
        }
        Some(self.attrs.remove(index).value)
    }

    /// Check the cached class list
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Scroll offsets of an element
///
/// Only elements flagged `scrollable` take part in ancestor-scroll discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollState {
    pub scrollable: bool,
    pub left: f64,
    pub top: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_replace() {
        let mut elem = ElementData::new("SPAN");
        assert_eq!(elem.tag, "span");

        elem.set_attr("data-index", "0");
        elem.set_attr("data-index", "3");
        assert_eq!(elem.get_attr("data-index"), Some("3"));
        assert_eq!(elem.attrs.len(), 1);
    }

    #[test]
    fn test_class_cache() {
        let mut elem = ElementData::new("div");
        elem.set_attr("class", "popover  dark");
        assert!(elem.has_class("popover"));
        assert!(elem.has_class("dark"));

        elem.remove_attr("class");
        assert!(!elem.has_class("popover"));
    }
}
