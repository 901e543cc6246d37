//! HTML5 fragment parsing
//!
//! Markup is parsed with html5ever into an `RcDom` and converted into the
//! target `DomTree`. Unlike whole-document parsing, whitespace-only text is
//! kept: in annotated text every character is content.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use marker_dom::{DomTree, NodeId};

use crate::HtmlError;

/// HTML5 parser
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse `html` as body content and append the resulting nodes to
    /// `parent`. Returns the number of top-level nodes appended.
    pub fn parse_fragment(&self, html: &str, tree: &mut DomTree, parent: NodeId) -> Result<usize, HtmlError> {
        let mut source = String::with_capacity(html.len() + 6);
        source.push_str("<body>");
        source.push_str(html);

        let dom = parse_document(RcDom::default(), Default::default()).one(source);

        let body = find_element(&dom.document, "body").ok_or(HtmlError::MissingBody)?;
        let mut appended = 0;
        for child in body.children.borrow().iter() {
            if convert_node(child, tree, parent)? {
                appended += 1;
            }
        }
        tracing::trace!("Parsed fragment into {}: {} top-level nodes", parent, appended);
        Ok(appended)
    }
}

/// `element.innerHTML = html`: drop the current children of `node` and
/// replace them with the parsed markup
pub fn set_inner_html(tree: &mut DomTree, node: NodeId, html: &str) -> Result<usize, HtmlError> {
    tree.clear_children(node)?;
    HtmlParser::new().parse_fragment(html, tree, node)
}

fn find_element(handle: &Handle, local: &str) -> Option<Handle> {
    if let RcNodeData::Element { name, .. } = &handle.data {
        if &*name.local == local {
            return Some(handle.clone());
        }
    }
    handle.children.borrow().iter().find_map(|child| find_element(child, local))
}

/// Convert one RcDom node (and its subtree); returns whether a node was appended
fn convert_node(handle: &Handle, tree: &mut DomTree, parent: NodeId) -> Result<bool, HtmlError> {
    match &handle.data {
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if text.is_empty() {
                return Ok(false);
            }
            let id = tree.create_text(&text);
            tree.append_child(parent, id)?;
            Ok(true)
        }
        RcNodeData::Comment { contents } => {
            let id = tree.create_comment(&contents.to_string());
            tree.append_child(parent, id)?;
            Ok(true)
        }
        RcNodeData::Element { name, attrs, .. } => {
            let id = tree.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                tree.set_attr(id, &attr.name.local, attr.value.to_string())?;
            }
            tree.append_child(parent, id)?;
            for child in handle.children.borrow().iter() {
                convert_node(child, tree, id)?;
            }
            Ok(true)
        }
        RcNodeData::Document
        | RcNodeData::Doctype { .. }
        | RcNodeData::ProcessingInstruction { .. } => Ok(false),
    }
}
