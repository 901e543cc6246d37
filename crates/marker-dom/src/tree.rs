//! DOM Tree (arena-based allocation)
//!
//! Removed subtrees are returned to a free list and their slots reused, so a
//! `NodeId` held across a re-render may point at an unrelated node.

use crate::{DomError, DomResult, Node, NodeId};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            free: Vec::new(),
        }
    }

    /// Root (document) node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            id
        } else {
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(node);
            id
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(Node::text(content.to_owned()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.alloc(Node::comment(content.to_owned()))
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).filter(|n| !n.is_vacant())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).filter(|n| !n.is_vacant())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    /// Number of live nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Check if tree is empty (never true: the document node always exists)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Previous sibling of a node
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.prev_sibling).filter(|p| p.is_valid())
    }

    /// Next sibling of a node
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.next_sibling).filter(|p| p.is_valid())
    }

    /// Check whether `ancestor` is `node` or one of its ancestors
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Check whether the node is attached under the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.contains(NodeId::ROOT, id)
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Append `child` as last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        let parent_node = self.node(parent)?;
        if parent_node.is_text() {
            return Err(DomError::InvalidNodeType(parent));
        }
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        self.detach(child)?;

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
        Ok(child)
    }

    /// Unlink a node from its parent and siblings; the subtree stays alive
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let node = self.node(id)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return Ok(());
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
        Ok(())
    }

    /// Detach a node and free its whole subtree
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        if id == NodeId::ROOT {
            return Err(DomError::InvalidNodeType(id));
        }
        self.detach(id)?;
        self.release(id);
        Ok(())
    }

    /// Free every child of a node (`innerHTML = ""`)
    pub fn clear_children(&mut self, id: NodeId) -> DomResult<()> {
        self.node(id)?;
        let children: Vec<NodeId> = self.children(id).map(|(child, _)| child).collect();
        for child in children {
            self.release(child);
        }
        let node = &mut self.nodes[id.index()];
        node.first_child = NodeId::NONE;
        node.last_child = NodeId::NONE;
        Ok(())
    }

    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current).map(|(child, _)| child));
            self.nodes[current.index()] = Node::vacant();
            self.free.push(current);
        }
    }

    /// Iterate over the children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Children { tree: self, next }
    }

    /// Pre-order list of descendants (excluding `id` itself)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).map(|(c, _)| c).collect();
        stack.reverse();
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut kids: Vec<NodeId> = self.children(current).map(|(c, _)| c).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// First descendant (pre-order) matching a predicate
    pub fn find_descendant(&self, id: NodeId, pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .find(|d| self.get(*d).is_some_and(&pred))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_owned();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.get(d).and_then(Node::as_text))
            .collect()
    }

    /// Attribute value of an element
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    /// Set an attribute on an element
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> DomResult<()> {
        let elem = self.get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType(id))?;
        elem.set_attr(name, value);
        Ok(())
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_siblings() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let a = tree.create_text("a");
        let b = tree.create_element("span");
        tree.append_child(tree.root(), p).unwrap();
        tree.append_child(p, a).unwrap();
        tree.append_child(p, b).unwrap();

        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.children(p).count(), 2);
        assert!(tree.is_connected(b));
    }

    #[test]
    fn test_hierarchy_errors() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        let text = tree.create_text("x");
        tree.append_child(outer, inner).unwrap();

        assert_eq!(
            tree.append_child(inner, outer),
            Err(DomError::HierarchyRequest { parent: inner, child: outer })
        );
        assert_eq!(tree.append_child(text, inner), Err(DomError::InvalidNodeType(text)));
    }

    #[test]
    fn test_clear_children_recycles_slots() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p).unwrap();
        for _ in 0..3 {
            let t = tree.create_text("x");
            tree.append_child(p, t).unwrap();
        }
        let before = tree.len();

        tree.clear_children(p).unwrap();
        assert_eq!(tree.len(), before - 3);
        assert_eq!(tree.children(p).count(), 0);

        let reused = tree.create_text("y");
        assert!(reused.index() < before);
    }

    #[test]
    fn test_text_content() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let a = tree.create_text("ab");
        let span = tree.create_element("span");
        let c = tree.create_text("cd");
        tree.append_child(p, a).unwrap();
        tree.append_child(p, span).unwrap();
        tree.append_child(span, c).unwrap();

        assert_eq!(tree.text_content(p), "abcd");
    }
}
