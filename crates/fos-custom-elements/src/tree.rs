//! DOM Tree (arena-based allocation)
//!
//! Generational arena: freeing a slot bumps its generation, so stale
//! [`NodeId`]s resolve to nothing instead of to the slot's next occupant.
//!
//! Reads are public. Mutations are crate-private: the only way to change
//! the tree from outside is through [`Realm`](crate::Realm), which wraps
//! every change in a reaction frame.

use crate::node::{Attribute, ElementData, Node, NodeData, NodeType};
use crate::{DomError, DomResult, NodeId, TraversalOrder};

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-based DOM tree
#[derive(Debug, Default)]
pub struct DomTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    fn free(&mut self, id: NodeId) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.node.is_some() => {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(id.index);
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound)
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound)
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes in the tree
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.local_name.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.get(id)
            .and_then(Node::as_element)
            .map(|e| e.attrs.as_slice())
            .unwrap_or(&[])
    }

    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.as_element()?.shadow_root
    }

    /// Host element of a shadow root
    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        match self.get(id)?.data {
            NodeData::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    /// Owning document; a document owns itself
    pub fn owner_document(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        match node.data {
            NodeData::Document => Some(id),
            _ => node.owner,
        }
    }

    /// Shadow-including root: parents are followed, and shadow roots
    /// continue at their host
    pub fn root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(node) = self.get(current) {
            current = match (&node.data, node.parent) {
                (NodeData::ShadowRoot { host }, _) => *host,
                (_, Some(parent)) => parent,
                (_, None) => break,
            };
        }
        current
    }

    /// Whether the node's shadow-including root is a document
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(id) && matches!(self.node_type(self.root(id)), Some(NodeType::Document))
    }

    /// Whether `ancestor` is `node` or one of its shadow-including ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| match n.data {
                NodeData::ShadowRoot { host } => Some(host),
                _ => n.parent,
            });
        }
        false
    }

    /// Every node of the subtree rooted at `root`, shadow trees included,
    /// in preorder
    pub fn preorder(&self, root: NodeId, order: TraversalOrder) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];

        // LIFO: whatever is pushed last is visited first.
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push(id);
            let shadow = node.as_element().and_then(|e| e.shadow_root);
            match order {
                TraversalOrder::ShadowFirst => {
                    stack.extend(node.children.iter().rev());
                    stack.extend(shadow);
                }
                TraversalOrder::LightFirst => {
                    stack.extend(shadow);
                    stack.extend(node.children.iter().rev());
                }
            }
        }
        out
    }

    /// Elements of the subtree rooted at `root` in shadow-including preorder
    pub fn elements(&self, root: NodeId, order: TraversalOrder) -> Vec<NodeId> {
        let mut elements = self.preorder(root, order);
        elements.retain(|&id| self.get(id).is_some_and(Node::is_element));
        elements
    }

    pub(crate) fn create_document(&mut self) -> NodeId {
        self.alloc(Node::new(None, NodeData::Document))
    }

    pub(crate) fn create_element(&mut self, document: NodeId, local_name: &str) -> NodeId {
        self.alloc(Node::new(
            Some(document),
            NodeData::Element(ElementData::new(local_name)),
        ))
    }

    pub(crate) fn create_text(&mut self, document: NodeId, text: &str) -> NodeId {
        self.alloc(Node::new(Some(document), NodeData::Text(text.to_string())))
    }

    pub(crate) fn create_fragment(&mut self, document: NodeId) -> NodeId {
        self.alloc(Node::new(Some(document), NodeData::DocumentFragment))
    }

    pub(crate) fn attach_shadow(&mut self, host: NodeId) -> DomResult<NodeId> {
        let node = self.node(host)?;
        let element = node.as_element().ok_or(DomError::InvalidNodeType)?;
        if element.shadow_root.is_some() {
            return Err(DomError::InvalidState);
        }
        let owner = node.owner;
        let shadow = self.alloc(Node::new(owner, NodeData::ShadowRoot { host }));
        if let Some(element) = self.node_mut(host)?.as_element_mut() {
            element.shadow_root = Some(shadow);
        }
        Ok(shadow)
    }

    /// Check that `child` may be inserted into `parent` before `before`
    pub(crate) fn validate_insert(
        &self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        if matches!(parent_node.data, NodeData::Text(_)) {
            return Err(DomError::HierarchyRequest);
        }
        match self.node(child)?.data {
            NodeData::Document | NodeData::ShadowRoot { .. } => {
                return Err(DomError::HierarchyRequest)
            }
            _ => {}
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(before) = before {
            if !parent_node.children.contains(&before) {
                return Err(DomError::NotAChild);
            }
        }
        Ok(())
    }

    /// Link a detached `child` under `parent`, before `before` or last
    pub(crate) fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> DomResult<()> {
        self.validate_insert(parent, child, before)?;
        if matches!(self.node(child)?.data, NodeData::DocumentFragment) {
            return Err(DomError::InvalidNodeType);
        }
        if self.node(child)?.parent.is_some() {
            return Err(DomError::InvalidState);
        }

        let parent_node = self.node_mut(parent)?;
        match before.and_then(|b| parent_node.children.iter().position(|&c| c == b)) {
            Some(pos) => parent_node.children.insert(pos, child),
            None => parent_node.children.push(child),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlink `child` from its parent, returning the old parent
    pub(crate) fn detach(&mut self, child: NodeId) -> DomResult<Option<NodeId>> {
        let Some(parent) = self.node_mut(child)?.parent.take() else {
            return Ok(None);
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|&c| c != child);
        }
        Ok(Some(parent))
    }

    pub(crate) fn set_attribute(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        name: &str,
        value: &str,
    ) -> DomResult<Option<String>> {
        let element = self
            .node_mut(element)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        Ok(element.set_attr(namespace, name, value.to_string()))
    }

    pub(crate) fn remove_attribute(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        name: &str,
    ) -> DomResult<Option<String>> {
        let element = self
            .node_mut(element)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        Ok(element.remove_attr(namespace, name))
    }

    /// Reassign the owner document of every node in the subtree
    pub(crate) fn set_owner_document(&mut self, root: NodeId, document: NodeId) {
        for id in self.preorder(root, TraversalOrder::ShadowFirst) {
            if let Some(node) = self.get_mut(id) {
                if !matches!(node.data, NodeData::Document) {
                    node.owner = Some(document);
                }
            }
        }
    }

    /// Copy `source` (and its light descendants when `deep`) into `document`
    ///
    /// Shadow roots are not cloned.
    pub(crate) fn clone_subtree(
        &mut self,
        source: NodeId,
        document: NodeId,
        deep: bool,
    ) -> DomResult<NodeId> {
        let node = self.node(source)?;
        let data = match &node.data {
            NodeData::Document | NodeData::ShadowRoot { .. } => {
                return Err(DomError::InvalidNodeType)
            }
            NodeData::Element(e) => NodeData::Element(ElementData {
                local_name: e.local_name.clone(),
                attrs: e.attrs.clone(),
                shadow_root: None,
            }),
            other => other.clone(),
        };
        let children = if deep { node.children.clone() } else { Vec::new() };

        let copy = self.alloc(Node::new(Some(document), data));
        for child in children {
            let child_copy = self.clone_subtree(child, document, true)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Detach and free the subtree rooted at `root`, returning freed ids
    pub(crate) fn destroy(&mut self, root: NodeId) -> DomResult<Vec<NodeId>> {
        if matches!(self.node(root)?.data, NodeData::ShadowRoot { .. }) {
            return Err(DomError::InvalidNodeType);
        }
        self.detach(root)?;
        let doomed = self.preorder(root, TraversalOrder::ShadowFirst);
        doomed.iter().for_each(|&id| {
            self.free(id);
        });
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_body(tree: &mut DomTree) -> (NodeId, NodeId) {
        let doc = tree.create_document();
        let body = tree.create_element(doc, "body");
        tree.insert(doc, body, None).unwrap();
        (doc, body)
    }

    #[test]
    fn test_stale_ids_do_not_alias() {
        let mut tree = DomTree::new();
        let doc = tree.create_document();
        let a = tree.create_element(doc, "div");
        tree.destroy(a).unwrap();
        let b = tree.create_element(doc, "span");

        assert_eq!(a.index(), b.index());
        assert!(!tree.contains(a));
        assert_eq!(tree.local_name(b), Some("span"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_connectedness_through_shadow_root() {
        let mut tree = DomTree::new();
        let (doc, body) = doc_with_body(&mut tree);
        let host = tree.create_element(doc, "x-host");
        let shadow = tree.attach_shadow(host).unwrap();
        let inner = tree.create_element(doc, "x-inner");
        tree.insert(shadow, inner, None).unwrap();

        assert!(!tree.is_connected(inner));
        tree.insert(body, host, None).unwrap();
        assert!(tree.is_connected(inner));
        assert_eq!(tree.root(inner), doc);
        assert_eq!(tree.host(shadow), Some(host));
    }

    #[test]
    fn test_preorder_shadow_before_light() {
        let mut tree = DomTree::new();
        let doc = tree.create_document();
        let host = tree.create_element(doc, "x-host");
        let light = tree.create_element(doc, "x-light");
        let shadowed = tree.create_element(doc, "x-shadowed");
        tree.insert(host, light, None).unwrap();
        let shadow = tree.attach_shadow(host).unwrap();
        tree.insert(shadow, shadowed, None).unwrap();

        assert_eq!(
            tree.elements(host, TraversalOrder::ShadowFirst),
            vec![host, shadowed, light]
        );
        assert_eq!(
            tree.elements(host, TraversalOrder::LightFirst),
            vec![host, light, shadowed]
        );
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let mut tree = DomTree::new();
        let doc = tree.create_document();
        let outer = tree.create_element(doc, "div");
        let inner = tree.create_element(doc, "div");
        tree.insert(outer, inner, None).unwrap();

        assert_eq!(tree.insert(inner, outer, None), Err(DomError::HierarchyRequest));
        assert_eq!(tree.insert(outer, outer, None), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_insert_before_reference() {
        let mut tree = DomTree::new();
        let (doc, body) = doc_with_body(&mut tree);
        let a = tree.create_element(doc, "a");
        let b = tree.create_element(doc, "b");
        let stray = tree.create_element(doc, "i");
        tree.insert(body, a, None).unwrap();
        tree.insert(body, b, Some(a)).unwrap();

        assert_eq!(tree.children(body), &[b, a]);
        assert_eq!(tree.detach(b).unwrap(), Some(body));
        assert_eq!(tree.insert(body, b, Some(stray)), Err(DomError::NotAChild));
    }

    #[test]
    fn test_clone_subtree_is_detached_copy() {
        let mut tree = DomTree::new();
        let doc = tree.create_document();
        let other = tree.create_document();
        let el = tree.create_element(doc, "x-foo");
        tree.set_attribute(el, None, "label", "hi").unwrap();
        let text = tree.create_text(doc, "hello");
        tree.insert(el, text, None).unwrap();
        tree.attach_shadow(el).unwrap();

        let copy = tree.clone_subtree(el, other, true).unwrap();
        assert_eq!(tree.attribute(copy, "label"), Some("hi"));
        assert_eq!(tree.owner_document(copy), Some(other));
        assert_eq!(tree.children(copy).len(), 1);
        assert_eq!(tree.shadow_root(copy), None);
        assert_eq!(tree.parent(copy), None);
    }

    #[test]
    fn test_destroy_frees_shadow_tree() {
        let mut tree = DomTree::new();
        let doc = tree.create_document();
        let host = tree.create_element(doc, "x-host");
        let shadow = tree.attach_shadow(host).unwrap();
        let inner = tree.create_element(doc, "span");
        tree.insert(shadow, inner, None).unwrap();

        let freed = tree.destroy(host).unwrap();
        assert_eq!(freed, vec![host, shadow, inner]);
        assert_eq!(tree.len(), 1);
    }
}
