//! DOM Node
//!
//! Nodes live in the [`DomTree`](crate::DomTree) arena and refer to each
//! other by [`NodeId`]. Children are kept in an ordered list; a shadow root
//! hangs off its host element rather than the host's child list.

use crate::NodeId;

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (None for documents, shadow roots and detached roots)
    pub(crate) parent: Option<NodeId>,
    /// Children in tree order
    pub(crate) children: Vec<NodeId>,
    /// Owning document (None only for documents themselves)
    pub(crate) owner: Option<NodeId>,
    /// Node-specific data
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(owner: Option<NodeId>, data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            owner,
            data,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Document => NodeType::Document,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::DocumentFragment => NodeType::DocumentFragment,
            NodeData::ShadowRoot { .. } => NodeType::ShadowRoot,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
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
}

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    DocumentFragment,
    ShadowRoot,
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Document fragment; inserting it moves its children instead
    DocumentFragment,
    /// Shadow root attached to `host`
    ShadowRoot { host: NodeId },
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Local name, ASCII-lowercased
    pub local_name: String,
    /// Attributes in insertion order
    pub attrs: Vec<Attribute>,
    /// Attached shadow root, if any
    pub shadow_root: Option<NodeId>,
}

impl ElementData {
    pub fn new(local_name: &str) -> Self {
        Self {
            local_name: local_name.to_ascii_lowercase(),
            attrs: Vec::new(),
            shadow_root: None,
        }
    }

    /// Get an attribute value (no namespace)
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.get_attr_ns(None, name)
    }

    /// Get a namespaced attribute value
    pub fn get_attr_ns(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.matches(namespace, name))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, returning the previous value
    pub fn set_attr(&mut self, namespace: Option<&str>, name: &str, value: String) -> Option<String> {
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.matches(namespace, name)) {
            return Some(std::mem::replace(&mut attr.value, value));
        }
        self.attrs.push(Attribute {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            value,
        });
        None
    }

    /// Remove an attribute, returning its value
    pub fn remove_attr(&mut self, namespace: Option<&str>, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.matches(namespace, name))?;
        Some(self.attrs.remove(pos).value)
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

impl Attribute {
    fn matches(&self, namespace: Option<&str>, name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.name == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_replaces_value() {
        let mut el = ElementData::new("X-Foo");
        assert_eq!(el.local_name, "x-foo");
        assert_eq!(el.set_attr(None, "label", "a".into()), None);
        assert_eq!(el.set_attr(None, "label", "b".into()), Some("a".into()));
        assert_eq!(el.get_attr("label"), Some("b"));
        assert_eq!(el.attrs.len(), 1);
    }

    #[test]
    fn test_namespaced_attrs_are_distinct() {
        let mut el = ElementData::new("x-foo");
        el.set_attr(None, "href", "plain".into());
        el.set_attr(Some("http://www.w3.org/1999/xlink"), "href", "xlink".into());

        assert_eq!(el.get_attr("href"), Some("plain"));
        assert_eq!(el.get_attr_ns(Some("http://www.w3.org/1999/xlink"), "href"), Some("xlink"));
        assert_eq!(el.remove_attr(None, "href"), Some("plain".into()));
        assert_eq!(el.attrs.len(), 1);
    }
}
