//! Realm - tree, registry and reaction stack in one context
//!
//! The realm is the mutation interception layer: each structural entry
//! point opens exactly one reaction frame, performs the mutation, calls the
//! tree walker, and drains before returning. Realms share nothing, so
//! independent registries never see each other's reactions.

use std::fmt;
use std::rc::Rc;

use crate::node::NodeData;
use crate::registry::CustomElementRegistry;
use crate::report::{ErrorReporter, TracingReporter};
use crate::stack::ReactionStack;
use crate::state::ElementRecords;
use crate::{
    Config, CustomElementError, CustomElementState, Definition, DomError, DomResult, DomTree,
    NodeId, NodeType, Reaction,
};

/// Tree, registry and reaction scheduling for one browsing context
pub struct Realm {
    pub(crate) tree: DomTree,
    pub(crate) registry: CustomElementRegistry,
    pub(crate) stack: ReactionStack,
    pub(crate) records: ElementRecords,
    pub(crate) config: Config,
    reporter: Box<dyn ErrorReporter>,
    documents: Vec<NodeId>,
    document: NodeId,
    body: NodeId,
}

impl Realm {
    /// Create a realm with a `<html><body>` document
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut tree = DomTree::new();
        let document = tree.create_document();
        let html = tree.create_element(document, "html");
        let body = tree.create_element(document, "body");
        let _ = tree.insert(document, html, None);
        let _ = tree.insert(html, body, None);

        Self {
            tree,
            registry: CustomElementRegistry::new(),
            stack: ReactionStack::with_capacity(config.stack_capacity),
            records: ElementRecords::default(),
            config,
            reporter: Box::new(TracingReporter),
            documents: vec![document],
            document,
            body,
        }
    }

    /// Replace the uncaught-error channel
    pub fn set_reporter(&mut self, reporter: impl ErrorReporter + 'static) {
        self.reporter = Box::new(reporter);
    }

    pub(crate) fn report(&self, element: NodeId, error: CustomElementError) {
        self.reporter.report(element, &error);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn registry(&self) -> &CustomElementRegistry {
        &self.registry
    }

    /// Main document
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// `<body>` of the main document
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn documents(&self) -> &[NodeId] {
        &self.documents
    }

    pub fn state(&self, element: NodeId) -> CustomElementState {
        self.records.state(element)
    }

    pub fn definition(&self, element: NodeId) -> Option<Rc<Definition>> {
        self.records.definition(element)
    }

    /// Whether `element`'s constructor is currently running as an upgrade
    pub fn is_upgrading(&self, element: NodeId) -> bool {
        self.tree
            .local_name(element)
            .and_then(|name| self.registry.get(name))
            .is_some_and(|definition| definition.is_constructing(element))
    }

    /// Number of open reaction frames
    pub fn frame_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Number of side-table entries currently held
    pub fn tracked_elements(&self) -> usize {
        self.records.len()
    }

    pub fn create_document(&mut self) -> NodeId {
        let document = self.tree.create_document();
        self.documents.push(document);
        document
    }

    /// Create an inert element in the main document
    ///
    /// No constructor runs, even if the name is defined: the element is
    /// `undefined` until it is connected or explicitly upgraded.
    pub fn create_element(&mut self, local_name: &str) -> NodeId {
        self.create_element_in(self.document, local_name)
    }

    pub fn create_element_in(&mut self, document: NodeId, local_name: &str) -> NodeId {
        let element = self.tree.create_element(document, local_name);
        if let Some(name) = self.tree.local_name(element) {
            if CustomElementRegistry::is_valid_name(name) {
                self.records.set_undefined(element);
            }
        }
        element
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.create_text(self.document, text)
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.tree.create_fragment(self.document)
    }

    /// Construct a defined element directly, outside of any upgrade
    ///
    /// The construction stack is left empty, so the constructor sees
    /// [`is_upgrading`](Self::is_upgrading) as false. A constructor error is
    /// returned to the caller and the element is discarded.
    pub fn construct(&mut self, local_name: &str) -> DomResult<NodeId> {
        let definition = self
            .registry
            .get(local_name)
            .ok_or_else(|| CustomElementError::NotDefined(local_name.to_string()))?;
        let element = self.tree.create_element(self.document, local_name);

        if let Err(source) = (definition.constructor)(self, element) {
            if let Err(error) = self.forget_subtree(element) {
                tracing::debug!(?element, %error, "constructed element already gone");
            }
            return Err(CustomElementError::Upgrade {
                name: local_name.to_string(),
                source,
            }
            .into());
        }
        if !self.tree.contains(element) {
            return Err(CustomElementError::ElementLost { name: local_name.to_string() }.into());
        }
        self.records.set_custom(element, definition);
        Ok(element)
    }

    /// Register a definition and upgrade matching elements already in the
    /// realm's documents
    pub fn define(&mut self, name: &str, definition: Definition) -> Result<(), CustomElementError> {
        self.registry.define(name, definition)?;
        tracing::debug!(name, "custom element defined");

        self.run_in_frame(|realm| {
            let order = realm.config.traversal;
            for document in realm.documents.clone() {
                for element in realm.tree.elements(document, order) {
                    let candidate = matches!(
                        realm.state(element),
                        CustomElementState::Uninitialized | CustomElementState::Undefined
                    );
                    if candidate && realm.tree.local_name(element) == Some(name) {
                        realm.enqueue_reaction(element, Reaction::Upgrade)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Upgrade every eligible element under `root`, connected or not
    pub fn upgrade(&mut self, root: NodeId) -> DomResult<()> {
        if !self.tree.contains(root) {
            return Err(DomError::NotFound);
        }
        self.run_in_frame(|realm| realm.patch_and_upgrade_tree(root))?;
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `node` into `parent` before `reference` (or last)
    ///
    /// A node that already has a parent is removed first; a fragment
    /// contributes its children instead of itself.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.run_in_frame(|realm| realm.insert_in_frame(parent, node, reference))
    }

    fn insert_in_frame(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.tree.validate_insert(parent, node, reference)?;
        let reference = match reference {
            Some(r) if r == node => self.tree.next_sibling(node),
            other => other,
        };
        let document = self.tree.owner_document(parent).ok_or(DomError::NotFound)?;

        let nodes = match self.tree.node_type(node) {
            Some(NodeType::DocumentFragment) => {
                let children = self.tree.children(node).to_vec();
                for &child in &children {
                    self.tree.detach(child)?;
                }
                children
            }
            _ => vec![node],
        };

        for node in nodes {
            self.adopt_in_frame(document, node)?;
            self.tree.insert(parent, node, reference)?;
            if self.tree.is_connected(node) {
                self.connect_tree(node)?;
            }
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        if !self.tree.contains(parent) {
            return Err(DomError::NotFound);
        }
        if self.tree.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.run_in_frame(|realm| realm.remove_in_frame(child))
    }

    fn remove_in_frame(&mut self, node: NodeId) -> DomResult<()> {
        let was_connected = self.tree.is_connected(node);
        if self.tree.detach(node)?.is_some() && was_connected {
            self.disconnect_tree(node)?;
        }
        Ok(())
    }

    /// Move `node` (detaching it first) into `document`
    pub fn adopt_node(&mut self, document: NodeId, node: NodeId) -> DomResult<()> {
        if self.tree.node_type(document) != Some(NodeType::Document) {
            return Err(DomError::InvalidNodeType);
        }
        self.run_in_frame(|realm| realm.adopt_in_frame(document, node))
    }

    fn adopt_in_frame(&mut self, document: NodeId, node: NodeId) -> DomResult<()> {
        match self.tree.get(node).map(|n| n.data()) {
            None => return Err(DomError::NotFound),
            Some(NodeData::Document) | Some(NodeData::ShadowRoot { .. }) => {
                return Err(DomError::HierarchyRequest)
            }
            Some(_) => {}
        }
        let old_document = self.tree.owner_document(node).ok_or(DomError::NotFound)?;
        self.remove_in_frame(node)?;
        if old_document != document {
            self.tree.set_owner_document(node, document);
            self.adopt_tree(node, old_document, document)?;
        }
        Ok(())
    }

    /// Clone `node` into `document` and upgrade the copy
    pub fn import_node(&mut self, document: NodeId, node: NodeId, deep: bool) -> DomResult<NodeId> {
        if self.tree.node_type(document) != Some(NodeType::Document) {
            return Err(DomError::InvalidNodeType);
        }
        self.run_in_frame(|realm| {
            let copy = realm.tree.clone_subtree(node, document, deep)?;
            for element in realm.tree.elements(copy, realm.config.traversal) {
                if realm
                    .tree
                    .local_name(element)
                    .is_some_and(CustomElementRegistry::is_valid_name)
                {
                    realm.records.set_undefined(element);
                }
            }
            realm.patch_and_upgrade_tree(copy)?;
            Ok(copy)
        })
    }

    pub fn attach_shadow(&mut self, host: NodeId) -> DomResult<NodeId> {
        self.tree.attach_shadow(host)
    }

    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.set_attribute_ns(element, None, name, value)
    }

    pub fn set_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        name: &str,
        value: &str,
    ) -> DomResult<()> {
        self.run_in_frame(|realm| {
            let old_value = realm.tree.set_attribute(element, namespace, name, value)?;
            realm.attribute_changed(
                element,
                name,
                old_value,
                Some(value.to_string()),
                namespace.map(str::to_string),
            )?;
            Ok(())
        })
    }

    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<()> {
        self.remove_attribute_ns(element, None, name)
    }

    pub fn remove_attribute_ns(
        &mut self,
        element: NodeId,
        namespace: Option<&str>,
        name: &str,
    ) -> DomResult<()> {
        self.run_in_frame(|realm| {
            let Some(old_value) = realm.tree.remove_attribute(element, namespace, name)? else {
                return Ok(());
            };
            realm.attribute_changed(
                element,
                name,
                Some(old_value),
                None,
                namespace.map(str::to_string),
            )?;
            Ok(())
        })
    }

    /// Remove `node` from the tree (running disconnect reactions) and free
    /// its subtree along with the subtree's side-table entries
    pub fn destroy_node(&mut self, node: NodeId) -> DomResult<()> {
        match self.tree.node_type(node) {
            None => return Err(DomError::NotFound),
            Some(NodeType::ShadowRoot) => return Err(DomError::InvalidNodeType),
            Some(_) => {}
        }
        self.run_in_frame(|realm| realm.remove_in_frame(node))?;
        self.forget_subtree(node)
    }

    fn forget_subtree(&mut self, node: NodeId) -> DomResult<()> {
        for id in self.tree.destroy(node)? {
            self.records.forget(id);
        }
        Ok(())
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("tree", &self.tree)
            .field("registry", &self.registry)
            .field("stack", &self.stack)
            .field("records", &self.records)
            .field("config", &self.config)
            .field("documents", &self.documents)
            .finish_non_exhaustive()
    }
}
