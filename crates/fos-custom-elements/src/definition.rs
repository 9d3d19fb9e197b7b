//! Custom element definitions
//!
//! A definition is a plain record of callback references. Reaction logic is
//! only ever polymorphic over "does this definition have callback X".

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::{CallbackError, NodeId, Realm, ReactionKind};

/// Constructor, run with the element being upgraded or constructed
pub type Constructor = Rc<dyn Fn(&mut Realm, NodeId) -> Result<(), CallbackError>>;

/// Connected / disconnected callback
pub type LifecycleCallback = Rc<dyn Fn(&mut Realm, NodeId) -> Result<(), CallbackError>>;

/// Adopted callback: `(realm, element, old_document, new_document)`
pub type AdoptedCallback =
    Rc<dyn Fn(&mut Realm, NodeId, NodeId, NodeId) -> Result<(), CallbackError>>;

/// Attribute-changed callback
pub type AttributeChangedCallback =
    Rc<dyn Fn(&mut Realm, NodeId, &crate::AttributeChange) -> Result<(), CallbackError>>;

/// Custom element definition
pub struct Definition {
    pub(crate) local_name: String,
    pub(crate) constructor: Constructor,
    pub(crate) connected: Option<LifecycleCallback>,
    pub(crate) disconnected: Option<LifecycleCallback>,
    pub(crate) adopted: Option<AdoptedCallback>,
    pub(crate) attribute_changed: Option<AttributeChangedCallback>,
    pub(crate) observed_attributes: HashSet<String>,
    /// Elements whose upgrade is currently running the constructor
    construction_stack: RefCell<Vec<NodeId>>,
}

impl Definition {
    /// New definition with the given constructor and no callbacks
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&mut Realm, NodeId) -> Result<(), CallbackError> + 'static,
    {
        Self {
            local_name: String::new(),
            constructor: Rc::new(constructor),
            connected: None,
            disconnected: None,
            adopted: None,
            attribute_changed: None,
            observed_attributes: HashSet::new(),
            construction_stack: RefCell::new(Vec::new()),
        }
    }

    pub fn on_connected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Realm, NodeId) -> Result<(), CallbackError> + 'static,
    {
        self.connected = Some(Rc::new(callback));
        self
    }

    pub fn on_disconnected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Realm, NodeId) -> Result<(), CallbackError> + 'static,
    {
        self.disconnected = Some(Rc::new(callback));
        self
    }

    pub fn on_adopted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Realm, NodeId, NodeId, NodeId) -> Result<(), CallbackError> + 'static,
    {
        self.adopted = Some(Rc::new(callback));
        self
    }

    pub fn on_attribute_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Realm, NodeId, &crate::AttributeChange) -> Result<(), CallbackError> + 'static,
    {
        self.attribute_changed = Some(Rc::new(callback));
        self
    }

    /// Add attribute names whose changes reach the attribute-changed callback
    pub fn observe<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observed_attributes.extend(names.into_iter().map(Into::into));
        self
    }

    /// Name this definition was registered under
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn observes(&self, attribute: &str) -> bool {
        self.observed_attributes.contains(attribute)
    }

    /// Whether a reaction of this kind would invoke anything
    pub fn has_callback(&self, kind: ReactionKind) -> bool {
        match kind {
            ReactionKind::Upgrade => true,
            ReactionKind::Connected => self.connected.is_some(),
            ReactionKind::Disconnected => self.disconnected.is_some(),
            ReactionKind::Adopted => self.adopted.is_some(),
            ReactionKind::AttributeChanged => self.attribute_changed.is_some(),
        }
    }

    /// Element whose upgrade is running this definition's constructor, if any
    pub fn upgrading_element(&self) -> Option<NodeId> {
        self.construction_stack.borrow().last().copied()
    }

    pub(crate) fn is_constructing(&self, element: NodeId) -> bool {
        self.construction_stack.borrow().contains(&element)
    }

    pub(crate) fn push_construction(&self, element: NodeId) {
        self.construction_stack.borrow_mut().push(element);
    }

    pub(crate) fn pop_construction(&self) -> Option<NodeId> {
        self.construction_stack.borrow_mut().pop()
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("local_name", &self.local_name)
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .field("adopted", &self.adopted.is_some())
            .field("attribute_changed", &self.attribute_changed.is_some())
            .field("observed_attributes", &self.observed_attributes)
            .finish_non_exhaustive()
    }
}
