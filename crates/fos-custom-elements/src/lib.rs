//! fOS Custom Elements - lifecycle reaction scheduling
//!
//! Decides when, and in what order, custom element reactions (upgrade,
//! connected, disconnected, adopted, attribute-changed) run as a result of
//! synchronous tree mutations.
//!
//! Every structural entry point on [`Realm`] opens one reaction frame; all
//! reactions enqueued while the frame is active are drained before the call
//! returns. Callbacks receive `&mut Realm` and may mutate the tree again,
//! which opens a nested frame that drains before the outer one continues.
//!
//! # Example
//! ```rust,ignore
//! use fos_custom_elements::{Definition, Realm};
//!
//! let mut realm = Realm::new();
//! realm.define("x-foo", Definition::new(|_, _| Ok(()))
//!     .on_connected(|realm, el| {
//!         tracing::info!(tag = ?realm.tree().local_name(el), "connected");
//!         Ok(())
//!     }))?;
//!
//! let el = realm.create_element("x-foo");
//! realm.append_child(realm.body(), el)?;
//! ```

mod config;
mod definition;
mod error;
mod node;
mod reaction;
mod realm;
mod registry;
mod report;
mod stack;
mod state;
mod tree;
mod walker;

pub use config::{Config, TraversalOrder};
pub use definition::{
    AdoptedCallback, AttributeChangedCallback, Constructor, Definition, LifecycleCallback,
};
pub use error::{CallbackError, CustomElementError, DomError, DomResult};
pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use reaction::{AttributeChange, Reaction, ReactionKind};
pub use realm::Realm;
pub use registry::CustomElementRegistry;
pub use report::{ErrorReporter, TracingReporter};
pub use state::CustomElementState;
pub use tree::DomTree;

/// Node identifier: arena slot plus generation
///
/// A freed slot bumps its generation, so an id held past the node's
/// destruction never resolves to whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index in the arena
    pub fn index(self) -> u32 {
        self.index
    }
}
