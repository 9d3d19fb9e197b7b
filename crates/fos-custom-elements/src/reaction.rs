//! Pending reactions
//!
//! A reaction is a deferred callback invocation bound to one element. The
//! record carries everything the callback needs, captured at enqueue time,
//! since it runs later in the same synchronous turn.

use crate::NodeId;

/// Reaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Upgrade,
    Connected,
    Disconnected,
    Adopted,
    AttributeChanged,
}

/// Arguments captured for an attribute-changed reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    pub name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub namespace: Option<String>,
}

/// Pending reaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Upgrade,
    Connected,
    Disconnected,
    Adopted {
        old_document: NodeId,
        new_document: NodeId,
    },
    AttributeChanged(AttributeChange),
}

impl Reaction {
    pub fn kind(&self) -> ReactionKind {
        match self {
            Self::Upgrade => ReactionKind::Upgrade,
            Self::Connected => ReactionKind::Connected,
            Self::Disconnected => ReactionKind::Disconnected,
            Self::Adopted { .. } => ReactionKind::Adopted,
            Self::AttributeChanged(_) => ReactionKind::AttributeChanged,
        }
    }
}
