//! Error types
//!
//! Structural failures surface as [`DomError`]. Callback failures never do:
//! they are wrapped in [`CustomElementError`] and handed to the realm's
//! [`ErrorReporter`](crate::ErrorReporter).

use crate::ReactionKind;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node not found")]
    NotFound,

    #[error("Hierarchy request error")]
    HierarchyRequest,

    #[error("Node is not a child")]
    NotAChild,

    #[error("Invalid node type")]
    InvalidNodeType,

    #[error("Invalid state")]
    InvalidState,

    #[error(transparent)]
    CustomElement(#[from] CustomElementError),
}

/// Custom element errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomElementError {
    #[error("Invalid custom element name: {0}")]
    InvalidName(String),

    #[error("Element already defined: {0}")]
    AlreadyDefined(String),

    #[error("Element not defined: {0}")]
    NotDefined(String),

    #[error("Reaction enqueued outside of any reaction frame")]
    NoActiveFrame,

    #[error("Constructor for <{name}> failed: {source}")]
    Upgrade {
        name: String,
        #[source]
        source: CallbackError,
    },

    #[error("Constructor for <{name}> destroyed the element being upgraded")]
    ElementLost { name: String },

    #[error("{kind:?} callback for <{name}> failed: {source}")]
    Reaction {
        name: String,
        kind: ReactionKind,
        #[source]
        source: CallbackError,
    },
}

/// Error returned by user-supplied constructors and lifecycle callbacks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_error_message() {
        let err = CustomElementError::Reaction {
            name: "x-foo".to_string(),
            kind: ReactionKind::Connected,
            source: CallbackError::new("boom"),
        };
        assert_eq!(err.to_string(), "Connected callback for <x-foo> failed: boom");
    }

    #[test]
    fn test_dom_error_wraps_custom_element_error() {
        let err: DomError = CustomElementError::NotDefined("x-bar".into()).into();
        assert_eq!(err.to_string(), "Element not defined: x-bar");
    }
}
