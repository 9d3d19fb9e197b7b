//! Uncaught error channel
//!
//! Callback failures never abort the structural operation that triggered
//! them; they end up here instead.

use crate::{CustomElementError, NodeId};

/// Receives errors raised by constructors and lifecycle callbacks
pub trait ErrorReporter {
    fn report(&self, element: NodeId, error: &CustomElementError);
}

/// Default reporter: logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, element: NodeId, error: &CustomElementError) {
        tracing::error!(?element, %error, "uncaught custom element error");
    }
}

impl<F> ErrorReporter for F
where
    F: Fn(NodeId, &CustomElementError),
{
    fn report(&self, element: NodeId, error: &CustomElementError) {
        self(element, error)
    }
}
