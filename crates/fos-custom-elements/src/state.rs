//! Per-element custom element state
//!
//! Side table keyed by node identity. Nodes themselves carry nothing: the
//! table holds state, definition and the pending reaction queue, and drops
//! an entry once the node is destroyed or the entry carries no information.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::{Definition, NodeId, Reaction};

/// Custom element state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomElementState {
    /// Never considered for upgrade
    #[default]
    Uninitialized,
    /// Valid custom element name, no successful upgrade yet
    Undefined,
    /// Constructor failed; terminal
    Failed,
    /// Upgraded, callbacks active
    Custom,
}

#[derive(Debug, Default)]
pub(crate) struct ElementRecord {
    pub(crate) state: CustomElementState,
    pub(crate) definition: Option<Rc<Definition>>,
    reactions: VecDeque<Reaction>,
    /// Serials of the frames this element is recorded in, innermost last
    frames: Vec<u64>,
}

impl ElementRecord {
    fn is_vacant(&self) -> bool {
        self.state == CustomElementState::Uninitialized
            && self.definition.is_none()
            && self.reactions.is_empty()
            && self.frames.is_empty()
    }
}

/// Identity-keyed side table
#[derive(Debug, Default)]
pub(crate) struct ElementRecords {
    records: HashMap<NodeId, ElementRecord>,
}

impl ElementRecords {
    pub(crate) fn state(&self, element: NodeId) -> CustomElementState {
        self.records
            .get(&element)
            .map(|r| r.state)
            .unwrap_or_default()
    }

    pub(crate) fn definition(&self, element: NodeId) -> Option<Rc<Definition>> {
        self.records.get(&element)?.definition.clone()
    }

    pub(crate) fn set_undefined(&mut self, element: NodeId) {
        let record = self.records.entry(element).or_default();
        if record.state == CustomElementState::Uninitialized {
            record.state = CustomElementState::Undefined;
        }
    }

    pub(crate) fn set_custom(&mut self, element: NodeId, definition: Rc<Definition>) {
        let record = self.records.entry(element).or_default();
        record.state = CustomElementState::Custom;
        record.definition = Some(definition);
    }

    /// Mark as failed and discard anything still queued
    pub(crate) fn set_failed(&mut self, element: NodeId) {
        let record = self.records.entry(element).or_default();
        record.state = CustomElementState::Failed;
        record.definition = None;
        record.reactions.clear();
    }

    /// Append `reaction` to the element's queue.
    ///
    /// Returns true when the element is not yet recorded in frame `serial`
    /// and must be pushed onto that frame's range.
    pub(crate) fn push_reaction(&mut self, element: NodeId, reaction: Reaction, serial: u64) -> bool {
        let record = self.records.entry(element).or_default();
        record.reactions.push_back(reaction);
        if record.frames.last() == Some(&serial) {
            return false;
        }
        record.frames.push(serial);
        true
    }

    pub(crate) fn pop_reaction(&mut self, element: NodeId) -> Option<Reaction> {
        self.records.get_mut(&element)?.reactions.pop_front()
    }

    pub(crate) fn pending(&self, element: NodeId) -> usize {
        self.records.get(&element).map_or(0, |r| r.reactions.len())
    }

    /// Element has been fully drained by frame `serial`
    ///
    /// An enclosing frame that recorded the element before becomes its
    /// innermost recording again.
    pub(crate) fn finish_drain(&mut self, element: NodeId, serial: u64) {
        let Some(record) = self.records.get_mut(&element) else { return };
        if record.frames.last() == Some(&serial) {
            record.frames.pop();
        }
        if record.is_vacant() {
            self.records.remove(&element);
        }
    }

    pub(crate) fn forget(&mut self, element: NodeId) {
        self.records.remove(&element);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomTree;

    fn element() -> NodeId {
        let mut tree = DomTree::new();
        let doc = tree.create_document();
        tree.create_element(doc, "x-foo")
    }

    #[test]
    fn test_unknown_nodes_are_uninitialized() {
        let records = ElementRecords::default();
        assert_eq!(records.state(element()), CustomElementState::Uninitialized);
        assert_eq!(records.len(), 0);
    }

    #[test]
    fn test_reactions_are_fifo() {
        let mut records = ElementRecords::default();
        let el = element();

        assert!(records.push_reaction(el, Reaction::Connected, 1));
        assert!(!records.push_reaction(el, Reaction::Disconnected, 1));
        assert!(!records.push_reaction(el, Reaction::Upgrade, 1));

        assert_eq!(records.pop_reaction(el), Some(Reaction::Connected));
        assert_eq!(records.pop_reaction(el), Some(Reaction::Disconnected));
        assert_eq!(records.pop_reaction(el), Some(Reaction::Upgrade));
        assert_eq!(records.pop_reaction(el), None);
    }

    #[test]
    fn test_nested_frame_records_again() {
        let mut records = ElementRecords::default();
        let el = element();

        assert!(records.push_reaction(el, Reaction::Connected, 1));
        assert!(records.push_reaction(el, Reaction::Disconnected, 2));
        assert!(!records.push_reaction(el, Reaction::Connected, 2));
    }

    #[test]
    fn test_outer_frame_recording_restored_after_nested_drain() {
        let mut records = ElementRecords::default();
        let el = element();

        assert!(records.push_reaction(el, Reaction::Connected, 1));
        assert!(records.push_reaction(el, Reaction::Disconnected, 2));
        while records.pop_reaction(el).is_some() {}
        records.finish_drain(el, 2);

        assert!(!records.push_reaction(el, Reaction::Connected, 1));
        records.finish_drain(el, 1);
        assert!(records.push_reaction(el, Reaction::Connected, 1));
    }

    #[test]
    fn test_vacant_records_are_dropped() {
        let mut records = ElementRecords::default();
        let el = element();

        records.push_reaction(el, Reaction::Upgrade, 7);
        records.pop_reaction(el);
        records.finish_drain(el, 7);
        assert_eq!(records.len(), 0);

        records.set_undefined(el);
        records.finish_drain(el, 8);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_failed_discards_queue() {
        let mut records = ElementRecords::default();
        let el = element();

        records.push_reaction(el, Reaction::Connected, 1);
        records.set_failed(el);
        assert_eq!(records.pending(el), 0);
        assert_eq!(records.state(el), CustomElementState::Failed);
    }
}
