//! Reaction Stack
//!
//! A stack of frames over one flat backing sequence of element ids. Each
//! frame owns the half-open range `[start, len)` of the backing sequence
//! that was appended while it was the innermost frame. Ending a frame
//! drains its range in first-recorded order, then truncates it away.
//!
//! Draining is plain recursion: a reaction that mutates the tree opens a
//! nested frame above the one being drained, and that frame is fully
//! drained and truncated before the outer loop looks at its next position.

use crate::{CustomElementError, NodeId, Reaction, Realm};

#[derive(Debug, Clone, Copy)]
struct Frame {
    start: usize,
    serial: u64,
}

/// Frame bookkeeping; draining lives on [`Realm`] since reactions need it
#[derive(Debug)]
pub(crate) struct ReactionStack {
    frames: Vec<Frame>,
    backing: Vec<NodeId>,
    next_serial: u64,
}

impl ReactionStack {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            backing: Vec::with_capacity(capacity.max(1)),
            next_serial: 0,
        }
    }

    fn push_frame(&mut self) -> Frame {
        let frame = Frame {
            start: self.backing.len(),
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.frames.push(frame);
        frame
    }

    fn pop_frame(&mut self, frame: Frame) {
        self.backing.truncate(frame.start);
        self.frames.pop();
    }

    fn current_serial(&self) -> Option<u64> {
        self.frames.last().map(|f| f.serial)
    }

    /// Append to the innermost frame's range, doubling capacity when full
    fn record(&mut self, element: NodeId) {
        if self.backing.len() == self.backing.capacity() {
            let grow_by = self.capacity().max(1);
            self.backing.reserve_exact(grow_by);
            tracing::trace!(capacity = self.capacity(), "reaction stack grown");
        }
        self.backing.push(element);
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn recorded(&self) -> &[NodeId] {
        &self.backing
    }

    pub(crate) fn capacity(&self) -> usize {
        self.backing.capacity()
    }
}

impl Realm {
    /// Run `work` inside a new reaction frame
    ///
    /// Every reaction enqueued while the frame is innermost is drained, in
    /// first-recorded element order and FIFO per element, before this
    /// returns. Reentrant: `work` and the reactions it triggers may call
    /// this again.
    pub fn run_in_frame<R>(&mut self, work: impl FnOnce(&mut Realm) -> R) -> R {
        let frame = self.stack.push_frame();
        tracing::trace!(depth = self.stack.depth(), serial = frame.serial, "reaction frame opened");

        let result = work(self);

        self.drain_frame(frame);
        self.stack.pop_frame(frame);
        tracing::trace!(depth = self.stack.depth(), serial = frame.serial, "reaction frame closed");
        result
    }

    /// Append `reaction` to `element`'s queue and record the element in the
    /// innermost frame if it is not recorded there yet
    ///
    /// Failed elements never receive reactions; the call is accepted and
    /// dropped.
    pub fn enqueue_reaction(
        &mut self,
        element: NodeId,
        reaction: Reaction,
    ) -> Result<(), CustomElementError> {
        let serial = self.current_frame()?;
        if self.state(element) == crate::CustomElementState::Failed {
            tracing::trace!(?element, kind = ?reaction.kind(), "reaction dropped for failed element");
            return Ok(());
        }
        if self.records.push_reaction(element, reaction, serial) {
            self.stack.record(element);
        }
        Ok(())
    }

    /// Serial of the innermost frame; `NoActiveFrame` outside any frame
    pub(crate) fn current_frame(&self) -> Result<u64, CustomElementError> {
        self.stack
            .current_serial()
            .ok_or(CustomElementError::NoActiveFrame)
    }

    /// Enqueue a callback reaction only if the element is custom and its
    /// definition would do something with it
    pub(crate) fn enqueue_callback_reaction(
        &mut self,
        element: NodeId,
        reaction: Reaction,
    ) -> Result<(), CustomElementError> {
        let Some(definition) = self.records.definition(element) else {
            return Ok(());
        };
        let wanted = match &reaction {
            Reaction::AttributeChanged(change) => {
                definition.attribute_changed.is_some() && definition.observes(&change.name)
            }
            other => definition.has_callback(other.kind()),
        };
        if wanted && self.state(element) == crate::CustomElementState::Custom {
            self.enqueue_reaction(element, reaction)?;
        }
        Ok(())
    }

    fn drain_frame(&mut self, frame: Frame) {
        let mut position = frame.start;
        while let Some(&element) = self.stack.recorded().get(position) {
            tracing::trace!(?element, pending = self.records.pending(element), "draining element");
            while let Some(reaction) = self.records.pop_reaction(element) {
                self.invoke_reaction(element, reaction);
            }
            self.records.finish_drain(element, frame.serial);
            position += 1;
        }
    }

    fn invoke_reaction(&mut self, element: NodeId, reaction: Reaction) {
        if let Reaction::Upgrade = reaction {
            if let Err(error) = self.upgrade_element(element) {
                self.report(element, error);
            }
            return;
        }

        let Some(definition) = self.records.definition(element) else {
            return;
        };
        let kind = reaction.kind();
        let result = match reaction {
            Reaction::Upgrade => None,
            Reaction::Connected => definition.connected.clone().map(|cb| cb(self, element)),
            Reaction::Disconnected => definition.disconnected.clone().map(|cb| cb(self, element)),
            Reaction::Adopted { old_document, new_document } => definition
                .adopted
                .clone()
                .map(|cb| cb(self, element, old_document, new_document)),
            Reaction::AttributeChanged(change) => definition
                .attribute_changed
                .clone()
                .map(|cb| cb(self, element, &change)),
        };

        if let Some(Err(source)) = result {
            let error = CustomElementError::Reaction {
                name: definition.local_name().to_string(),
                kind,
                source,
            };
            self.report(element, error);
        }
    }
}
