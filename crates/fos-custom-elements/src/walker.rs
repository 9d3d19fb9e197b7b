//! Tree Walker (connect / disconnect / upgrade)
//!
//! Walks a subtree in shadow-including preorder and decides per element
//! whether to attempt an upgrade and which reactions to enqueue. The element
//! list is collected before any element is processed: constructors run
//! synchronously during the walk and may restructure the tree.
//!
//! All of these must run inside a reaction frame; outside one they fail
//! with `NoActiveFrame` before touching any element.

use crate::{AttributeChange, CustomElementError, CustomElementState, NodeId, Reaction, Realm};

impl Realm {
    /// Upgrade eligible elements and enqueue `connected` for custom ones
    pub fn connect_tree(&mut self, root: NodeId) -> Result<(), CustomElementError> {
        self.current_frame()?;
        for element in self.tree.elements(root, self.config.traversal) {
            match self.state(element) {
                CustomElementState::Custom => {
                    self.enqueue_callback_reaction(element, Reaction::Connected)?
                }
                CustomElementState::Failed => {}
                CustomElementState::Uninitialized | CustomElementState::Undefined => {
                    self.upgrade_element(element)?
                }
            }
        }
        Ok(())
    }

    /// Enqueue `disconnected` for every custom element; never upgrades
    pub fn disconnect_tree(&mut self, root: NodeId) -> Result<(), CustomElementError> {
        self.current_frame()?;
        for element in self.tree.elements(root, self.config.traversal) {
            self.enqueue_callback_reaction(element, Reaction::Disconnected)?;
        }
        Ok(())
    }

    /// Attempt an upgrade on every element of a subtree newly associated
    /// with this realm, connected or not
    pub fn patch_and_upgrade_tree(&mut self, root: NodeId) -> Result<(), CustomElementError> {
        self.current_frame()?;
        for element in self.tree.elements(root, self.config.traversal) {
            self.upgrade_element(element)?;
        }
        Ok(())
    }

    /// Enqueue `adopted` for every custom element of a subtree that moved
    /// from `old_document` to `new_document`
    pub fn adopt_tree(
        &mut self,
        root: NodeId,
        old_document: NodeId,
        new_document: NodeId,
    ) -> Result<(), CustomElementError> {
        self.current_frame()?;
        for element in self.tree.elements(root, self.config.traversal) {
            self.enqueue_callback_reaction(
                element,
                Reaction::Adopted { old_document, new_document },
            )?;
        }
        Ok(())
    }

    /// Enqueue `attribute-changed` if the element is custom and observes `name`
    pub fn attribute_changed(
        &mut self,
        element: NodeId,
        name: &str,
        old_value: Option<String>,
        new_value: Option<String>,
        namespace: Option<String>,
    ) -> Result<(), CustomElementError> {
        self.current_frame()?;
        self.enqueue_callback_reaction(
            element,
            Reaction::AttributeChanged(AttributeChange {
                name: name.to_string(),
                old_value,
                new_value,
                namespace,
            }),
        )
    }

    /// Upgrade a single element
    ///
    /// No-op unless the element is uninitialized or undefined, a definition
    /// exists for its name, and its constructor is not already running.
    /// Constructor failures are reported and leave the element `failed`; the
    /// returned error is only ever `NoActiveFrame`.
    pub fn upgrade_element(&mut self, element: NodeId) -> Result<(), CustomElementError> {
        self.current_frame()?;
        match self.state(element) {
            CustomElementState::Custom | CustomElementState::Failed => return Ok(()),
            CustomElementState::Uninitialized | CustomElementState::Undefined => {}
        }
        let Some(name) = self.tree.local_name(element) else {
            return Ok(());
        };
        let Some(definition) = self.registry.get(name) else {
            return Ok(());
        };
        if definition.is_constructing(element) {
            tracing::debug!(?element, name, "upgrade requested during own construction");
            return Ok(());
        }
        let name = definition.local_name().to_string();

        definition.push_construction(element);
        let constructed = (definition.constructor)(self, element);
        definition.pop_construction();

        if let Err(source) = constructed {
            tracing::debug!(?element, %name, "upgrade failed");
            if self.tree.contains(element) {
                self.records.set_failed(element);
            }
            self.report(element, CustomElementError::Upgrade { name, source });
            return Ok(());
        }
        if !self.tree.contains(element) {
            self.report(element, CustomElementError::ElementLost { name });
            return Ok(());
        }
        if self.state(element) != CustomElementState::Uninitialized
            && self.state(element) != CustomElementState::Undefined
        {
            return Ok(());
        }

        self.records.set_custom(element, definition.clone());
        tracing::debug!(?element, %name, "element upgraded");

        let observed: Vec<_> = self
            .tree
            .attributes(element)
            .iter()
            .filter(|attr| definition.observes(&attr.name))
            .cloned()
            .collect();
        for attr in observed {
            self.attribute_changed(element, &attr.name, None, Some(attr.value), attr.namespace)?;
        }

        if self.tree.is_connected(element) {
            self.enqueue_callback_reaction(element, Reaction::Connected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::{CallbackError, Definition, Realm};

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging_definition(log: &Log, tag: &'static str) -> Definition {
        let (ctor, conn, disc) = (log.clone(), log.clone(), log.clone());
        Definition::new(move |_, _| {
            ctor.borrow_mut().push(format!("{tag} upgraded"));
            Ok(())
        })
        .on_connected(move |_, _| {
            conn.borrow_mut().push(format!("{tag} connected"));
            Ok(())
        })
        .on_disconnected(move |_, _| {
            disc.borrow_mut().push(format!("{tag} disconnected"));
            Ok(())
        })
    }

    #[test]
    fn test_upgrade_runs_constructor_once() {
        let log = Log::default();
        let mut realm = Realm::new();
        realm.define("x-foo", logging_definition(&log, "x-foo")).unwrap();
        let el = realm.create_element("x-foo");

        realm.run_in_frame(|realm| {
            realm.upgrade_element(el).unwrap();
            realm.upgrade_element(el).unwrap();
        });

        assert_eq!(*log.borrow(), vec!["x-foo upgraded"]);
        assert_eq!(realm.state(el), CustomElementState::Custom);
    }

    #[test]
    fn test_upgrade_without_definition_is_noop() {
        let mut realm = Realm::new();
        let el = realm.create_element("x-later");
        realm.run_in_frame(|realm| realm.upgrade_element(el)).unwrap();
        assert_eq!(realm.state(el), CustomElementState::Undefined);
    }

    #[test]
    fn test_upgrade_replays_observed_attributes() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut realm = Realm::new();
        realm
            .define(
                "x-attr",
                Definition::new(|_, _| Ok(()))
                    .observe(["label"])
                    .on_attribute_changed(move |_, _, change| {
                        sink.borrow_mut().push(change.clone());
                        Ok(())
                    }),
            )
            .unwrap();
        let el = realm.create_element("x-attr");
        realm.set_attribute(el, "label", "hi").unwrap();
        realm.set_attribute(el, "title", "ignored").unwrap();

        realm.upgrade(el).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![AttributeChange {
                name: "label".into(),
                old_value: None,
                new_value: Some("hi".into()),
                namespace: None,
            }]
        );
    }

    #[test]
    fn test_failed_upgrade_is_terminal() {
        let attempts = Rc::new(RefCell::new(0));
        let counter = attempts.clone();
        let mut realm = Realm::new();
        realm.set_reporter(|_: crate::NodeId, _: &CustomElementError| {});
        realm
            .define(
                "x-bad",
                Definition::new(move |_, _| {
                    *counter.borrow_mut() += 1;
                    Err(CallbackError::new("nope"))
                }),
            )
            .unwrap();
        let el = realm.create_element("x-bad");

        realm.run_in_frame(|realm| {
            realm.upgrade_element(el).unwrap();
            realm.upgrade_element(el).unwrap();
            realm.connect_tree(el).unwrap();
        });

        assert_eq!(*attempts.borrow(), 1);
        assert_eq!(realm.state(el), CustomElementState::Failed);
    }

    #[test]
    fn test_reentrant_upgrade_of_same_element_is_ignored() {
        let attempts = Rc::new(RefCell::new(0));
        let counter = attempts.clone();
        let mut realm = Realm::new();
        realm
            .define(
                "x-loop",
                Definition::new(move |realm, el| {
                    *counter.borrow_mut() += 1;
                    assert!(realm.is_upgrading(el));
                    realm.upgrade(el).map_err(|e| CallbackError::new(e.to_string()))
                }),
            )
            .unwrap();
        let el = realm.create_element("x-loop");

        realm.upgrade(el).unwrap();

        assert_eq!(*attempts.borrow(), 1);
        assert_eq!(realm.state(el), CustomElementState::Custom);
        assert!(!realm.is_upgrading(el));
    }

    #[test]
    fn test_walks_outside_frame_leave_elements_untouched() {
        let log = Log::default();
        let mut realm = Realm::new();
        realm
            .define("x-other", logging_definition(&log, "x-other").observe(["label"]))
            .unwrap();
        let el = realm.create_element("x-other");
        realm.set_attribute(el, "label", "hi").unwrap();

        assert_eq!(realm.connect_tree(el), Err(CustomElementError::NoActiveFrame));
        assert_eq!(realm.upgrade_element(el), Err(CustomElementError::NoActiveFrame));
        assert_eq!(
            realm.patch_and_upgrade_tree(el),
            Err(CustomElementError::NoActiveFrame)
        );

        assert!(log.borrow().is_empty());
        assert_eq!(realm.state(el), CustomElementState::Undefined);
    }

    #[test]
    fn test_failed_constructor_that_destroyed_element_leaves_no_record() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let mut realm = Realm::new();
        realm.set_reporter(move |_: crate::NodeId, error: &CustomElementError| {
            sink.borrow_mut().push(error.clone());
        });
        realm
            .define(
                "x-gone",
                Definition::new(|realm, el| {
                    realm
                        .destroy_node(el)
                        .map_err(|e| CallbackError::new(e.to_string()))?;
                    Err(CallbackError::new("gave up"))
                }),
            )
            .unwrap();
        let el = realm.create_element("x-gone");

        realm.upgrade(el).unwrap();

        assert_eq!(realm.tracked_elements(), 0);
        assert_eq!(realm.state(el), CustomElementState::Uninitialized);
        assert_eq!(
            *errors.borrow(),
            vec![CustomElementError::Upgrade {
                name: "x-gone".into(),
                source: CallbackError::new("gave up"),
            }]
        );
    }

    #[test]
    fn test_disconnect_never_upgrades() {
        let log = Log::default();
        let mut realm = Realm::new();
        realm.define("x-foo", logging_definition(&log, "x-foo")).unwrap();
        let el = realm.create_element("x-foo");

        realm.run_in_frame(|realm| realm.disconnect_tree(el)).unwrap();

        assert!(log.borrow().is_empty());
        assert_eq!(realm.state(el), CustomElementState::Undefined);
    }
}
