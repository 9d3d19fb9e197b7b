//! Custom Element Registry
//!
//! Definition storage and name validation. Upgrading existing elements on
//! definition is driven by [`Realm::define`](crate::Realm::define).

use std::collections::HashMap;
use std::rc::Rc;

use crate::{CustomElementError, Definition};

/// Names that contain a hyphen but are taken by SVG/MathML
const RESERVED: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Custom elements registry
#[derive(Debug, Default)]
pub struct CustomElementRegistry {
    definitions: HashMap<String, Rc<Definition>>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under `name`
    pub fn define(
        &mut self,
        name: &str,
        mut definition: Definition,
    ) -> Result<Rc<Definition>, CustomElementError> {
        if !Self::is_valid_name(name) {
            return Err(CustomElementError::InvalidName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(CustomElementError::AlreadyDefined(name.to_string()));
        }

        definition.local_name = name.to_string();
        let definition = Rc::new(definition);
        self.definitions.insert(name.to_string(), definition.clone());
        Ok(definition)
    }

    /// Get element definition
    pub fn get(&self, name: &str) -> Option<Rc<Definition>> {
        self.definitions.get(name).cloned()
    }

    /// Check if element is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate custom element name
    pub fn is_valid_name(name: &str) -> bool {
        // Must start with lowercase letter
        if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return false;
        }

        // Must contain hyphen, no uppercase
        if !name.contains('-') || name.chars().any(|c| c.is_ascii_uppercase()) {
            return false;
        }

        !RESERVED.contains(&name)
    }
}
