//! Realm Configuration

/// Order in which a host's shadow tree and light children are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Host, then its shadow tree, then its light children
    #[default]
    ShadowFirst,
    /// Host, then its light children, then its shadow tree
    LightFirst,
}

/// Realm configuration options
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial capacity of the reaction stack's backing sequence
    pub stack_capacity: usize,

    /// Shadow/light tie-break used by every tree walk
    pub traversal: TraversalOrder,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_capacity: 16,
            traversal: TraversalOrder::ShadowFirst,
        }
    }
}
