//! Allocation policy configuration for [`DefaultAllocatorFactory`](crate::DefaultAllocatorFactory).

use ahash::HashMap;

use crate::NodeTypeGuid;

/// How an allocator manages its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AllocationStrategy {
    /// Freed blocks are reused by later allocations. Generations keep old handles stale.
    #[default]
    Pooled,
    /// Blocks are appended and never reused. Suited to short-lived, allocation-heavy node types.
    Bump,
}

/// Configuration for the default allocator factory.
///
/// # Example
///
/// ```
/// use node_forest::{AllocationStrategy, RuntimeConfig};
///
/// let config = RuntimeConfig::default()
///     .with_initial_capacity(64)
///     .with_strategy("LoadIntegerVariableNode", AllocationStrategy::Bump);
/// assert_eq!(
///     config.strategy_for_name("LoadIntegerVariableNode"),
///     AllocationStrategy::Bump
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Strategy for node types without an explicit entry.
    pub default_strategy: AllocationStrategy,
    /// Blocks reserved up front by every allocator.
    pub initial_capacity: usize,
    /// Per-type overrides, keyed by the node type's declared name.
    pub strategies: HashMap<String, AllocationStrategy>,
    /// Upper bound on live blocks per allocator. `None` means unbounded.
    pub max_blocks: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_strategy: AllocationStrategy::Pooled,
            initial_capacity: 16,
            strategies: HashMap::default(),
            max_blocks: None,
        }
    }
}

impl RuntimeConfig {
    /// Use `strategy` for the node type declared as `name`.
    #[must_use]
    pub fn with_strategy(mut self, name: impl Into<String>, strategy: AllocationStrategy) -> Self {
        self.strategies.insert(name.into(), strategy);
        self
    }

    /// Use `strategy` for every node type without an override.
    #[must_use]
    pub fn with_default_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Reserve `capacity` blocks in each new allocator.
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Limit every allocator to `max` live blocks.
    #[must_use]
    pub fn with_max_blocks(mut self, max: usize) -> Self {
        self.max_blocks = Some(max);
        self
    }

    /// Strategy for a node type by declared name.
    pub fn strategy_for_name(&self, name: &str) -> AllocationStrategy {
        self.strategies
            .get(name)
            .copied()
            .unwrap_or(self.default_strategy)
    }

    /// Strategy for a node type by identifier.
    pub fn strategy_for(&self, node_type: NodeTypeGuid) -> AllocationStrategy {
        self.strategies
            .iter()
            .find(|(name, _)| NodeTypeGuid::of_name(name) == node_type)
            .map(|(_, strategy)| *strategy)
            .unwrap_or(self.default_strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_lookup_by_guid() {
        let config = RuntimeConfig::default().with_strategy("Foo", AllocationStrategy::Bump);
        assert_eq!(
            config.strategy_for(NodeTypeGuid::of_name("Foo")),
            AllocationStrategy::Bump
        );
        assert_eq!(
            config.strategy_for(NodeTypeGuid::of_name("Bar")),
            AllocationStrategy::Pooled
        );
    }
}
