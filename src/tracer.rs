//! Tracer trait for observing the runtime.
//!
//! The default [`NoopTracer`] ignores everything. [`LogTracer`] forwards each event to the
//! `tracing` crate. Tests implement the trait directly to count evaluations.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use node_forest::{AbsoluteBlockHandle, NodeTypeGuid, Runtime, Tracer};
//!
//! #[derive(Default)]
//! struct CountExecutions(Cell<usize>);
//!
//! impl Tracer for CountExecutions {
//!     fn on_execute(&self, _node: AbsoluteBlockHandle, _node_type: NodeTypeGuid) {
//!         self.0.set(self.0.get() + 1);
//!     }
//! }
//!
//! let runtime = Runtime::with_tracer(CountExecutions::default());
//! ```

use crate::{AbsoluteBlockHandle, NodeTypeGuid};

/// Observer of runtime events. Every hook defaults to doing nothing.
pub trait Tracer {
    /// A node was placed into a freshly allocated block.
    #[inline]
    fn on_allocate(&self, _node: AbsoluteBlockHandle, _node_type: NodeTypeGuid) {}

    /// A node was finalized and its block released.
    #[inline]
    fn on_free(&self, _node: AbsoluteBlockHandle) {}

    /// A node is about to execute.
    #[inline]
    fn on_execute(&self, _node: AbsoluteBlockHandle, _node_type: NodeTypeGuid) {}

    /// A node is about to emit code.
    #[inline]
    fn on_emit(&self, _node: AbsoluteBlockHandle, _node_type: NodeTypeGuid) {}

    /// A shared value was materialized into `store` read back by `loads`.
    #[inline]
    fn on_materialize(&self, _store: AbsoluteBlockHandle, _loads: &[AbsoluteBlockHandle]) {}
}

/// A tracer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// A tracer that emits `tracing` events at `TRACE` level, or `DEBUG` for materialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn on_allocate(&self, node: AbsoluteBlockHandle, node_type: NodeTypeGuid) {
        tracing::trace!(%node, %node_type, "allocate");
    }

    fn on_free(&self, node: AbsoluteBlockHandle) {
        tracing::trace!(%node, "free");
    }

    fn on_execute(&self, node: AbsoluteBlockHandle, node_type: NodeTypeGuid) {
        tracing::trace!(%node, %node_type, "execute");
    }

    fn on_emit(&self, node: AbsoluteBlockHandle, node_type: NodeTypeGuid) {
        tracing::trace!(%node, %node_type, "emit");
    }

    fn on_materialize(&self, store: AbsoluteBlockHandle, loads: &[AbsoluteBlockHandle]) {
        tracing::debug!(%store, loads = loads.len(), "materialize shared value");
    }
}
