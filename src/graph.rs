//! Wiring slots together, and graphs characterized by their sink nodes.

use std::io::Write;

use crate::{
    AbsoluteBlockHandle, Direction, Execution, GraphError, Runtime, Slot, SlotConnection, SlotRef,
    SlotTypeGuid, Value,
};

impl Runtime {
    fn with_slot<R>(&self, at: SlotRef, f: impl FnOnce(&Slot) -> R) -> Result<R, GraphError> {
        let node = self.borrow_node(at.node)?;
        let slots = match at.direction {
            Direction::Input => node.inputs(),
            Direction::Output => node.outputs(),
        };
        let result = slots.get(at.index).map(f);
        result.ok_or(GraphError::NoSuchSlot(at))
    }

    fn with_slot_mut<R>(
        &self,
        at: SlotRef,
        f: impl FnOnce(&mut Slot) -> R,
    ) -> Result<R, GraphError> {
        let mut node = self.borrow_node_mut(at.node)?;
        let slots = match at.direction {
            Direction::Input => node.inputs_mut(),
            Direction::Output => node.outputs_mut(),
        };
        let result = slots.get_mut(at.index).map(f);
        result.ok_or(GraphError::NoSuchSlot(at))
    }

    /// The type of a slot.
    pub fn slot_type(&self, at: SlotRef) -> Result<SlotTypeGuid, GraphError> {
        self.with_slot(at, Slot::slot_type)
    }

    /// The connections of a slot, in the order they were made.
    pub fn connections(&self, at: SlotRef) -> Result<Vec<SlotConnection>, GraphError> {
        self.with_slot(at, |slot| slot.connections().to_vec())
    }

    /// The value last written to a slot.
    pub fn slot_value(&self, at: SlotRef) -> Result<Option<Value>, GraphError> {
        self.with_slot(at, Slot::value)
    }

    /// The output feeding an input slot.
    pub fn producer_of(&self, input: SlotRef) -> Result<SlotRef, GraphError> {
        self.with_slot(input, |slot| slot.sole_connection().map(|c| c.output))?
            .ok_or(GraphError::MissingInput(input))
    }

    /// Returns true if `a` and `b` have the same slot type. Symmetric.
    pub fn can_connect(&self, a: SlotRef, b: SlotRef) -> Result<bool, GraphError> {
        Ok(self.slot_type(a)? == self.slot_type(b)?)
    }

    /// Wire `output` into `input`.
    ///
    /// An input carries at most one connection: any previous connection of `input` is removed
    /// from both of its ends first.
    pub fn connect(&self, input: SlotRef, output: SlotRef) -> Result<SlotConnection, GraphError> {
        if input.direction != Direction::Input || output.direction != Direction::Output {
            return Err(GraphError::SlotDirection { input, output });
        }
        let input_type = self.slot_type(input)?;
        let output_type = self.slot_type(output)?;
        if input_type != output_type {
            return Err(GraphError::SlotTypeMismatch {
                input,
                input_type,
                output,
                output_type,
            });
        }

        self.disconnect(input)?;
        let connection = SlotConnection { input, output };
        self.with_slot_mut(input, |slot| slot.push_connection(connection))?;
        self.with_slot_mut(output, |slot| slot.push_connection(connection))?;
        Ok(connection)
    }

    /// Remove the connection of `input`, if any, from both of its ends.
    pub fn disconnect(&self, input: SlotRef) -> Result<Option<SlotConnection>, GraphError> {
        let previous = self.with_slot_mut(input, Slot::take_connections)?;
        for connection in &previous {
            self.with_slot_mut(connection.output, |slot| slot.remove_connection(connection))?;
        }
        Ok(previous.first().copied())
    }

    /// Drop every connection of an output slot, leaving the consuming inputs unconnected.
    pub fn disconnect_output(&self, output: SlotRef) -> Result<(), GraphError> {
        let previous = self.with_slot_mut(output, Slot::take_connections)?;
        for connection in &previous {
            self.with_slot_mut(connection.input, |slot| slot.remove_connection(connection))?;
        }
        Ok(())
    }
}

/// An unordered cluster of connected nodes, characterized by its sinks.
///
/// Executing a graph evaluates every sink on demand. Values shared by several consumers are
/// recomputed once per consumer; [`forestify`](crate::forestify) the graph to avoid that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeGraph {
    finals: Vec<AbsoluteBlockHandle>,
}

impl NodeGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// A graph with the given sinks.
    pub fn from_finals(finals: Vec<AbsoluteBlockHandle>) -> Self {
        Self { finals }
    }

    /// Build a graph from a cluster of nodes. Every node without outputs becomes a sink.
    pub fn from_cluster(
        runtime: &Runtime,
        cluster: &[AbsoluteBlockHandle],
    ) -> Result<Self, GraphError> {
        let mut finals = Vec::new();
        for &handle in cluster {
            if runtime.borrow_node(handle)?.outputs().is_empty() {
                finals.push(handle);
            }
        }
        Ok(Self { finals })
    }

    /// The sinks in insertion order.
    pub fn finals(&self) -> &[AbsoluteBlockHandle] {
        &self.finals
    }

    /// Add a sink.
    pub fn push_final(&mut self, handle: AbsoluteBlockHandle) {
        self.finals.push(handle);
    }

    /// Execute every sink in order, writing side effects to `out`.
    pub fn execute(&self, runtime: &Runtime, out: &mut dyn Write) -> Result<(), GraphError> {
        let mut cx = Execution::new(runtime, out);
        for &handle in &self.finals {
            cx.execute_node(handle)?;
        }
        Ok(())
    }
}
