//! Typed connection points and the edges between them.

use std::fmt;

use crate::{AbsoluteBlockHandle, SlotTypeGuid};

/// A value carried by a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A 64-bit signed integer.
    Integer(i64),
}

impl Value {
    /// The slot type able to carry this value.
    pub fn slot_type(&self) -> SlotTypeGuid {
        match self {
            Value::Integer(_) => SlotTypeGuid::INTEGER,
        }
    }

    /// The integer inside this value.
    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Integer(value) => *value,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// Which side of a node a slot sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Consumes a value.
    Input,
    /// Produces a value.
    Output,
}

/// Address of one slot: the owning node, the side, and the position on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotRef {
    /// The node owning the slot.
    pub node: AbsoluteBlockHandle,
    /// Input or output.
    pub direction: Direction,
    /// Position among the node's slots of that direction.
    pub index: usize,
}

impl SlotRef {
    /// Address the `index`th input of `node`.
    pub fn input(node: AbsoluteBlockHandle, index: usize) -> Self {
        Self {
            node,
            direction: Direction::Input,
            index,
        }
    }

    /// Address the `index`th output of `node`.
    pub fn output(node: AbsoluteBlockHandle, index: usize) -> Self {
        Self {
            node,
            direction: Direction::Output,
            index,
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        write!(f, "{}.{}[{}]", self.node, side, self.index)
    }
}

/// An edge from one output slot to one input slot.
///
/// Stored symmetrically in the connection lists of both slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotConnection {
    /// The consuming slot.
    pub input: SlotRef,
    /// The producing slot.
    pub output: SlotRef,
}

/// A typed connection point owned by its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    slot_type: SlotTypeGuid,
    connections: Vec<SlotConnection>,
    value: Option<Value>,
}

impl Slot {
    /// An unconnected slot of `slot_type`.
    pub fn new(slot_type: SlotTypeGuid) -> Self {
        Self {
            slot_type,
            connections: Vec::new(),
            value: None,
        }
    }

    /// An unconnected integer slot.
    pub fn integer() -> Self {
        Self::new(SlotTypeGuid::INTEGER)
    }

    /// The slot's type.
    pub fn slot_type(&self) -> SlotTypeGuid {
        self.slot_type
    }

    /// Returns true if this slot may be wired to `other`.
    pub fn can_connect(&self, other: &Slot) -> bool {
        self.slot_type == other.slot_type
    }

    /// Connections in the order they were made.
    pub fn connections(&self) -> &[SlotConnection] {
        &self.connections
    }

    /// The only connection of an input slot, if it is connected.
    pub fn sole_connection(&self) -> Option<&SlotConnection> {
        self.connections.first()
    }

    /// Returns true if at least one connection exists.
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Value last written to the slot.
    pub fn value(&self) -> Option<Value> {
        self.value
    }

    /// Overwrite the slot's value.
    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub(crate) fn push_connection(&mut self, connection: SlotConnection) {
        self.connections.push(connection);
    }

    pub(crate) fn take_connections(&mut self) -> Vec<SlotConnection> {
        std::mem::take(&mut self.connections)
    }

    pub(crate) fn remove_connection(&mut self, connection: &SlotConnection) {
        self.connections.retain(|c| c != connection);
    }
}
