//! Stable type identifiers derived from declared type names.

use std::fmt;

/// x65599 string hash, folded so that the high bits influence the low ones.
const fn name_hash(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        hash = hash.wrapping_mul(65599).wrapping_add(bytes[i] as u64);
        i += 1;
    }
    hash ^ (hash >> 16)
}

/// Identifier of a node type.
///
/// Derived from the type's declared name. Collisions are not possible to rule out from the hash
/// alone, so the [`Runtime`](crate::Runtime) rejects a registration whose identifier is already
/// taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeTypeGuid(pub u64);

impl NodeTypeGuid {
    /// Derive the identifier for a declared node type name.
    pub const fn of_name(name: &str) -> Self {
        NodeTypeGuid(name_hash(name))
    }
}

impl fmt::Display for NodeTypeGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{:016x}", self.0)
    }
}

/// Identifier of a slot type. Slots connect only when their identifiers are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotTypeGuid(pub u64);

impl SlotTypeGuid {
    /// The slot type carrying 64-bit signed integers.
    pub const INTEGER: SlotTypeGuid = SlotTypeGuid::of_name("IntegerSlot");

    /// Derive the identifier for a declared slot type name.
    pub const fn of_name(name: &str) -> Self {
        SlotTypeGuid(name_hash(name))
    }
}

impl fmt::Display for SlotTypeGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{:016x}", self.0)
    }
}
