//! Error types for graph construction, analysis and evaluation.

use thiserror::Error;

use crate::{AbsoluteBlockHandle, AllocatorId, BindingId, NodeTypeGuid, SlotRef, SlotTypeGuid};

/// Errors raised by the runtime, the graph model and the two backends.
///
/// Host-defined nodes report their own failures through [`GraphError::Custom`], which any
/// `anyhow::Error` converts into.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The handle's block was freed, or its allocator was released.
    #[error("stale handle {0}")]
    StaleHandle(AbsoluteBlockHandle),

    /// No allocator is known under this identity.
    #[error("unknown allocator {0:?}")]
    UnknownAllocator(AllocatorId),

    /// The allocator could not reserve another block.
    #[error("allocator {0:?} is out of blocks")]
    OutOfBlocks(AllocatorId),

    /// A node type was used before being registered.
    #[error("node type {0} is not registered")]
    UnregisteredNodeType(NodeTypeGuid),

    /// A registration reused an identifier or a display name.
    #[error("node type `{name}` ({guid}) is already registered")]
    DuplicateNodeType {
        /// Display name of the rejected registration.
        name: String,
        /// Identifier of the rejected registration.
        guid: NodeTypeGuid,
    },

    /// A node type's slots disagree with the metadata it was registered with.
    #[error("node type `{name}` does not match its registered signature: {detail}")]
    SignatureMismatch {
        /// Display name of the node type.
        name: String,
        /// What disagreed.
        detail: String,
    },

    /// Two slots of different types were wired together.
    #[error("cannot connect {input} ({input_type}) to {output} ({output_type})")]
    SlotTypeMismatch {
        /// The consuming slot.
        input: SlotRef,
        /// Type of the consuming slot.
        input_type: SlotTypeGuid,
        /// The producing slot.
        output: SlotRef,
        /// Type of the producing slot.
        output_type: SlotTypeGuid,
    },

    /// A connection did not pair exactly one input with one output.
    #[error("{input} and {output} do not form an input/output pair")]
    SlotDirection {
        /// The slot passed as the consumer.
        input: SlotRef,
        /// The slot passed as the producer.
        output: SlotRef,
    },

    /// The node has no slot at this position.
    #[error("no such slot {0}")]
    NoSuchSlot(SlotRef),

    /// A required input is not connected to anything.
    #[error("input {0} is not connected")]
    MissingInput(SlotRef),

    /// A producer finished without writing the output slot a consumer reads.
    #[error("slot {0} holds no value")]
    NoValue(SlotRef),

    /// A node was reached while it was already being evaluated, which only happens in a cycle.
    #[error("node {0} is already in use; the graph is cyclic")]
    NodeBusy(AbsoluteBlockHandle),

    /// A typed view was requested for a node of another concrete type.
    #[error("node {handle} is not a `{expected}`")]
    NodeTypeMismatch {
        /// The node.
        handle: AbsoluteBlockHandle,
        /// Name of the requested type.
        expected: &'static str,
    },

    /// A node rejected the raw arguments it was initialised with.
    #[error("invalid arguments for {node_type}: {reason}")]
    InvalidArguments {
        /// The node type being initialised.
        node_type: NodeTypeGuid,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// A variable was read before its binding was evaluated or emitted.
    #[error("variable {0:?} is read before it is bound")]
    UnboundVariable(BindingId),

    /// Integer arithmetic overflowed.
    #[error("integer overflow in node {0}")]
    Overflow(AbsoluteBlockHandle),

    /// Writing a side effect failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A host-defined node failed.
    #[error("node failed: {0}")]
    Custom(#[from] anyhow::Error),
}
