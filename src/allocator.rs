//! The node storage contract.
//!
//! Node instances live inside blocks owned by an [`Allocator`]; one allocator exists per node type,
//! created on demand by the host-supplied [`AllocatorFactory`]. A node is addressed by an
//! [`AbsoluteBlockHandle`], which names the allocator and a block inside it. Resolving a handle
//! takes two lookups, first the allocator, then the block, so the engine never depends on how the
//! host lays out memory.
//!
//! Blocks start out empty. Only the [`Runtime`](crate::Runtime) places a node into a block or
//! takes it back out, exactly once per allocation.

use std::cell::RefCell;
use std::fmt;

use crate::{GraphError, Node, NodeTypeGuid};

/// Identity of one allocator within its factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocatorId(pub u64);

/// Identity of one block within its allocator.
///
/// The generation distinguishes successive occupants of a reused block, so a handle kept past
/// [`Allocator::free`] resolves to nothing instead of to the next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativeBlockHandle {
    index: u32,
    generation: u32,
}

impl RelativeBlockHandle {
    /// Create a handle. Only allocators should call this.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Position of the block inside its allocator.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the block at the time of allocation.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Location-independent identity of one allocated node instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbsoluteBlockHandle {
    allocator: AllocatorId,
    block: RelativeBlockHandle,
}

impl AbsoluteBlockHandle {
    /// Compose a handle from its two halves.
    pub fn new(allocator: AllocatorId, block: RelativeBlockHandle) -> Self {
        Self { allocator, block }
    }

    /// The allocator owning the block.
    pub fn allocator(&self) -> AllocatorId {
        self.allocator
    }

    /// The block within the allocator.
    pub fn block(&self) -> RelativeBlockHandle {
        self.block
    }
}

impl fmt::Display for AbsoluteBlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}v{}",
            self.allocator.0, self.block.index, self.block.generation
        )
    }
}

/// Storage for a single node.
///
/// Allocators own blocks and hand out shared references to them; the node inside is reached
/// through interior mutability, so any holder of a reference may mutate it. Evaluation guards
/// against overlapping access and reports it as [`GraphError::NodeBusy`].
#[derive(Default)]
pub struct Block {
    node: RefCell<Option<Box<dyn Node>>>,
}

impl Block {
    /// An empty block.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no node has been placed into the block.
    pub fn is_empty(&self) -> bool {
        matches!(self.node.try_borrow(), Ok(node) if node.is_none())
    }

    pub(crate) fn cell(&self) -> &RefCell<Option<Box<dyn Node>>> {
        &self.node
    }

    pub(crate) fn init(&self, node: Box<dyn Node>) {
        *self.node.borrow_mut() = Some(node);
    }

    pub(crate) fn finalize(&self) -> Option<Box<dyn Node>> {
        self.node.borrow_mut().take()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.try_borrow() {
            Ok(node) => match node.as_ref() {
                Some(node) => write!(f, "Block({})", node.type_guid()),
                None => write!(f, "Block(empty)"),
            },
            Err(_) => write!(f, "Block(<in use>)"),
        }
    }
}

/// Per-node-type block storage supplied by the host.
pub trait Allocator {
    /// Identity of this allocator within its factory.
    fn identity(&self) -> AllocatorId;

    /// Reserve one empty block.
    fn allocate(&mut self) -> Result<RelativeBlockHandle, GraphError>;

    /// Release a block. Handles to it become stale.
    fn free(&mut self, handle: RelativeBlockHandle) -> Result<(), GraphError>;

    /// Resolve a handle to its block, or `None` if the handle is stale.
    fn weak_ref(&self, handle: RelativeBlockHandle) -> Option<&Block>;

    /// Qualify a relative handle with this allocator's identity.
    fn absolute(&self, handle: RelativeBlockHandle) -> AbsoluteBlockHandle {
        AbsoluteBlockHandle::new(self.identity(), handle)
    }

    /// Number of live blocks.
    fn len(&self) -> usize;

    /// Returns true if no block is live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates and owns one allocator per node type.
pub trait AllocatorFactory {
    /// Create an allocator for nodes of `node_type`, whose in-memory size is `block_size`.
    fn make_allocator(&mut self, block_size: usize, node_type: NodeTypeGuid) -> AllocatorId;

    /// Release an allocator and every block it owns.
    fn free_allocator(&mut self, id: AllocatorId) -> Result<(), GraphError>;

    /// Look up an allocator.
    fn lookup(&self, id: AllocatorId) -> Option<&dyn Allocator>;

    /// Look up an allocator for allocation or release.
    fn lookup_mut(&mut self, id: AllocatorId) -> Option<&mut dyn Allocator>;

    /// Resolve an absolute handle to its block.
    fn weak_ref(&self, handle: AbsoluteBlockHandle) -> Result<&Block, GraphError> {
        let allocator = self
            .lookup(handle.allocator())
            .ok_or(GraphError::StaleHandle(handle))?;
        allocator
            .weak_ref(handle.block())
            .ok_or(GraphError::StaleHandle(handle))
    }
}
