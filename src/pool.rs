//! Ready-made allocators: a generational pool backed by `slab`, and an append-only bump arena.

use ahash::HashMap;
use slab::Slab;

use crate::{
    AllocationStrategy, Allocator, AllocatorFactory, AllocatorId, Block, GraphError,
    NodeTypeGuid, RelativeBlockHandle, RuntimeConfig,
};

struct PoolEntry {
    generation: u32,
    block: Block,
}

/// Pooled allocator. Freed blocks are recycled, and each recycle bumps the block's generation so
/// handles to the previous occupant stay stale.
pub struct PooledAllocator {
    id: AllocatorId,
    block_size: usize,
    entries: Slab<PoolEntry>,
    generations: Vec<u32>,
    max_blocks: Option<usize>,
}

impl PooledAllocator {
    /// Create an allocator with room for `capacity` blocks before growing.
    pub fn new(id: AllocatorId, block_size: usize, capacity: usize) -> Self {
        Self {
            id,
            block_size,
            entries: Slab::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            max_blocks: None,
        }
    }

    /// Refuse allocations beyond `max` live blocks.
    #[must_use]
    pub fn with_max_blocks(mut self, max: Option<usize>) -> Self {
        self.max_blocks = max;
        self
    }

    /// Size in bytes of the node type this allocator serves.
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl Allocator for PooledAllocator {
    fn identity(&self) -> AllocatorId {
        self.id
    }

    fn allocate(&mut self) -> Result<RelativeBlockHandle, GraphError> {
        if self.max_blocks.is_some_and(|max| self.entries.len() >= max) {
            return Err(GraphError::OutOfBlocks(self.id));
        }
        let entry = self.entries.vacant_entry();
        let key = entry.key();
        let index = u32::try_from(key).map_err(|_| GraphError::OutOfBlocks(self.id))?;
        if self.generations.len() <= key {
            self.generations.resize(key + 1, 0);
        }
        let generation = self.generations[key];
        entry.insert(PoolEntry {
            generation,
            block: Block::empty(),
        });
        Ok(RelativeBlockHandle::new(index, generation))
    }

    fn free(&mut self, handle: RelativeBlockHandle) -> Result<(), GraphError> {
        let key = handle.index() as usize;
        match self.entries.get(key) {
            Some(entry) if entry.generation == handle.generation() => {
                self.entries.remove(key);
                self.generations[key] = handle.generation().wrapping_add(1);
                Ok(())
            }
            _ => Err(GraphError::StaleHandle(self.absolute(handle))),
        }
    }

    fn weak_ref(&self, handle: RelativeBlockHandle) -> Option<&Block> {
        self.entries
            .get(handle.index() as usize)
            .filter(|entry| entry.generation == handle.generation())
            .map(|entry| &entry.block)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Bump allocator. Every allocation appends a new block; freed blocks are emptied but never
/// handed out again.
pub struct BumpAllocator {
    id: AllocatorId,
    block_size: usize,
    blocks: Vec<Option<Block>>,
    live: usize,
    max_blocks: Option<usize>,
}

impl BumpAllocator {
    /// Create an allocator with room for `capacity` blocks before growing.
    pub fn new(id: AllocatorId, block_size: usize, capacity: usize) -> Self {
        Self {
            id,
            block_size,
            blocks: Vec::with_capacity(capacity),
            live: 0,
            max_blocks: None,
        }
    }

    /// Refuse allocations once `max` blocks have been handed out in total.
    #[must_use]
    pub fn with_max_blocks(mut self, max: Option<usize>) -> Self {
        self.max_blocks = max;
        self
    }

    /// Size in bytes of the node type this allocator serves.
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl Allocator for BumpAllocator {
    fn identity(&self) -> AllocatorId {
        self.id
    }

    fn allocate(&mut self) -> Result<RelativeBlockHandle, GraphError> {
        if self.max_blocks.is_some_and(|max| self.blocks.len() >= max) {
            return Err(GraphError::OutOfBlocks(self.id));
        }
        let index =
            u32::try_from(self.blocks.len()).map_err(|_| GraphError::OutOfBlocks(self.id))?;
        self.blocks.push(Some(Block::empty()));
        self.live += 1;
        Ok(RelativeBlockHandle::new(index, 0))
    }

    fn free(&mut self, handle: RelativeBlockHandle) -> Result<(), GraphError> {
        let freed = self
            .blocks
            .get_mut(handle.index() as usize)
            .filter(|_| handle.generation() == 0)
            .and_then(Option::take);
        match freed {
            Some(_) => {
                self.live -= 1;
                Ok(())
            }
            None => Err(GraphError::StaleHandle(self.absolute(handle))),
        }
    }

    fn weak_ref(&self, handle: RelativeBlockHandle) -> Option<&Block> {
        if handle.generation() != 0 {
            return None;
        }
        self.blocks.get(handle.index() as usize)?.as_ref()
    }

    fn len(&self) -> usize {
        self.live
    }
}

/// Allocator factory driven by a [`RuntimeConfig`].
///
/// Allocator identities are never reused, so handles into a released allocator stay stale.
pub struct DefaultAllocatorFactory {
    config: RuntimeConfig,
    allocators: HashMap<AllocatorId, Box<dyn Allocator>>,
    next_id: u64,
}

impl Default for DefaultAllocatorFactory {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl DefaultAllocatorFactory {
    /// Create a factory using `config`.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            allocators: HashMap::default(),
            next_id: 0,
        }
    }

    /// The configuration this factory was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of live allocators.
    pub fn allocator_count(&self) -> usize {
        self.allocators.len()
    }
}

impl AllocatorFactory for DefaultAllocatorFactory {
    fn make_allocator(&mut self, block_size: usize, node_type: NodeTypeGuid) -> AllocatorId {
        let id = AllocatorId(self.next_id);
        self.next_id += 1;
        let capacity = self.config.initial_capacity;
        let max = self.config.max_blocks;
        let strategy = self.config.strategy_for(node_type);
        let allocator: Box<dyn Allocator> = match strategy {
            AllocationStrategy::Pooled => {
                Box::new(PooledAllocator::new(id, block_size, capacity).with_max_blocks(max))
            }
            AllocationStrategy::Bump => {
                Box::new(BumpAllocator::new(id, block_size, capacity).with_max_blocks(max))
            }
        };
        tracing::debug!(?id, %node_type, block_size, ?strategy, "created allocator");
        self.allocators.insert(id, allocator);
        id
    }

    fn free_allocator(&mut self, id: AllocatorId) -> Result<(), GraphError> {
        self.allocators
            .remove(&id)
            .map(|_| ())
            .ok_or(GraphError::UnknownAllocator(id))
    }

    fn lookup(&self, id: AllocatorId) -> Option<&dyn Allocator> {
        let allocator: &dyn Allocator = self.allocators.get(&id)?.as_ref();
        Some(allocator)
    }

    fn lookup_mut(&mut self, id: AllocatorId) -> Option<&mut dyn Allocator> {
        let allocator: &mut dyn Allocator = self.allocators.get_mut(&id)?.as_mut();
        Some(allocator)
    }
}
