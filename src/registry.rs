//! The node type registry and the owner of all node storage.

use std::cell::{Ref, RefMut};

use ahash::HashMap;

use crate::{
    AbsoluteBlockHandle, AllocatorFactory, AllocatorId, Argument, BindingId, Block,
    DefaultAllocatorFactory, GraphError, Node, NodeKind, NodeTypeGuid, NoopTracer, RuntimeConfig,
    SlotTypeGuid, Tracer,
};

/// Name and type of one declared slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotInfo {
    /// Display name of the slot.
    pub name: String,
    /// Type of the slot.
    pub slot_type: SlotTypeGuid,
}

/// Declared interface of a node type, supplied at registration.
///
/// # Example
///
/// ```
/// use node_forest::{NodeSignature, SlotTypeGuid};
///
/// let signature = NodeSignature::new("Add")
///     .input("a", SlotTypeGuid::INTEGER)
///     .input("b", SlotTypeGuid::INTEGER)
///     .output("out", SlotTypeGuid::INTEGER);
/// assert_eq!(signature.inputs().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeSignature {
    name: String,
    inputs: Vec<SlotInfo>,
    outputs: Vec<SlotInfo>,
}

impl NodeSignature {
    /// A signature with a display name and no slots.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declare the next input slot.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, slot_type: SlotTypeGuid) -> Self {
        self.inputs.push(SlotInfo {
            name: name.into(),
            slot_type,
        });
        self
    }

    /// Declare the next output slot.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, slot_type: SlotTypeGuid) -> Self {
        self.outputs.push(SlotInfo {
            name: name.into(),
            slot_type,
        });
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared inputs.
    pub fn inputs(&self) -> &[SlotInfo] {
        &self.inputs
    }

    /// Declared outputs.
    pub fn outputs(&self) -> &[SlotInfo] {
        &self.outputs
    }
}

/// Everything the registry knows about one node type.
pub struct NodeTypeInfo {
    guid: NodeTypeGuid,
    signature: NodeSignature,
    block_size: usize,
    allocator: AllocatorId,
    construct: fn() -> Box<dyn Node>,
}

impl NodeTypeInfo {
    /// Identifier of the type.
    pub fn guid(&self) -> NodeTypeGuid {
        self.guid
    }

    /// Display name of the type.
    pub fn name(&self) -> &str {
        self.signature.name()
    }

    /// Declared interface.
    pub fn signature(&self) -> &NodeSignature {
        &self.signature
    }

    /// In-memory size of one instance.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The allocator holding instances of this type.
    pub fn allocator(&self) -> AllocatorId {
        self.allocator
    }
}

impl std::fmt::Debug for NodeTypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTypeInfo")
            .field("guid", &self.guid)
            .field("signature", &self.signature)
            .field("block_size", &self.block_size)
            .field("allocator", &self.allocator)
            .finish()
    }
}

fn construct<T: NodeKind>() -> Box<dyn Node> {
    Box::new(T::default())
}

/// Runtime is the registry of node types and the owner of the allocators holding node instances.
///
/// Nodes are created only through the runtime, which places each one into a block supplied by
/// the allocator of its type and finalizes it again on [`Runtime::free_node`].
pub struct Runtime {
    factory: Box<dyn AllocatorFactory>,
    tracer: Box<dyn Tracer>,
    types: Vec<NodeTypeInfo>,
    by_guid: HashMap<NodeTypeGuid, usize>,
    next_binding: u32,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::with_factory_and_tracer(DefaultAllocatorFactory::default(), NoopTracer)
    }
}

impl Runtime {
    /// Create a runtime with the default allocator factory and no tracing.
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a runtime whose default allocator factory follows `config`.
    pub fn from_config(config: RuntimeConfig) -> Self {
        Self::with_factory(DefaultAllocatorFactory::new(config))
    }

    /// Create a runtime reporting to `tracer`.
    pub fn with_tracer(tracer: impl Tracer + 'static) -> Self {
        Self::with_factory_and_tracer(DefaultAllocatorFactory::default(), tracer)
    }

    /// Create a runtime storing nodes in allocators made by `factory`.
    pub fn with_factory(factory: impl AllocatorFactory + 'static) -> Self {
        Self::with_factory_and_tracer(factory, NoopTracer)
    }

    /// Create a runtime with both a custom factory and a tracer.
    pub fn with_factory_and_tracer(
        factory: impl AllocatorFactory + 'static,
        tracer: impl Tracer + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            tracer: Box::new(tracer),
            types: Vec::new(),
            by_guid: HashMap::default(),
            next_binding: 0,
        }
    }

    /// The tracer observing this runtime.
    pub fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    /// The allocator factory.
    pub fn factory(&self) -> &dyn AllocatorFactory {
        self.factory.as_ref()
    }

    /// Register node type `T` under `signature`.
    ///
    /// An allocator sized for `T` is requested from the factory. Registration fails if the
    /// identifier or the display name is already taken, or if a default-constructed `T` does not
    /// have the declared slots.
    pub fn register_node_type<T: NodeKind>(
        &mut self,
        signature: NodeSignature,
    ) -> Result<NodeTypeGuid, GraphError> {
        let guid = T::GUID;
        if self.is_registered(guid) || self.node_type_by_name(signature.name()).is_some() {
            return Err(GraphError::DuplicateNodeType {
                name: signature.name().to_owned(),
                guid,
            });
        }
        check_signature(&T::default(), &signature)?;

        let block_size = std::mem::size_of::<T>();
        let allocator = self.factory.make_allocator(block_size, guid);
        tracing::debug!(name = signature.name(), %guid, "registered node type");
        self.by_guid.insert(guid, self.types.len());
        self.types.push(NodeTypeInfo {
            guid,
            signature,
            block_size,
            allocator,
            construct: construct::<T>,
        });
        Ok(guid)
    }

    /// All registered node types in registration order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeTypeInfo> + '_ {
        self.types.iter()
    }

    /// Look up a node type.
    pub fn node_type(&self, guid: NodeTypeGuid) -> Option<&NodeTypeInfo> {
        self.by_guid.get(&guid).map(|&index| &self.types[index])
    }

    /// Look up a node type by display name.
    pub fn node_type_by_name(&self, name: &str) -> Option<&NodeTypeInfo> {
        self.types.iter().find(|info| info.name() == name)
    }

    /// Returns true if `guid` is registered.
    pub fn is_registered(&self, guid: NodeTypeGuid) -> bool {
        self.by_guid.contains_key(&guid)
    }

    fn registered(&self, guid: NodeTypeGuid) -> Result<&NodeTypeInfo, GraphError> {
        self.node_type(guid)
            .ok_or(GraphError::UnregisteredNodeType(guid))
    }

    fn place(&mut self, node: Box<dyn Node>) -> Result<AbsoluteBlockHandle, GraphError> {
        let node_type = node.type_guid();
        let id = self.registered(node_type)?.allocator;
        let allocator = self
            .factory
            .lookup_mut(id)
            .ok_or(GraphError::UnknownAllocator(id))?;
        let relative = allocator.allocate()?;
        let handle = allocator.absolute(relative);
        allocator
            .weak_ref(relative)
            .ok_or(GraphError::StaleHandle(handle))?
            .init(node);
        self.tracer.on_allocate(handle, node_type);
        Ok(handle)
    }

    /// Place `node` into a new block.
    pub fn allocate<T: NodeKind>(&mut self, node: T) -> Result<AbsoluteBlockHandle, GraphError> {
        self.place(Box::new(node))
    }

    /// Place `node` into a new block and return its handle together with a typed view of it.
    pub fn allocate_with_handle<T: NodeKind>(
        &mut self,
        node: T,
    ) -> Result<(AbsoluteBlockHandle, RefMut<'_, T>), GraphError> {
        let handle = self.allocate(node)?;
        Ok((handle, self.node_mut::<T>(handle)?))
    }

    /// Create a node of a dynamically chosen type.
    ///
    /// The node is default-constructed and then initialised from `args`, whose meaning is defined
    /// by the node type.
    pub fn allocate_node(
        &mut self,
        node_type: NodeTypeGuid,
        args: &[Argument],
    ) -> Result<AbsoluteBlockHandle, GraphError> {
        let mut node = (self.registered(node_type)?.construct)();
        node.populate(args)?;
        self.place(node)
    }

    /// Finalize a node and release its block. The handle, and every copy of it, becomes stale.
    pub fn free_node(&mut self, handle: AbsoluteBlockHandle) -> Result<(), GraphError> {
        let block = self.factory.weak_ref(handle)?;
        if block.cell().try_borrow_mut().is_err() {
            return Err(GraphError::NodeBusy(handle));
        }
        drop(block.finalize());
        self.factory
            .lookup_mut(handle.allocator())
            .ok_or(GraphError::StaleHandle(handle))?
            .free(handle.block())?;
        self.tracer.on_free(handle);
        Ok(())
    }

    /// Release every instance of `node_type` at once by replacing its allocator.
    pub fn free_all_nodes(&mut self, node_type: NodeTypeGuid) -> Result<(), GraphError> {
        let index = *self
            .by_guid
            .get(&node_type)
            .ok_or(GraphError::UnregisteredNodeType(node_type))?;
        let info = &mut self.types[index];
        self.factory.free_allocator(info.allocator)?;
        info.allocator = self.factory.make_allocator(info.block_size, node_type);
        Ok(())
    }

    /// Resolve a handle to its block.
    pub fn weak_ref(&self, handle: AbsoluteBlockHandle) -> Result<&Block, GraphError> {
        self.factory.weak_ref(handle)
    }

    /// Borrow the node behind a handle.
    pub fn borrow_node(
        &self,
        handle: AbsoluteBlockHandle,
    ) -> Result<Ref<'_, dyn Node>, GraphError> {
        let guard = self
            .weak_ref(handle)?
            .cell()
            .try_borrow()
            .map_err(|_| GraphError::NodeBusy(handle))?;
        Ref::filter_map(guard, |node| node.as_deref()).map_err(|_| GraphError::StaleHandle(handle))
    }

    /// Mutably borrow the node behind a handle.
    pub fn borrow_node_mut(
        &self,
        handle: AbsoluteBlockHandle,
    ) -> Result<RefMut<'_, dyn Node>, GraphError> {
        let guard = self
            .weak_ref(handle)?
            .cell()
            .try_borrow_mut()
            .map_err(|_| GraphError::NodeBusy(handle))?;
        RefMut::filter_map(guard, |node| node.as_deref_mut())
            .map_err(|_| GraphError::StaleHandle(handle))
    }

    /// Borrow the node behind a handle as its concrete type.
    pub fn node<T: NodeKind>(
        &self,
        handle: AbsoluteBlockHandle,
    ) -> Result<Ref<'_, T>, GraphError> {
        let node = self.borrow_node(handle)?;
        Ref::filter_map(node, |node| node.as_any().downcast_ref::<T>()).map_err(|_| {
            GraphError::NodeTypeMismatch {
                handle,
                expected: T::NAME,
            }
        })
    }

    /// Mutably borrow the node behind a handle as its concrete type.
    pub fn node_mut<T: NodeKind>(
        &self,
        handle: AbsoluteBlockHandle,
    ) -> Result<RefMut<'_, T>, GraphError> {
        let node = self.borrow_node_mut(handle)?;
        RefMut::filter_map(node, |node| node.as_any_mut().downcast_mut::<T>()).map_err(|_| {
            GraphError::NodeTypeMismatch {
                handle,
                expected: T::NAME,
            }
        })
    }

    /// The type of the node behind a handle.
    pub fn type_of(&self, handle: AbsoluteBlockHandle) -> Result<NodeTypeGuid, GraphError> {
        Ok(self.borrow_node(handle)?.type_guid())
    }

    /// Reserve a fresh variable binding for a store/load pair.
    pub fn fresh_binding(&mut self) -> BindingId {
        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        id
    }
}

fn check_signature(node: &dyn Node, signature: &NodeSignature) -> Result<(), GraphError> {
    let sides = [
        ("inputs", node.inputs(), signature.inputs()),
        ("outputs", node.outputs(), signature.outputs()),
    ];
    for (side, slots, declared) in sides {
        if slots.len() != declared.len() {
            return Err(GraphError::SignatureMismatch {
                name: signature.name().to_owned(),
                detail: format!(
                    "{} {side} declared, node has {}",
                    declared.len(),
                    slots.len()
                ),
            });
        }
        for (slot, info) in slots.iter().zip(declared) {
            if slot.slot_type() != info.slot_type {
                return Err(GraphError::SignatureMismatch {
                    name: signature.name().to_owned(),
                    detail: format!(
                        "slot `{}` is declared {} but has type {}",
                        info.name,
                        info.slot_type,
                        slot.slot_type()
                    ),
                });
            }
        }
    }
    Ok(())
}
