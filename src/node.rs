//! The node capability set and its static identity.

use std::any::Any;

use crate::{AbsoluteBlockHandle, Codegen, Execution, GraphError, NodeTypeGuid, Slot};

/// Access to the concrete type behind a `dyn Node`.
pub trait AsAny: Any {
    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of computation with typed input and output slots.
///
/// Nodes live inside allocator-owned blocks and are addressed by handle. The conventional
/// evaluation contract is demand-driven: to produce its outputs a node first evaluates, through
/// the context, whichever node feeds each of its inputs. Nothing is memoized, so a producer
/// feeding two consumers is evaluated once per consumer unless the graph was forestified first.
pub trait Node: AsAny {
    /// Identifier of the node's type. Equal to [`NodeKind::GUID`] for registered types.
    fn type_guid(&self) -> NodeTypeGuid;

    /// Input slots in declaration order.
    fn inputs(&self) -> &[Slot];

    /// Mutable input slots.
    fn inputs_mut(&mut self) -> &mut [Slot];

    /// Output slots in declaration order.
    fn outputs(&self) -> &[Slot];

    /// Mutable output slots.
    fn outputs_mut(&mut self) -> &mut [Slot];

    /// Initialise a default-constructed node from untyped arguments.
    ///
    /// The meaning of `args` belongs to the node type. The default accepts no arguments.
    fn populate(&mut self, args: &[Argument]) -> Result<(), GraphError> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(GraphError::InvalidArguments {
                node_type: self.type_guid(),
                reason: format!("expected no arguments, got {}", args.len()),
            })
        }
    }

    /// Compute the node's outputs and perform its side effects. `this` is the node's own handle.
    fn execute(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Execution<'_>,
    ) -> Result<(), GraphError>;

    /// Render the node as a target-language expression or statement.
    fn emit_code(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Codegen<'_>,
    ) -> Result<String, GraphError>;
}

/// Static identity of a concrete node type.
pub trait NodeKind: Node + Default {
    /// Declared type name.
    const NAME: &'static str;

    /// Identifier derived from [`NodeKind::NAME`].
    const GUID: NodeTypeGuid = NodeTypeGuid::of_name(Self::NAME);
}

/// An untyped initialiser argument, as supplied by tools that only know node types dynamically.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Argument {
    /// An integer.
    Integer(i64),
    /// A piece of text.
    Text(String),
}

impl Argument {
    /// The integer, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Argument::Integer(value) => Some(*value),
            Argument::Text(_) => None,
        }
    }

    /// The text, if this is some.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Argument::Integer(_) => None,
            Argument::Text(text) => Some(text),
        }
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Integer(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Text(value.to_owned())
    }
}
