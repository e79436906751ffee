//! The standard node catalog: integer literals, addition, printing, and the store/load pair
//! introduced by [`forestify`](crate::forestify).
//!
//! Code emission targets C. Every root emits one statement; see [`NodeForest::emit_code`].
//!
//! [`NodeForest::emit_code`]: crate::NodeForest::emit_code

use crate::{
    AbsoluteBlockHandle, Argument, BindingId, Codegen, Execution, GraphError, Node, NodeKind,
    NodeSignature, NodeTypeGuid, Runtime, Slot, SlotRef, SlotTypeGuid, Value,
};

fn single_integer(node_type: NodeTypeGuid, args: &[Argument]) -> Result<i64, GraphError> {
    match args {
        [arg] => arg.as_integer().ok_or_else(|| GraphError::InvalidArguments {
            node_type,
            reason: format!("expected an integer, got {arg:?}"),
        }),
        _ => Err(GraphError::InvalidArguments {
            node_type,
            reason: format!("expected one argument, got {}", args.len()),
        }),
    }
}

/// A constant integer.
#[derive(Debug, Clone)]
pub struct LiteralNode {
    value: i64,
    outputs: [Slot; 1],
}

impl Default for LiteralNode {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LiteralNode {
    /// A literal producing `value`.
    pub fn new(value: i64) -> Self {
        let mut out = Slot::integer();
        out.set_value(Value::Integer(value));
        Self {
            value,
            outputs: [out],
        }
    }

    /// The constant.
    pub fn value(&self) -> i64 {
        self.value
    }
}

impl NodeKind for LiteralNode {
    const NAME: &'static str = "IntegerLiteralNode";
}

impl Node for LiteralNode {
    fn type_guid(&self) -> NodeTypeGuid {
        Self::GUID
    }

    fn inputs(&self) -> &[Slot] {
        &[]
    }

    fn inputs_mut(&mut self) -> &mut [Slot] {
        &mut []
    }

    fn outputs(&self) -> &[Slot] {
        &self.outputs
    }

    fn outputs_mut(&mut self) -> &mut [Slot] {
        &mut self.outputs
    }

    /// Takes the constant as a single [`Argument::Integer`].
    fn populate(&mut self, args: &[Argument]) -> Result<(), GraphError> {
        self.value = single_integer(Self::GUID, args)?;
        self.outputs[0].set_value(Value::Integer(self.value));
        Ok(())
    }

    fn execute(&mut self, _: AbsoluteBlockHandle, _: &mut Execution<'_>) -> Result<(), GraphError> {
        Ok(())
    }

    fn emit_code(
        &mut self,
        _: AbsoluteBlockHandle,
        _: &mut Codegen<'_>,
    ) -> Result<String, GraphError> {
        // `long long` constants, so sums are never computed in `int`. `i64::MIN` has no
        // literal form in C.
        Ok(match self.value {
            i64::MIN => format!("({}LL - 1)", i64::MIN + 1),
            value if value < 0 => format!("({value}LL)"),
            value => format!("{value}LL"),
        })
    }
}

/// Sum of two integers.
#[derive(Debug, Clone)]
pub struct AdditionNode {
    inputs: [Slot; 2],
    outputs: [Slot; 1],
}

impl Default for AdditionNode {
    fn default() -> Self {
        Self {
            inputs: [Slot::integer(), Slot::integer()],
            outputs: [Slot::integer()],
        }
    }
}

impl NodeKind for AdditionNode {
    const NAME: &'static str = "IntegerAdditionNode";
}

impl Node for AdditionNode {
    fn type_guid(&self) -> NodeTypeGuid {
        Self::GUID
    }

    fn inputs(&self) -> &[Slot] {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut [Slot] {
        &mut self.inputs
    }

    fn outputs(&self) -> &[Slot] {
        &self.outputs
    }

    fn outputs_mut(&mut self) -> &mut [Slot] {
        &mut self.outputs
    }

    fn execute(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Execution<'_>,
    ) -> Result<(), GraphError> {
        let a = cx.input(&self.inputs[0], SlotRef::input(this, 0))?;
        let b = cx.input(&self.inputs[1], SlotRef::input(this, 1))?;
        let sum = a
            .as_integer()
            .checked_add(b.as_integer())
            .ok_or(GraphError::Overflow(this))?;
        self.outputs[0].set_value(Value::Integer(sum));
        Ok(())
    }

    fn emit_code(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Codegen<'_>,
    ) -> Result<String, GraphError> {
        let left = cx.input(&self.inputs[0], SlotRef::input(this, 0))?;
        let right = cx.input(&self.inputs[1], SlotRef::input(this, 1))?;
        Ok(format!("{left} + {right}"))
    }
}

/// Prints an integer on its own line. Always a sink.
#[derive(Debug, Clone)]
pub struct PrinterNode {
    inputs: [Slot; 1],
}

impl Default for PrinterNode {
    fn default() -> Self {
        Self {
            inputs: [Slot::integer()],
        }
    }
}

impl NodeKind for PrinterNode {
    const NAME: &'static str = "IntegerPrinterNode";
}

impl Node for PrinterNode {
    fn type_guid(&self) -> NodeTypeGuid {
        Self::GUID
    }

    fn inputs(&self) -> &[Slot] {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut [Slot] {
        &mut self.inputs
    }

    fn outputs(&self) -> &[Slot] {
        &[]
    }

    fn outputs_mut(&mut self) -> &mut [Slot] {
        &mut []
    }

    fn execute(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Execution<'_>,
    ) -> Result<(), GraphError> {
        let value = cx.input(&self.inputs[0], SlotRef::input(this, 0))?;
        writeln!(cx.out(), "{value}")?;
        Ok(())
    }

    fn emit_code(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Codegen<'_>,
    ) -> Result<String, GraphError> {
        let inner = cx.input(&self.inputs[0], SlotRef::input(this, 0))?;
        Ok(format!("printf(\"%lld\\n\", {inner})"))
    }
}

/// Evaluates its producer once and binds the result to a variable.
///
/// Created by [`forestify`](crate::forestify) for every value with more than one consumer.
#[derive(Debug, Clone)]
pub struct StoreNode {
    binding: BindingId,
    inputs: [Slot; 1],
}

impl Default for StoreNode {
    fn default() -> Self {
        Self::new(BindingId(0))
    }
}

impl StoreNode {
    /// A store writing `binding`.
    pub fn new(binding: BindingId) -> Self {
        Self {
            binding,
            inputs: [Slot::integer()],
        }
    }

    /// The variable this store writes.
    pub fn binding(&self) -> BindingId {
        self.binding
    }
}

impl NodeKind for StoreNode {
    const NAME: &'static str = "StoreIntegerVariableNode";
}

impl Node for StoreNode {
    fn type_guid(&self) -> NodeTypeGuid {
        Self::GUID
    }

    fn inputs(&self) -> &[Slot] {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut [Slot] {
        &mut self.inputs
    }

    fn outputs(&self) -> &[Slot] {
        &[]
    }

    fn outputs_mut(&mut self) -> &mut [Slot] {
        &mut []
    }

    /// Takes the binding index as a single [`Argument::Integer`].
    fn populate(&mut self, args: &[Argument]) -> Result<(), GraphError> {
        self.binding = binding_argument(Self::GUID, args)?;
        Ok(())
    }

    fn execute(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Execution<'_>,
    ) -> Result<(), GraphError> {
        let value = cx.input(&self.inputs[0], SlotRef::input(this, 0))?;
        cx.bind(self.binding, value);
        Ok(())
    }

    fn emit_code(
        &mut self,
        this: AbsoluteBlockHandle,
        cx: &mut Codegen<'_>,
    ) -> Result<String, GraphError> {
        let inner = cx.input(&self.inputs[0], SlotRef::input(this, 0))?;
        let name = cx.fresh_name();
        let statement = format!("long long {name} = {inner}");
        cx.bind_name(self.binding, name);
        Ok(statement)
    }
}

/// Reads the variable bound by its paired store.
///
/// The store must have been executed, or emitted, earlier in the same run.
#[derive(Debug, Clone)]
pub struct LoadNode {
    binding: BindingId,
    store: Option<AbsoluteBlockHandle>,
    outputs: [Slot; 1],
}

impl Default for LoadNode {
    fn default() -> Self {
        Self {
            binding: BindingId(0),
            store: None,
            outputs: [Slot::integer()],
        }
    }
}

impl LoadNode {
    /// A load of `binding`, written by the store node `store`.
    pub fn new(store: AbsoluteBlockHandle, binding: BindingId) -> Self {
        Self {
            binding,
            store: Some(store),
            ..Default::default()
        }
    }

    /// The variable this load reads.
    pub fn binding(&self) -> BindingId {
        self.binding
    }

    /// The store node writing the variable, if known.
    pub fn store(&self) -> Option<AbsoluteBlockHandle> {
        self.store
    }
}

impl NodeKind for LoadNode {
    const NAME: &'static str = "LoadIntegerVariableNode";
}

impl Node for LoadNode {
    fn type_guid(&self) -> NodeTypeGuid {
        Self::GUID
    }

    fn inputs(&self) -> &[Slot] {
        &[]
    }

    fn inputs_mut(&mut self) -> &mut [Slot] {
        &mut []
    }

    fn outputs(&self) -> &[Slot] {
        &self.outputs
    }

    fn outputs_mut(&mut self) -> &mut [Slot] {
        &mut self.outputs
    }

    /// Takes the binding index as a single [`Argument::Integer`].
    fn populate(&mut self, args: &[Argument]) -> Result<(), GraphError> {
        self.binding = binding_argument(Self::GUID, args)?;
        Ok(())
    }

    fn execute(
        &mut self,
        _: AbsoluteBlockHandle,
        cx: &mut Execution<'_>,
    ) -> Result<(), GraphError> {
        let value = cx.bound(self.binding)?;
        self.outputs[0].set_value(value);
        Ok(())
    }

    fn emit_code(
        &mut self,
        _: AbsoluteBlockHandle,
        cx: &mut Codegen<'_>,
    ) -> Result<String, GraphError> {
        Ok(cx.name_of(self.binding)?.to_owned())
    }
}

fn binding_argument(node_type: NodeTypeGuid, args: &[Argument]) -> Result<BindingId, GraphError> {
    let index = single_integer(node_type, args)?;
    u32::try_from(index)
        .map(BindingId)
        .map_err(|_| GraphError::InvalidArguments {
            node_type,
            reason: format!("binding index {index} is out of range"),
        })
}

/// Register the standard catalog with `runtime`.
pub fn register_standard_library(runtime: &mut Runtime) -> Result<(), GraphError> {
    let int = SlotTypeGuid::INTEGER;
    runtime.register_node_type::<LiteralNode>(
        NodeSignature::new(LiteralNode::NAME).output("out", int),
    )?;
    runtime.register_node_type::<AdditionNode>(
        NodeSignature::new(AdditionNode::NAME)
            .input("a", int)
            .input("b", int)
            .output("out", int),
    )?;
    runtime.register_node_type::<PrinterNode>(
        NodeSignature::new(PrinterNode::NAME).input("in", int),
    )?;
    runtime.register_node_type::<StoreNode>(NodeSignature::new(StoreNode::NAME).input("in", int))?;
    runtime.register_node_type::<LoadNode>(NodeSignature::new(LoadNode::NAME).output("out", int))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_identity_and_arity() {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();

        let literal = runtime.allocate(LiteralNode::new(1)).unwrap();
        let add = runtime.allocate(AdditionNode::default()).unwrap();
        let printer = runtime.allocate(PrinterNode::default()).unwrap();
        let store = runtime.allocate(StoreNode::new(BindingId(0))).unwrap();
        let load = runtime.allocate(LoadNode::new(store, BindingId(0))).unwrap();

        for handle in [literal, add, printer, store, load] {
            let node = runtime.borrow_node(handle).unwrap();
            let info = runtime.node_type(node.type_guid()).unwrap();
            assert_eq!(node.inputs().len(), info.signature().inputs().len());
            assert_eq!(node.outputs().len(), info.signature().outputs().len());
        }
        assert_eq!(runtime.type_of(add).unwrap(), AdditionNode::GUID);
    }

    #[test]
    fn test_populate_literal() {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();

        let literal = runtime
            .allocate_node(LiteralNode::GUID, &[Argument::Integer(42)])
            .unwrap();
        assert_eq!(runtime.node::<LiteralNode>(literal).unwrap().value(), 42);
        assert_eq!(
            runtime.slot_value(SlotRef::output(literal, 0)).unwrap(),
            Some(Value::Integer(42))
        );

        assert!(matches!(
            runtime.allocate_node(LiteralNode::GUID, &[Argument::from("x")]),
            Err(GraphError::InvalidArguments { .. })
        ));
        assert!(matches!(
            runtime.allocate_node(AdditionNode::GUID, &[Argument::Integer(1)]),
            Err(GraphError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_literals_are_long_long_constants() {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();
        let cases = [
            (3, "3LL"),
            (-3, "(-3LL)"),
            (i64::MAX, "9223372036854775807LL"),
            (i64::MIN, "(-9223372036854775807LL - 1)"),
        ];
        for (value, expected) in cases {
            let literal = runtime.allocate(LiteralNode::new(value)).unwrap();
            let mut cx = Codegen::new(&runtime);
            assert_eq!(cx.emit_node(literal).unwrap(), expected);
        }
    }

    #[test]
    fn test_sum_past_i32_range_is_emitted_in_long_long() {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();
        let a = runtime.allocate(LiteralNode::new(2_000_000_000)).unwrap();
        let b = runtime.allocate(LiteralNode::new(2_000_000_000)).unwrap();
        let add = runtime.allocate(AdditionNode::default()).unwrap();
        let printer = runtime.allocate(PrinterNode::default()).unwrap();
        runtime
            .connect(SlotRef::input(add, 0), SlotRef::output(a, 0))
            .unwrap();
        runtime
            .connect(SlotRef::input(add, 1), SlotRef::output(b, 0))
            .unwrap();
        runtime
            .connect(SlotRef::input(printer, 0), SlotRef::output(add, 0))
            .unwrap();

        let mut out = Vec::new();
        Execution::new(&runtime, &mut out)
            .execute_node(printer)
            .unwrap();
        assert_eq!(out, b"4000000000\n");

        let mut cx = Codegen::new(&runtime);
        assert_eq!(
            cx.emit_node(printer).unwrap(),
            "printf(\"%lld\\n\", 2000000000LL + 2000000000LL)"
        );
    }

    #[test]
    fn test_addition_overflow() {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();
        let a = runtime.allocate(LiteralNode::new(i64::MAX)).unwrap();
        let b = runtime.allocate(LiteralNode::new(1)).unwrap();
        let add = runtime.allocate(AdditionNode::default()).unwrap();
        runtime
            .connect(SlotRef::input(add, 0), SlotRef::output(a, 0))
            .unwrap();
        runtime
            .connect(SlotRef::input(add, 1), SlotRef::output(b, 0))
            .unwrap();

        let mut out = Vec::new();
        let mut cx = Execution::new(&runtime, &mut out);
        assert!(matches!(
            cx.execute_node(add),
            Err(GraphError::Overflow(h)) if h == add
        ));
    }

    #[test]
    fn test_load_before_store_is_unbound() {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();
        let store = runtime.allocate(StoreNode::new(BindingId(7))).unwrap();
        let load = runtime.allocate(LoadNode::new(store, BindingId(7))).unwrap();

        let mut out = Vec::new();
        let mut cx = Execution::new(&runtime, &mut out);
        assert!(matches!(
            cx.execute_node(load),
            Err(GraphError::UnboundVariable(BindingId(7)))
        ));
        let mut codegen = Codegen::new(&runtime);
        assert!(codegen.emit_node(load).is_err());
    }
}
