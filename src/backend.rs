//! The two interpreters over the node IR: direct execution and source emission.
//!
//! Both walk the graph on demand. A node asks its context to evaluate the producer behind each
//! input, which recursively evaluates that producer's own inputs. Variable bindings created by
//! store nodes live in the context for the duration of one run.

use std::io::Write;

use ahash::HashMap;

use crate::{AbsoluteBlockHandle, GraphError, Runtime, Slot, SlotRef, Value};

/// Identity of one materialized variable, shared by a store node and all of its loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingId(pub u32);

/// State of one execution run.
pub struct Execution<'a> {
    runtime: &'a Runtime,
    out: &'a mut dyn Write,
    bindings: HashMap<BindingId, Value>,
}

impl<'a> Execution<'a> {
    /// Start a run whose side effects are written to `out`.
    pub fn new(runtime: &'a Runtime, out: &'a mut dyn Write) -> Self {
        Self {
            runtime,
            out,
            bindings: HashMap::default(),
        }
    }

    /// The runtime owning the nodes.
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// Sink for side effects.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Execute the node behind `handle`.
    pub fn execute_node(&mut self, handle: AbsoluteBlockHandle) -> Result<(), GraphError> {
        let runtime = self.runtime;
        let mut node = runtime.borrow_node_mut(handle)?;
        runtime.tracer().on_execute(handle, node.type_guid());
        node.execute(handle, self)
    }

    /// Execute the producer connected to `slot`, then read the value it wrote.
    ///
    /// `at` is the address of `slot`, used for error reporting.
    pub fn input(&mut self, slot: &Slot, at: SlotRef) -> Result<Value, GraphError> {
        let output = slot
            .sole_connection()
            .ok_or(GraphError::MissingInput(at))?
            .output;
        self.execute_node(output.node)?;
        let producer = self.runtime.borrow_node(output.node)?;
        let value = producer
            .outputs()
            .get(output.index)
            .ok_or(GraphError::NoSuchSlot(output))?
            .value();
        value.ok_or(GraphError::NoValue(output))
    }

    /// Record the value of a variable.
    pub fn bind(&mut self, binding: BindingId, value: Value) {
        self.bindings.insert(binding, value);
    }

    /// The value of a variable recorded earlier in this run.
    pub fn bound(&self, binding: BindingId) -> Result<Value, GraphError> {
        self.bindings
            .get(&binding)
            .copied()
            .ok_or(GraphError::UnboundVariable(binding))
    }
}

/// State of one code generation run.
pub struct Codegen<'a> {
    runtime: &'a Runtime,
    names: HashMap<BindingId, String>,
    next_name: usize,
}

impl<'a> Codegen<'a> {
    /// Start a run. Variable names restart from `v0`.
    pub fn new(runtime: &'a Runtime) -> Self {
        Self {
            runtime,
            names: HashMap::default(),
            next_name: 0,
        }
    }

    /// The runtime owning the nodes.
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// Emit the node behind `handle`.
    pub fn emit_node(&mut self, handle: AbsoluteBlockHandle) -> Result<String, GraphError> {
        let runtime = self.runtime;
        let mut node = runtime.borrow_node_mut(handle)?;
        runtime.tracer().on_emit(handle, node.type_guid());
        node.emit_code(handle, self)
    }

    /// Emit the producer connected to `slot`.
    pub fn input(&mut self, slot: &Slot, at: SlotRef) -> Result<String, GraphError> {
        let output = slot
            .sole_connection()
            .ok_or(GraphError::MissingInput(at))?
            .output;
        self.emit_node(output.node)
    }

    /// A variable name not yet used in this run: `v0`, `v1`, and so on. No name is a C keyword.
    pub fn fresh_name(&mut self) -> String {
        let name = format!("v{}", self.next_name);
        self.next_name += 1;
        name
    }

    /// Record the name chosen for a variable.
    pub fn bind_name(&mut self, binding: BindingId, name: String) {
        self.names.insert(binding, name);
    }

    /// The name of a variable declared earlier in this run.
    pub fn name_of(&self, binding: BindingId) -> Result<&str, GraphError> {
        self.names
            .get(&binding)
            .map(String::as_str)
            .ok_or(GraphError::UnboundVariable(binding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_names() {
        let runtime = Runtime::new();
        let mut cx = Codegen::new(&runtime);
        let names: Vec<_> = (0..200).map(|_| cx.fresh_name()).collect();
        assert_eq!(names[0], "v0");
        assert_eq!(names[1], "v1");
        assert_eq!(names[199], "v199");
        let keywords = ["do", "if", "int", "for", "auto", "char", "long", "goto"];
        assert!(names.iter().all(|name| !keywords.contains(&name.as_str())));
    }

    #[test]
    fn test_unbound_variable() {
        let runtime = Runtime::new();
        let mut out = Vec::new();
        let cx = Execution::new(&runtime, &mut out);
        assert!(matches!(
            cx.bound(BindingId(4)),
            Err(GraphError::UnboundVariable(BindingId(4)))
        ));
        let codegen = Codegen::new(&runtime);
        assert!(codegen.name_of(BindingId(0)).is_err());
    }
}
