//! Materialization of shared values, turning a graph into an ordered forest of statements.
//!
//! Executing a [`NodeGraph`] re-evaluates a value once for every consumer reading it.
//! [`forestify`] rewrites each output read by more than one input into a single
//! [`StoreNode`] plus one [`LoadNode`] per former reader, and schedules the stores ahead of the
//! graph's sinks so that every store runs before any load of its variable.

use std::io::Write;

use ahash::{HashMap, HashSet};

use crate::{
    AbsoluteBlockHandle, BindingId, Codegen, Execution, GraphError, LoadNode, NodeGraph,
    NodeKind, Runtime, SlotRef, SlotTypeGuid, StoreNode,
};

/// An ordered sequence of roots: materialized stores first, then the sinks of the source graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeForest {
    roots: Vec<AbsoluteBlockHandle>,
}

impl NodeForest {
    /// The roots in evaluation order.
    pub fn roots(&self) -> &[AbsoluteBlockHandle] {
        &self.roots
    }

    /// Execute every root in order, writing side effects to `out`.
    pub fn execute(&self, runtime: &Runtime, out: &mut dyn Write) -> Result<(), GraphError> {
        let mut cx = Execution::new(runtime, out);
        for &root in &self.roots {
            cx.execute_node(root)?;
        }
        Ok(())
    }

    /// Emit one statement per root, each terminated by `;` and a newline.
    pub fn emit_code(&self, runtime: &Runtime) -> Result<String, GraphError> {
        let mut cx = Codegen::new(runtime);
        let mut code = String::new();
        for &root in &self.roots {
            code.push_str(&cx.emit_node(root)?);
            code.push_str(";\n");
        }
        Ok(code)
    }

    /// Like [`NodeForest::emit_code`], wrapped in a `{ ... }` block.
    pub fn emit_block(&self, runtime: &Runtime) -> Result<String, GraphError> {
        Ok(format!("{{\n{}}}\n", self.emit_code(runtime)?))
    }
}

/// Materialize every shared value reachable from the sinks of `graph` and order the result.
///
/// The rewiring is destructive: `graph` is consumed, and its nodes now belong to the returned
/// forest. [`StoreNode`] and [`LoadNode`] must be registered with `runtime`, and only integer
/// values can be materialized.
pub fn forestify(runtime: &mut Runtime, graph: NodeGraph) -> Result<NodeForest, GraphError> {
    let mut stores = Vec::new();
    let mut path = HashSet::default();
    for &sink in graph.finals() {
        materialize(runtime, sink, &mut path, &mut stores)?;
    }

    let mut roots = schedule(runtime, &stores)?;
    tracing::debug!(
        stores = roots.len(),
        sinks = graph.finals().len(),
        "forestified graph"
    );
    roots.extend_from_slice(graph.finals());
    Ok(NodeForest { roots })
}

/// Walk backwards from `node`, replacing every shared output with a store and its loads.
///
/// New stores are appended to `stores` in discovery order. `path` holds the nodes being walked;
/// reaching one of them again means the graph is cyclic.
fn materialize(
    runtime: &mut Runtime,
    node: AbsoluteBlockHandle,
    path: &mut HashSet<AbsoluteBlockHandle>,
    stores: &mut Vec<(AbsoluteBlockHandle, BindingId)>,
) -> Result<(), GraphError> {
    if !path.insert(node) {
        return Err(GraphError::NodeBusy(node));
    }
    let arity = runtime.borrow_node(node)?.inputs().len();
    for index in 0..arity {
        let input = SlotRef::input(node, index);
        let output = runtime.producer_of(input)?;
        let readers = runtime.connections(output)?;

        if readers.len() > 1 {
            let output_type = runtime.slot_type(output)?;
            if output_type != SlotTypeGuid::INTEGER {
                return Err(GraphError::SlotTypeMismatch {
                    input,
                    input_type: SlotTypeGuid::INTEGER,
                    output,
                    output_type,
                });
            }

            let binding = runtime.fresh_binding();
            let store = runtime.allocate(StoreNode::new(binding))?;
            let mut loads = Vec::with_capacity(readers.len());
            for reader in &readers {
                let load = runtime.allocate(LoadNode::new(store, binding))?;
                runtime.connect(reader.input, SlotRef::output(load, 0))?;
                loads.push(load);
            }
            runtime.connect(SlotRef::input(store, 0), output)?;
            runtime.tracer().on_materialize(store, &loads);
            stores.push((store, binding));
        }

        materialize(runtime, output.node, path, stores)?;
    }
    path.remove(&node);
    Ok(())
}

/// Order stores so that each one follows every store its producer loads from.
///
/// Stores are visited in reverse discovery order, which is already correct whenever a store is
/// discovered while walking below the store that reads it.
fn schedule(
    runtime: &Runtime,
    stores: &[(AbsoluteBlockHandle, BindingId)],
) -> Result<Vec<AbsoluteBlockHandle>, GraphError> {
    let by_binding: HashMap<BindingId, AbsoluteBlockHandle> = stores
        .iter()
        .map(|&(store, binding)| (binding, store))
        .collect();

    let mut order = Vec::with_capacity(stores.len());
    let mut visited = HashSet::default();
    for &(store, _) in stores.iter().rev() {
        visit(runtime, store, &by_binding, &mut visited, &mut order)?;
    }
    Ok(order)
}

fn visit(
    runtime: &Runtime,
    store: AbsoluteBlockHandle,
    by_binding: &HashMap<BindingId, AbsoluteBlockHandle>,
    visited: &mut HashSet<AbsoluteBlockHandle>,
    order: &mut Vec<AbsoluteBlockHandle>,
) -> Result<(), GraphError> {
    if !visited.insert(store) {
        return Ok(());
    }
    for dependency in loaded_stores(runtime, store, by_binding)? {
        visit(runtime, dependency, by_binding, visited, order)?;
    }
    order.push(store);
    Ok(())
}

/// The stores whose variables are loaded somewhere below `store`, in walk order.
fn loaded_stores(
    runtime: &Runtime,
    store: AbsoluteBlockHandle,
    by_binding: &HashMap<BindingId, AbsoluteBlockHandle>,
) -> Result<Vec<AbsoluteBlockHandle>, GraphError> {
    let mut found = Vec::new();
    let mut seen = HashSet::default();
    let mut pending = vec![store];
    while let Some(node) = pending.pop() {
        if !seen.insert(node) {
            continue;
        }
        if runtime.type_of(node)? == LoadNode::GUID {
            let binding = runtime.node::<LoadNode>(node)?.binding();
            if let Some(&dependency) = by_binding.get(&binding) {
                found.push(dependency);
            }
            continue;
        }
        let arity = runtime.borrow_node(node)?.inputs().len();
        for index in (0..arity).rev() {
            pending.push(runtime.producer_of(SlotRef::input(node, index))?.node);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{register_standard_library, AdditionNode, LiteralNode, PrinterNode};

    fn runtime() -> Runtime {
        let mut runtime = Runtime::new();
        register_standard_library(&mut runtime).unwrap();
        runtime
    }

    fn wire(
        runtime: &Runtime,
        consumer: AbsoluteBlockHandle,
        index: usize,
        producer: AbsoluteBlockHandle,
    ) {
        runtime
            .connect(SlotRef::input(consumer, index), SlotRef::output(producer, 0))
            .unwrap();
    }

    fn printed(runtime: &Runtime, forest: &NodeForest) -> String {
        let mut out = Vec::new();
        forest.execute(runtime, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_both_inputs_from_one_producer() {
        let mut runtime = runtime();
        let literal = runtime.allocate(LiteralNode::new(21)).unwrap();
        let add = runtime.allocate(AdditionNode::default()).unwrap();
        let printer = runtime.allocate(PrinterNode::default()).unwrap();
        wire(&runtime, add, 0, literal);
        wire(&runtime, add, 1, literal);
        wire(&runtime, printer, 0, add);

        let forest = forestify(&mut runtime, NodeGraph::from_finals(vec![printer])).unwrap();
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(runtime.type_of(forest.roots()[0]).unwrap(), StoreNode::GUID);
        assert_eq!(printed(&runtime, &forest), "42\n");

        let a = runtime.producer_of(SlotRef::input(add, 0)).unwrap().node;
        let b = runtime.producer_of(SlotRef::input(add, 1)).unwrap().node;
        assert_ne!(a, b);
        assert_eq!(
            runtime.node::<LoadNode>(a).unwrap().store(),
            Some(forest.roots()[0])
        );
    }

    #[test]
    fn test_store_discovered_before_its_dependent() {
        // The literal is shared by the first printer and by the addition; the addition is
        // shared by the other two printers. The literal's store is found first but must run
        // first as well.
        let mut runtime = runtime();
        let literal = runtime.allocate(LiteralNode::new(5)).unwrap();
        let one = runtime.allocate(LiteralNode::new(1)).unwrap();
        let add = runtime.allocate(AdditionNode::default()).unwrap();
        let p0 = runtime.allocate(PrinterNode::default()).unwrap();
        let p1 = runtime.allocate(PrinterNode::default()).unwrap();
        let p2 = runtime.allocate(PrinterNode::default()).unwrap();
        wire(&runtime, p0, 0, literal);
        wire(&runtime, add, 0, literal);
        wire(&runtime, add, 1, one);
        wire(&runtime, p1, 0, add);
        wire(&runtime, p2, 0, add);

        let graph = NodeGraph::from_finals(vec![p0, p1, p2]);
        let forest = forestify(&mut runtime, graph).unwrap();
        assert_eq!(forest.roots().len(), 5);
        assert_eq!(&forest.roots()[2..], &[p0, p1, p2]);

        let first = runtime.node::<StoreNode>(forest.roots()[0]).unwrap().binding();
        let second = runtime.node::<StoreNode>(forest.roots()[1]).unwrap().binding();
        let producer = |store| runtime.producer_of(SlotRef::input(store, 0)).unwrap().node;
        assert_eq!(producer(forest.roots()[0]), literal);
        assert_eq!(producer(forest.roots()[1]), add);
        assert_ne!(first, second);

        assert_eq!(printed(&runtime, &forest), "5\n6\n6\n");
        assert_eq!(
            forest.emit_code(&runtime).unwrap(),
            "long long v0 = 5LL;\n\
             long long v1 = v0 + 1LL;\n\
             printf(\"%lld\\n\", v0);\n\
             printf(\"%lld\\n\", v1);\n\
             printf(\"%lld\\n\", v1);\n"
        );
    }

    #[test]
    fn test_emit_block() {
        let mut runtime = runtime();
        let literal = runtime.allocate(LiteralNode::new(7)).unwrap();
        let printer = runtime.allocate(PrinterNode::default()).unwrap();
        wire(&runtime, printer, 0, literal);

        let forest = forestify(&mut runtime, NodeGraph::from_finals(vec![printer])).unwrap();
        assert_eq!(
            forest.emit_block(&runtime).unwrap(),
            "{\nprintf(\"%lld\\n\", 7LL);\n}\n"
        );
    }

    #[test]
    fn test_unregistered_store_type() {
        let mut runtime = Runtime::new();
        runtime
            .register_node_type::<LiteralNode>(
                crate::NodeSignature::new(LiteralNode::NAME).output("out", SlotTypeGuid::INTEGER),
            )
            .unwrap();
        runtime
            .register_node_type::<PrinterNode>(
                crate::NodeSignature::new(PrinterNode::NAME).input("in", SlotTypeGuid::INTEGER),
            )
            .unwrap();
        let literal = runtime.allocate(LiteralNode::new(1)).unwrap();
        let p0 = runtime.allocate(PrinterNode::default()).unwrap();
        let p1 = runtime.allocate(PrinterNode::default()).unwrap();
        wire(&runtime, p0, 0, literal);
        wire(&runtime, p1, 0, literal);

        assert!(matches!(
            forestify(&mut runtime, NodeGraph::from_finals(vec![p0, p1])),
            Err(GraphError::UnregisteredNodeType(guid)) if guid == StoreNode::GUID
        ));
    }
}
