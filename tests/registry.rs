//! Type registry, allocation and storage behavior through the public API.

use node_forest::{
    register_standard_library, AdditionNode, AllocationStrategy, Argument, GraphError,
    LiteralNode, LoadNode, Node, NodeKind, NodeTypeGuid, PrinterNode, Runtime, RuntimeConfig,
    SlotRef, SlotTypeGuid, StoreNode, Value,
};

fn runtime() -> Runtime {
    let mut runtime = Runtime::new();
    register_standard_library(&mut runtime).unwrap();
    runtime
}

// =============================================================================
// Introspection
// =============================================================================

#[test]
fn test_catalog_is_listed_in_registration_order() {
    let runtime = runtime();
    let names: Vec<_> = runtime.node_types().map(|info| info.name().to_owned()).collect();
    assert_eq!(
        names,
        [
            "IntegerLiteralNode",
            "IntegerAdditionNode",
            "IntegerPrinterNode",
            "StoreIntegerVariableNode",
            "LoadIntegerVariableNode",
        ]
    );
}

#[test]
fn test_signature_metadata() {
    let runtime = runtime();
    let add = runtime.node_type_by_name("IntegerAdditionNode").unwrap();
    assert_eq!(add.guid(), AdditionNode::GUID);
    assert_eq!(add.guid(), NodeTypeGuid::of_name("IntegerAdditionNode"));

    let inputs: Vec<_> = add.signature().inputs().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(inputs, ["a", "b"]);
    assert_eq!(add.signature().outputs().len(), 1);
    assert!(add
        .signature()
        .inputs()
        .iter()
        .all(|slot| slot.slot_type == SlotTypeGuid::INTEGER));

    let printer = runtime.node_type(PrinterNode::GUID).unwrap();
    assert_eq!(printer.signature().inputs().len(), 1);
    assert!(printer.signature().outputs().is_empty());
}

// =============================================================================
// Type Identity
// =============================================================================

#[test]
fn test_instances_match_registered_metadata() {
    let mut runtime = runtime();
    let guids: Vec<_> = runtime.node_types().map(|info| info.guid()).collect();
    for guid in guids {
        let args: &[Argument] = if guid == LiteralNode::GUID
            || guid == StoreNode::GUID
            || guid == LoadNode::GUID
        {
            &[Argument::Integer(0)]
        } else {
            &[]
        };
        let handle = runtime.allocate_node(guid, args).unwrap();
        let info = runtime.node_type(guid).unwrap();
        let node = runtime.borrow_node(handle).unwrap();
        assert_eq!(node.type_guid(), guid);
        assert_eq!(node.inputs().len(), info.signature().inputs().len());
        assert_eq!(node.outputs().len(), info.signature().outputs().len());
    }
}

#[test]
fn test_can_connect_is_symmetric() {
    let mut runtime = runtime();
    let literal = runtime.allocate(LiteralNode::new(1)).unwrap();
    let add = runtime.allocate(AdditionNode::default()).unwrap();
    let a = SlotRef::output(literal, 0);
    let b = SlotRef::input(add, 1);
    assert!(runtime.can_connect(a, b).unwrap());
    assert_eq!(
        runtime.can_connect(a, b).unwrap(),
        runtime.can_connect(b, a).unwrap()
    );
}

// =============================================================================
// Handles
// =============================================================================

#[test]
fn test_handles_stay_stable_across_allocations() {
    let mut runtime = runtime();
    let first = runtime.allocate(LiteralNode::new(11)).unwrap();
    let others: Vec<_> = (0..100)
        .map(|i| runtime.allocate(LiteralNode::new(i)).unwrap())
        .collect();
    let add = runtime.allocate(AdditionNode::default()).unwrap();
    for &other in others.iter().step_by(2) {
        runtime.free_node(other).unwrap();
    }
    let _refill: Vec<_> = (0..50)
        .map(|_| runtime.allocate(PrinterNode::default()).unwrap())
        .collect();

    assert_eq!(runtime.type_of(first).unwrap(), LiteralNode::GUID);
    assert_eq!(runtime.node::<LiteralNode>(first).unwrap().value(), 11);
    assert_eq!(runtime.type_of(add).unwrap(), AdditionNode::GUID);
    assert_eq!(runtime.node::<LiteralNode>(others[1]).unwrap().value(), 1);
}

#[test]
fn test_recycled_block_does_not_revive_handle() {
    let mut runtime = runtime();
    let old = runtime.allocate(LiteralNode::new(1)).unwrap();
    runtime.free_node(old).unwrap();
    let new = runtime.allocate(LiteralNode::new(2)).unwrap();

    assert_ne!(old, new);
    assert!(matches!(
        runtime.borrow_node(old),
        Err(GraphError::StaleHandle(_))
    ));
    assert_eq!(runtime.node::<LiteralNode>(new).unwrap().value(), 2);
}

#[test]
fn test_allocate_with_handle_gives_typed_view() {
    let mut runtime = runtime();
    let (handle, mut literal) = runtime.allocate_with_handle(LiteralNode::new(0)).unwrap();
    literal.populate(&[Argument::Integer(8)]).unwrap();
    drop(literal);
    assert_eq!(
        runtime.slot_value(SlotRef::output(handle, 0)).unwrap(),
        Some(Value::Integer(8))
    );
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_bump_strategy_never_reuses_blocks() {
    let config = RuntimeConfig::default().with_default_strategy(AllocationStrategy::Bump);
    let mut runtime = Runtime::from_config(config);
    register_standard_library(&mut runtime).unwrap();

    let a = runtime.allocate(LiteralNode::new(1)).unwrap();
    runtime.free_node(a).unwrap();
    let b = runtime.allocate(LiteralNode::new(2)).unwrap();
    assert_ne!(a.block().index(), b.block().index());
    assert!(runtime.borrow_node(a).is_err());
}

#[test]
fn test_max_blocks_limits_allocation() {
    let config = RuntimeConfig::default().with_max_blocks(2);
    let mut runtime = Runtime::from_config(config);
    register_standard_library(&mut runtime).unwrap();

    let a = runtime.allocate(LiteralNode::new(1)).unwrap();
    runtime.allocate(LiteralNode::new(2)).unwrap();
    assert!(matches!(
        runtime.allocate(LiteralNode::new(3)),
        Err(GraphError::OutOfBlocks(_))
    ));
    runtime.free_node(a).unwrap();
    runtime.allocate(LiteralNode::new(3)).unwrap();
}
