//! Property-based tests for the basic provider: capability reports stay
//! consistent with graph shapes, and compiled kernels compute the same
//! product no matter how their operands are sourced.

use proptest::prelude::*;

use graft_core::{
    CompileRequest, CompiledUnit, ComputeContext, DataType, ExecutionProvider, FusedNode, Graph,
    GraphBuilder, GraphSupportInfo, HardwareDevice, KernelContext, ProviderDevice, Tensor,
};
use graft_providers::{BasicExecutionProvider, BASIC_EP_NAME};

// Strategy for small static shapes.
fn small_shape() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1..=4usize, 1..=3)
}

// Strategy for a shape plus two operand buffers of matching length.
fn operands() -> impl Strategy<Value = (Vec<usize>, Vec<f32>, Vec<f32>)> {
    small_shape().prop_flat_map(|shape| {
        let len = shape.iter().product::<usize>();
        (
            Just(shape),
            prop::collection::vec(-100.0f32..100.0, len),
            prop::collection::vec(-100.0f32..100.0, len),
        )
    })
}

fn basic_provider() -> BasicExecutionProvider {
    BasicExecutionProvider::new(ProviderDevice::new(HardwareDevice::cpu()))
}

/// Report, extract, and compile the first claimed group as `fused_0`.
fn compile_first_unit(provider: &BasicExecutionProvider, graph: &Graph) -> CompiledUnit {
    let mut support = GraphSupportInfo::for_graph(graph);
    provider
        .report_capability(graph, &mut support)
        .expect("capability report should succeed");
    let group = &support.groups()[0];
    let subgraph = graph
        .extract_subgraph(&group.nodes, group.options.drop_constant_initializers)
        .expect("subgraph extraction should succeed");
    let fused = FusedNode::new("fused_0", BASIC_EP_NAME);
    let mut units = provider
        .compile(&[CompileRequest {
            subgraph: &subgraph,
            fused_node: &fused,
        }])
        .expect("compile should succeed");
    units.remove(0)
}

proptest! {
    #[test]
    fn test_claim_follows_shape_equality(shape_a in small_shape(), shape_b in small_shape()) {
        let mut builder = GraphBuilder::new("p");
        builder
            .add_value("A", DataType::F32, &shape_a)
            .add_value("B", DataType::F32, &shape_b)
            .add_value("C", DataType::F32, &shape_a)
            .add_node("Mul", "mul_0", &["A", "B"], &["C"]);
        builder.set_inputs(&["A", "B"]).set_outputs(&["C"]);
        let graph = builder.build().expect("graph should validate");

        let mut support = GraphSupportInfo::for_graph(&graph);
        basic_provider()
            .report_capability(&graph, &mut support)
            .expect("capability report should succeed");

        prop_assert_eq!(support.is_empty(), shape_a != shape_b);
        for group in support.groups() {
            for name in &group.nodes {
                prop_assert!(graph.node(name).is_some());
            }
        }
    }

    #[test]
    fn test_product_matches_reference((shape, a, b) in operands(), mode in 0..3u8) {
        // mode 0: both operands live, 1: first constant, 2: both constant.
        let mut builder = GraphBuilder::new("p");
        match mode {
            0 => {
                builder
                    .add_value("A", DataType::F32, &shape)
                    .add_value("B", DataType::F32, &shape);
                builder.set_inputs(&["A", "B"]);
            }
            1 => {
                let constant = Tensor::from_f32(a.clone(), shape.clone()).expect("tensor");
                builder
                    .add_initializer("A", constant)
                    .add_value("B", DataType::F32, &shape);
                builder.set_inputs(&["B"]);
            }
            _ => {
                builder
                    .add_initializer("A", Tensor::from_f32(a.clone(), shape.clone()).expect("tensor"))
                    .add_initializer("B", Tensor::from_f32(b.clone(), shape.clone()).expect("tensor"));
                builder.set_inputs(&[]);
            }
        }
        builder
            .add_value("C", DataType::F32, &shape)
            .add_node("Mul", "mul_0", &["A", "B"], &["C"])
            .set_outputs(&["C"]);
        let graph = builder.build().expect("graph should validate");

        let provider = basic_provider();
        let unit = compile_first_unit(&provider, &graph);
        let state = unit
            .descriptor
            .create_state(&ComputeContext::new("fused_0"))
            .expect("state should resolve");

        let mut live = Vec::new();
        if mode == 0 {
            live.push(Tensor::from_f32(a.clone(), shape.clone()).expect("tensor"));
        }
        if mode < 2 {
            live.push(Tensor::from_f32(b.clone(), shape.clone()).expect("tensor"));
        }
        let mut context = KernelContext::new(live, 1);
        unit.descriptor
            .compute(&state, &mut context)
            .expect("compute should succeed");

        let expected: Vec<f32> = a.iter().zip(b.iter()).map(|(x, y)| x * y).collect();
        let output = context.output(0).expect("output should be allocated");
        prop_assert_eq!(output.shape(), shape.as_slice());
        prop_assert_eq!(output.as_f32().expect("f32 output"), expected.as_slice());
        unit.descriptor.release_state(state);
    }

    #[test]
    fn test_missing_runtime_input_always_fails((shape, a, _b) in operands()) {
        let mut builder = GraphBuilder::new("p");
        builder
            .add_value("A", DataType::F32, &shape)
            .add_value("B", DataType::F32, &shape)
            .add_value("C", DataType::F32, &shape)
            .add_node("Mul", "mul_0", &["A", "B"], &["C"]);
        builder.set_inputs(&["A", "B"]).set_outputs(&["C"]);
        let graph = builder.build().expect("graph should validate");

        let provider = basic_provider();
        let unit = compile_first_unit(&provider, &graph);
        let state = unit
            .descriptor
            .create_state(&ComputeContext::new("fused_0"))
            .expect("state should resolve");

        // Only one of two live inputs arrives and no constant fills the gap.
        let partial = vec![Tensor::from_f32(a, shape).expect("tensor")];
        let mut context = KernelContext::new(partial, 1);
        prop_assert!(unit.descriptor.compute(&state, &mut context).is_err());
        prop_assert!(context.output(0).is_none());
        unit.descriptor.release_state(state);
    }
}
