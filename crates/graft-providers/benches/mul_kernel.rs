//! Benchmarks for the basic provider: steady-state compute throughput and
//! the one-time claim-and-compile path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use graft_core::{
    CompileRequest, CompiledUnit, ComputeContext, DataType, ExecutionProvider, FusedNode, Graph,
    GraphBuilder, GraphSupportInfo, HardwareDevice, KernelContext, ProviderDevice, Tensor,
};
use graft_providers::{BasicExecutionProvider, BASIC_EP_NAME};

fn mul_graph(len: usize) -> Graph {
    let mut builder = GraphBuilder::new("bench");
    builder
        .add_value("X", DataType::F32, &[len])
        .add_value("Y", DataType::F32, &[len])
        .add_value("Z", DataType::F32, &[len])
        .add_node("Mul", "mul_0", &["X", "Y"], &["Z"]);
    builder.set_inputs(&["X", "Y"]).set_outputs(&["Z"]);
    builder.build().expect("graph should validate")
}

fn compile_unit(provider: &BasicExecutionProvider, graph: &Graph) -> CompiledUnit {
    let mut support = GraphSupportInfo::for_graph(graph);
    provider
        .report_capability(graph, &mut support)
        .expect("capability report should succeed");
    let group = &support.groups()[0];
    let subgraph = graph
        .extract_subgraph(&group.nodes, group.options.drop_constant_initializers)
        .expect("subgraph extraction should succeed");
    let fused = FusedNode::new("fused_0", BASIC_EP_NAME);
    provider
        .compile(&[CompileRequest {
            subgraph: &subgraph,
            fused_node: &fused,
        }])
        .expect("compile should succeed")
        .remove(0)
}

fn bench_mul_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("mul_compute");
    for &len in &[64usize, 1024, 65536] {
        let provider = BasicExecutionProvider::new(ProviderDevice::new(HardwareDevice::cpu()));
        let graph = mul_graph(len);
        let unit = compile_unit(&provider, &graph);
        let state = unit
            .descriptor
            .create_state(&ComputeContext::new("fused_0"))
            .expect("state should resolve");
        let x = Tensor::from_f32(vec![1.5; len], vec![len]).expect("input tensor");
        let y = Tensor::from_f32(vec![2.0; len], vec![len]).expect("input tensor");

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                let mut context = KernelContext::new(vec![x.clone(), y.clone()], 1);
                unit.descriptor
                    .compute(&state, &mut context)
                    .expect("compute should succeed");
                black_box(context.take_output(0))
            });
        });
        unit.descriptor.release_state(state);
    }
    group.finish();
}

fn bench_claim_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let graph = mul_graph(1024);
    group.bench_function("claim_and_compile", |b| {
        b.iter(|| {
            let provider =
                BasicExecutionProvider::new(ProviderDevice::new(HardwareDevice::cpu()));
            black_box(compile_unit(&provider, &graph))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_mul_compute, bench_claim_and_compile);
criterion_main!(benches);
