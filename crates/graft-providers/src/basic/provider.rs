//! The basic execution provider.
//!
//! A deliberately small backend that exercises the full provider contract:
//! - claims single `Mul` nodes over statically shaped F32 tensors,
//! - asks the host to drop constant initializers from runtime inputs,
//! - materializes those constants into a provider-owned table at compile
//!   time and resolves them again at each invocation.
//!
//! All entry points run on host threads; the provider spawns nothing. The
//! constant and kernel tables are concurrent maps, so compute-time lookups
//! from multiple host threads need no provider-side locking.

use std::sync::Arc;

use tracing::{debug, info, warn};

use graft_core::{
    CompileRequest, CompiledUnit, DataType, ExecutionProvider, FusionOptions, Graph,
    GraphSupportInfo, Node, ProviderDevice, ProviderError, ProviderOptions, Result,
};

use super::kernel::{ConstantInitializer, ConstantTable, KernelTable, MulComputeDescriptor, MulKernel};
use super::BASIC_EP_NAME;

/// CPU-only provider that executes fused elementwise-multiply units.
pub struct BasicExecutionProvider {
    device: ProviderDevice,
    constants: Arc<ConstantTable>,
    kernels: Arc<KernelTable>,
}

impl BasicExecutionProvider {
    /// Create a provider bound to one accepted device.
    pub fn new(device: ProviderDevice) -> Self {
        Self {
            device,
            constants: Arc::new(ConstantTable::new()),
            kernels: Arc::new(KernelTable::new()),
        }
    }

    /// The device this provider was created for.
    pub fn device(&self) -> &ProviderDevice {
        &self.device
    }

    /// Look up a materialized constant by value name.
    pub fn constant(&self, name: &str) -> Option<Arc<ConstantInitializer>> {
        self.constants.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a kernel is currently registered under the fused-node name.
    pub fn has_kernel(&self, fused_node_name: &str) -> bool {
        self.kernels.contains_key(fused_node_name)
    }

    /// Number of currently registered kernels.
    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    /// Copy every constant initializer of `subgraph` into the provider table.
    ///
    /// Runs before any kernel of the compile batch is constructed. Constants
    /// already present are overwritten with identical data, so recompiling a
    /// unit is harmless. A constant with a non-F32 element type fails the
    /// whole compile call.
    fn save_constant_initializers(&self, subgraph: &Graph) -> Result<()> {
        let mut copied = 0usize;
        for info in subgraph.values() {
            if !info.is_constant_initializer() {
                continue;
            }
            let tensor = subgraph.initializer(&info.name).ok_or_else(|| {
                ProviderError::fail(format!(
                    "constant initializer '{}' has no tensor data",
                    info.name
                ))
            })?;
            let snapshot = ConstantInitializer::from_tensor(&info.name, tensor)?;
            self.constants.insert(info.name.clone(), Arc::new(snapshot));
            copied += 1;
        }
        if copied > 0 {
            debug!("Materialized {} constant initializer(s)", copied);
        }
        Ok(())
    }
}

/// Whether the provider can execute `node` as a standalone fused unit.
fn node_is_supported(graph: &Graph, node: &Node) -> bool {
    if node.op_type != "Mul" {
        return false;
    }
    if node.inputs.len() != 2 || node.outputs.len() != 1 {
        debug!("Skipping '{}': expected 2 inputs and 1 output", node.name);
        return false;
    }

    let Some(lhs) = value_shape(graph, &node.name, &node.inputs[0]) else {
        return false;
    };
    let Some(rhs) = value_shape(graph, &node.name, &node.inputs[1]) else {
        return false;
    };
    if lhs != rhs {
        debug!(
            "Skipping '{}': input shapes {:?} and {:?} differ",
            node.name, lhs, rhs
        );
        return false;
    }
    value_shape(graph, &node.name, &node.outputs[0]).is_some()
}

/// The fully static F32 shape of a declared value, or `None` with a log line
/// explaining why the node cannot be claimed.
fn value_shape(graph: &Graph, node_name: &str, value_name: &str) -> Option<Vec<usize>> {
    let Some(info) = graph.value(value_name) else {
        debug!("Skipping '{node_name}': value '{value_name}' is not declared");
        return None;
    };
    if info.dtype != DataType::F32 {
        debug!("Skipping '{node_name}': value '{value_name}' is not F32");
        return None;
    }
    let Some(dims) = info.static_dims() else {
        debug!("Skipping '{node_name}': value '{value_name}' has a dynamic shape");
        return None;
    };
    Some(dims)
}

impl ExecutionProvider for BasicExecutionProvider {
    fn name(&self) -> &str {
        BASIC_EP_NAME
    }

    fn report_capability(&self, graph: &Graph, support: &mut GraphSupportInfo) -> Result<()> {
        for node in graph.nodes() {
            if !node_is_supported(graph, node) {
                continue;
            }
            let options = FusionOptions {
                drop_constant_initializers: true,
            };
            support.add_nodes_to_fuse(vec![node.name.clone()], options)?;
            info!(
                "Claimed node '{}' from graph '{}'",
                node.name,
                graph.name()
            );
            // One unit per graph; a fuller backend would keep scanning.
            break;
        }
        if support.is_empty() {
            debug!("No supported nodes in graph '{}'", graph.name());
        }
        Ok(())
    }

    fn compile(&self, requests: &[CompileRequest<'_>]) -> Result<Vec<CompiledUnit>> {
        // Validate and build every kernel first; nothing is published until
        // the whole batch has passed, so a failed request registers no kernel.
        let mut staged: Vec<(String, Arc<MulKernel>)> = Vec::with_capacity(requests.len());
        for request in requests {
            self.save_constant_initializers(request.subgraph)?;

            let fused_name = &request.fused_node.name;
            let [node] = request.subgraph.nodes() else {
                return Err(ProviderError::fail(format!(
                    "fused node '{}' should contain exactly 1 node, got {}",
                    fused_name,
                    request.subgraph.nodes().len()
                )));
            };
            if node.op_type != "Mul" {
                return Err(ProviderError::fail(format!(
                    "fused node '{}' contains unsupported op '{}'",
                    fused_name, node.op_type
                )));
            }
            if node.inputs.len() != 2 || node.outputs.len() != 1 {
                return Err(ProviderError::fail(format!(
                    "fused node '{}' has {} inputs and {} outputs, expected 2 and 1",
                    fused_name,
                    node.inputs.len(),
                    node.outputs.len()
                )));
            }
            if request.fused_node.provider != self.name() {
                return Err(ProviderError::fail(format!(
                    "fused node '{}' is assigned to provider '{}', not '{}'",
                    fused_name,
                    request.fused_node.provider,
                    self.name()
                )));
            }
            if self.kernels.contains_key(fused_name)
                || staged.iter().any(|(name, _)| name == fused_name)
            {
                return Err(ProviderError::fail(format!(
                    "a compiled unit named '{fused_name}' is already registered"
                )));
            }

            let kernel = Arc::new(MulKernel::new(node, Arc::clone(&self.constants)));
            staged.push((fused_name.clone(), kernel));
        }

        let mut units = Vec::with_capacity(staged.len());
        for (name, kernel) in staged {
            self.kernels.insert(name.clone(), kernel);
            units.push(CompiledUnit {
                descriptor: Box::new(MulComputeDescriptor::new(name, Arc::clone(&self.kernels))),
                replacement_node: None,
            });
        }
        info!(
            "Compiled {} unit(s), {} kernel(s) now registered",
            units.len(),
            self.kernels.len()
        );
        Ok(units)
    }

    fn configure(&mut self, options: &ProviderOptions) -> Result<()> {
        for key in options.keys() {
            warn!("Unknown configuration option: {}", key);
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        info!(
            "Shutting down basic provider: dropping {} kernel(s) and {} constant(s)",
            self.kernels.len(),
            self.constants.len()
        );
        self.kernels.clear();
        self.constants.clear();
        Ok(())
    }
}
