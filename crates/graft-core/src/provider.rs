//! The three-phase contract between a host and an execution provider.
//!
//! A provider moves through three phases, always called from host threads:
//! 1. **Capability query**: [`ExecutionProvider::report_capability`] declares
//!    which graph nodes the provider will execute, grouped into fusion units.
//! 2. **Compile**: [`ExecutionProvider::compile`] binds each delegated
//!    (subgraph, fused node) pair to a provider-owned kernel and returns one
//!    opaque [`ComputeDescriptor`] per unit.
//! 3. **Compute**: the host drives each descriptor through
//!    `create_state -> compute* -> release_state` once per inference.
//!
//! Dropping a [`CompiledUnit`] releases the compiled state it refers to; the
//! provider's name mapping must no longer resolve that unit afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::boundary::ComputeState;
use crate::error::{ProviderError, Result};
use crate::graph::{Graph, Node};
use crate::tensor::{DataType, Tensor};

/// String key-value options configuring a provider instance.
pub type ProviderOptions = HashMap<String, String>;

/// Per-group options a provider attaches to a capability report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionOptions {
    /// When set, the provider copies constant initializers out during
    /// compilation and the host stops supplying them at every invocation.
    pub drop_constant_initializers: bool,
}

/// One group of nodes a provider claims for fusion into a single unit.
#[derive(Debug, Clone)]
pub struct NodeGroup {
    /// Names of the claimed nodes.
    pub nodes: Vec<String>,
    /// Options applied to the group.
    pub options: FusionOptions,
}

/// Host-owned collector for a provider's capability report.
#[derive(Debug)]
pub struct GraphSupportInfo {
    known_nodes: HashSet<String>,
    groups: Vec<NodeGroup>,
}

impl GraphSupportInfo {
    /// Create a collector bound to the nodes of the given graph.
    pub fn for_graph(graph: &Graph) -> Self {
        Self {
            known_nodes: graph.nodes().iter().map(|node| node.name.clone()).collect(),
            groups: Vec::new(),
        }
    }

    /// Claim a group of nodes for fusion.
    ///
    /// Every claimed name must belong to the graph this collector was created
    /// for; claiming an unknown node is a hard error, as is an empty group.
    pub fn add_nodes_to_fuse(&mut self, nodes: Vec<String>, options: FusionOptions) -> Result<()> {
        if nodes.is_empty() {
            return Err(ProviderError::invalid_argument(
                "cannot claim an empty fusion group",
            ));
        }
        for name in &nodes {
            if !self.known_nodes.contains(name) {
                return Err(ProviderError::fail(format!(
                    "claimed node '{name}' is not part of the graph"
                )));
            }
        }
        self.groups.push(NodeGroup { nodes, options });
        Ok(())
    }

    /// Claimed groups, in the order the provider added them.
    pub fn groups(&self) -> &[NodeGroup] {
        &self.groups
    }

    /// Whether the provider claimed nothing. An empty report is a valid
    /// outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The host-assigned identity of one fused unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedNode {
    /// Name the host will use to address the compiled unit.
    pub name: String,
    /// Name of the provider the host routed this unit to.
    pub provider: String,
}

impl FusedNode {
    /// Create a fused-node identity.
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
        }
    }
}

/// One (subgraph, fused node) pair the host delegates in a compile call.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// The claimed subgraph, read-only for the duration of the call.
    pub subgraph: &'a Graph,
    /// The identity assigned to the resulting unit.
    pub fused_node: &'a FusedNode,
}

/// The result of compiling one fused unit.
pub struct CompiledUnit {
    /// Opaque per-unit object the host drives at inference time. Ownership
    /// transfers to the host; dropping it releases the compiled state.
    pub descriptor: Box<dyn ComputeDescriptor>,
    /// Optional node the host may splice into its graph in place of the
    /// fused subgraph.
    pub replacement_node: Option<Node>,
}

impl std::fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("descriptor", &"<dyn ComputeDescriptor>")
            .field("replacement_node", &self.replacement_node)
            .finish()
    }
}

/// Per-unit context handed to [`ComputeDescriptor::create_state`].
#[derive(Debug, Clone)]
pub struct ComputeContext {
    node_name: String,
}

impl ComputeContext {
    /// Create a context for the fused node of one compiled unit.
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Name of the fused node being set up.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }
}

/// Per-invocation execution context handed to [`ComputeDescriptor::compute`].
///
/// Inputs are the runtime tensors the host supplies, in fused-node input
/// order with dropped constants omitted. Outputs are allocated on demand by
/// the kernel through [`KernelContext::allocate_output`].
#[derive(Debug)]
pub struct KernelContext {
    inputs: Vec<Arc<Tensor>>,
    outputs: Vec<Option<Tensor>>,
}

impl KernelContext {
    /// Create a context supplying the given inputs and room for
    /// `output_count` outputs.
    pub fn new(inputs: Vec<Tensor>, output_count: usize) -> Self {
        Self {
            inputs: inputs.into_iter().map(Arc::new).collect(),
            outputs: (0..output_count).map(|_| None).collect(),
        }
    }

    /// Number of runtime inputs supplied.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Borrow a runtime input by position.
    pub fn input(&self, index: usize) -> Result<&Arc<Tensor>> {
        self.inputs.get(index).ok_or_else(|| {
            ProviderError::invalid_argument(format!(
                "input index {index} out of range ({} inputs)",
                self.inputs.len()
            ))
        })
    }

    /// Number of outputs the host expects.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Allocate the output at `index` and return it for in-place writing.
    pub fn allocate_output(
        &mut self,
        index: usize,
        dtype: DataType,
        shape: &[usize],
    ) -> Result<&mut Tensor> {
        let count = self.outputs.len();
        let slot = self.outputs.get_mut(index).ok_or_else(|| {
            ProviderError::invalid_argument(format!(
                "output index {index} out of range ({count} outputs)"
            ))
        })?;
        Ok(slot.insert(Tensor::zeros(shape.to_vec(), dtype)))
    }

    /// Borrow an output, or `None` if the kernel has not allocated it.
    pub fn output(&self, index: usize) -> Option<&Tensor> {
        self.outputs.get(index).and_then(Option::as_ref)
    }

    /// Take ownership of an output, leaving the slot empty.
    pub fn take_output(&mut self, index: usize) -> Option<Tensor> {
        self.outputs.get_mut(index).and_then(Option::take)
    }
}

/// A pluggable execution backend.
///
/// Implementations are purely reactive: they never spawn threads and execute
/// synchronously on whichever host thread calls in. Once `compile` has
/// returned for every unit sharing a provider, the provider's internal tables
/// must support concurrent read lookup from compute calls on multiple
/// threads.
pub trait ExecutionProvider: Send + Sync {
    /// Name of this provider, matched against [`FusedNode::provider`].
    fn name(&self) -> &str;

    /// Declare which nodes of `graph` this provider will execute.
    ///
    /// Returning without claiming anything is success, not an error.
    fn report_capability(&self, graph: &Graph, support: &mut GraphSupportInfo) -> Result<()>;

    /// Compile a batch of delegated units.
    ///
    /// Any rejected request aborts the whole call without registering any
    /// kernel from the batch.
    fn compile(&self, requests: &[CompileRequest<'_>]) -> Result<Vec<CompiledUnit>>;

    /// Apply configuration options to this provider.
    fn configure(&mut self, options: &ProviderOptions) -> Result<()>;

    /// Release provider-held resources ahead of destruction.
    fn shutdown(&self) -> Result<()>;
}

/// The per-unit state machine the host drives at inference time:
/// `create_state -> compute* -> release_state`.
pub trait ComputeDescriptor: Send + Sync {
    /// Resolve the kernel for the fused node named by `context` and wrap it
    /// in an opaque state handle. Fails if no kernel is registered under that
    /// name.
    fn create_state(&self, context: &ComputeContext) -> Result<ComputeState>;

    /// Execute the kernel held by `state` against the runtime context.
    fn compute(&self, state: &ComputeState, context: &mut KernelContext) -> Result<()>;

    /// Release per-invocation state produced by [`Self::create_state`].
    fn release_state(&self, state: ComputeState);
}

impl<T: ExecutionProvider + ?Sized> ExecutionProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn report_capability(&self, graph: &Graph, support: &mut GraphSupportInfo) -> Result<()> {
        (**self).report_capability(graph, support)
    }

    fn compile(&self, requests: &[CompileRequest<'_>]) -> Result<Vec<CompiledUnit>> {
        (**self).compile(requests)
    }

    fn configure(&mut self, options: &ProviderOptions) -> Result<()> {
        (**self).configure(options)
    }

    fn shutdown(&self) -> Result<()> {
        (**self).shutdown()
    }
}

impl<T: ComputeDescriptor + ?Sized> ComputeDescriptor for Box<T> {
    fn create_state(&self, context: &ComputeContext) -> Result<ComputeState> {
        (**self).create_state(context)
    }

    fn compute(&self, state: &ComputeState, context: &mut KernelContext) -> Result<()> {
        (**self).compute(state, context)
    }

    fn release_state(&self, state: ComputeState) {
        (**self).release_state(state);
    }
}
