//! Kernels and compiled-unit state for the basic provider.
//!
//! A [`MulKernel`] is created once per fused unit during compilation and
//! invoked many times at inference. It binds the fused node's formal input
//! names plus a reference to the provider-wide constant table; at each
//! invocation it decides, per formal input, whether the operand arrives live
//! from the execution context or from a materialized constant. The same
//! resolution works for any n-ary elementwise kernel whose operands may have
//! been hoisted to constants.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use graft_core::{
    ComputeContext, ComputeDescriptor, ComputeState, DataType, KernelContext, Node, ProviderError,
    Result, Tensor,
};

/// Owned snapshot of one constant initializer: shape plus raw data.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantInitializer {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl ConstantInitializer {
    /// Copy a constant tensor out of a graph.
    ///
    /// Only F32 constants are accepted; any other element type among the
    /// declared constants is a protocol violation, not a skip.
    pub fn from_tensor(name: &str, tensor: &Tensor) -> Result<Self> {
        if tensor.dtype() != DataType::F32 {
            return Err(ProviderError::fail(format!(
                "constant initializer '{}' has element type {:?}, only F32 is supported",
                name,
                tensor.dtype()
            )));
        }
        Ok(Self {
            shape: tensor.shape().to_vec(),
            data: tensor.as_f32()?.to_vec(),
        })
    }

    /// Shape of the snapshot.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element data of the snapshot.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Provider-wide table of materialized constants, keyed by value name.
pub type ConstantTable = DashMap<String, Arc<ConstantInitializer>>;

/// Fused-node-name to kernel mapping owned by one provider.
pub(crate) type KernelTable = DashMap<String, Arc<MulKernel>>;

/// One operand of an elementwise invocation, after sourcing is decided.
enum ResolvedOperand {
    Live(Arc<Tensor>),
    Constant(Arc<ConstantInitializer>),
}

impl ResolvedOperand {
    fn shape(&self) -> &[usize] {
        match self {
            ResolvedOperand::Live(tensor) => tensor.shape(),
            ResolvedOperand::Constant(snapshot) => snapshot.shape(),
        }
    }

    fn values(&self) -> Result<&[f32]> {
        match self {
            ResolvedOperand::Live(tensor) => tensor.as_f32(),
            ResolvedOperand::Constant(snapshot) => Ok(snapshot.data()),
        }
    }
}

/// Elementwise-multiply kernel compiled for one fused unit.
pub struct MulKernel {
    node_name: String,
    input_names: Vec<String>,
    constants: Arc<ConstantTable>,
}

impl MulKernel {
    pub(crate) fn new(node: &Node, constants: Arc<ConstantTable>) -> Self {
        Self {
            node_name: node.name.clone(),
            input_names: node.inputs.clone(),
            constants,
        }
    }

    /// Name of the node this kernel was compiled from.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The kernel's formal input names, in declaration order.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// The formal inputs that must arrive live at invocation time, i.e.
    /// those without a constant-table entry.
    pub fn live_input_names(&self) -> Vec<String> {
        self.input_names
            .iter()
            .filter(|name| !self.constants.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Execute the kernel against one invocation context.
    ///
    /// Both operands must share one shape; there is no broadcasting. The
    /// single output is allocated through the context and written in place.
    pub fn execute(&self, context: &mut KernelContext) -> Result<()> {
        let operands = self.resolve_operands(context)?;
        let Some(first) = operands.first() else {
            return Err(ProviderError::fail(format!(
                "kernel for node '{}' has no inputs bound",
                self.node_name
            )));
        };

        let shape = first.shape();
        for operand in &operands[1..] {
            if operand.shape() != shape {
                return Err(ProviderError::fail(format!(
                    "input shape mismatch for node '{}': {:?} vs {:?}",
                    self.node_name,
                    shape,
                    operand.shape()
                )));
            }
        }

        if context.output_count() != 1 {
            return Err(ProviderError::fail(format!(
                "node '{}' produces exactly 1 output, context expects {}",
                self.node_name,
                context.output_count()
            )));
        }

        let output = context.allocate_output(0, DataType::F32, shape)?;
        let destination = output.as_f32_mut()?;
        for (index, operand) in operands.iter().enumerate() {
            let values = operand.values()?;
            if index == 0 {
                destination.copy_from_slice(values);
            } else {
                for (dst, src) in destination.iter_mut().zip(values) {
                    *dst *= src;
                }
            }
        }

        debug!(
            "computed '{}' over {} elements",
            self.node_name,
            destination.len()
        );
        Ok(())
    }

    /// Decide, per formal input, where its operand comes from.
    ///
    /// When the context supplies as many tensors as there are formal inputs,
    /// all of them are treated as live. Otherwise formal inputs with a
    /// constant-table entry read their snapshot and the remaining ones
    /// consume the live tensors in order; the counts must reconcile exactly.
    fn resolve_operands(&self, context: &KernelContext) -> Result<Vec<ResolvedOperand>> {
        let formal = self.input_names.len();
        let live = context.input_count();

        if live == formal {
            return (0..formal)
                .map(|index| {
                    context
                        .input(index)
                        .map(|tensor| ResolvedOperand::Live(Arc::clone(tensor)))
                })
                .collect();
        }

        let mut operands = Vec::with_capacity(formal);
        let mut next_live = 0;
        for name in &self.input_names {
            if let Some(entry) = self.constants.get(name) {
                operands.push(ResolvedOperand::Constant(Arc::clone(entry.value())));
            } else {
                if next_live >= live {
                    return Err(ProviderError::fail(format!(
                        "node '{}': input '{}' has no runtime tensor and no constant initializer",
                        self.node_name, name
                    )));
                }
                operands.push(ResolvedOperand::Live(Arc::clone(context.input(next_live)?)));
                next_live += 1;
            }
        }
        if next_live != live {
            return Err(ProviderError::fail(format!(
                "node '{}': context supplied {} runtime inputs but the kernel consumed {}",
                self.node_name, live, next_live
            )));
        }
        Ok(operands)
    }
}

/// Opaque per-unit descriptor the host drives at inference time.
///
/// `create_state` resolves the kernel registered under the fused node's name
/// and hands it back as the opaque state; no allocation beyond a reference
/// count. Dropping the descriptor unregisters its kernel, so the name no
/// longer resolves afterwards.
pub struct MulComputeDescriptor {
    node_name: String,
    kernels: Arc<KernelTable>,
}

impl MulComputeDescriptor {
    pub(crate) fn new(node_name: String, kernels: Arc<KernelTable>) -> Self {
        Self { node_name, kernels }
    }
}

impl ComputeDescriptor for MulComputeDescriptor {
    fn create_state(&self, context: &ComputeContext) -> Result<ComputeState> {
        let name = context.node_name();
        let kernel = self
            .kernels
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ProviderError::fail(format!("no kernel registered for fused node '{name}'"))
            })?;
        debug!("resolved kernel for fused node '{}'", name);
        Ok(ComputeState::new(kernel))
    }

    fn compute(&self, state: &ComputeState, context: &mut KernelContext) -> Result<()> {
        let kernel = state.downcast_ref::<Arc<MulKernel>>().ok_or_else(|| {
            ProviderError::fail("compute state does not hold a mul kernel".to_string())
        })?;
        kernel.execute(context)
    }

    fn release_state(&self, _state: ComputeState) {
        // The kernel outlives the invocation; the state held only a reference.
    }
}

impl Drop for MulComputeDescriptor {
    fn drop(&mut self) {
        self.kernels.remove(&self.node_name);
        debug!("released compiled unit '{}'", self.node_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mul_node() -> Node {
        Node::new(
            "Mul",
            "mul_0",
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
        )
    }

    fn constant(table: &ConstantTable, name: &str, data: Vec<f32>, shape: Vec<usize>) {
        let tensor = Tensor::from_f32(data, shape).unwrap();
        let snapshot = ConstantInitializer::from_tensor(name, &tensor).unwrap();
        table.insert(name.to_string(), Arc::new(snapshot));
    }

    #[test]
    fn test_both_operands_live() -> Result<()> {
        let kernel = MulKernel::new(&mul_node(), Arc::new(ConstantTable::new()));
        let a = Tensor::from_f32(vec![1.0, 2.0, 3.0], vec![3])?;
        let b = Tensor::from_f32(vec![4.0, 5.0, 6.0], vec![3])?;
        let mut context = KernelContext::new(vec![a, b], 1);

        kernel.execute(&mut context)?;
        let output = context.output(0).expect("output should be allocated");
        assert_eq!(output.as_f32()?, &[4.0, 10.0, 18.0]);
        Ok(())
    }

    #[test]
    fn test_one_operand_from_constant_table() -> Result<()> {
        let constants = Arc::new(ConstantTable::new());
        constant(&constants, "a", vec![2.0, 2.0, 2.0], vec![3]);
        let kernel = MulKernel::new(&mul_node(), constants);
        assert_eq!(kernel.live_input_names(), vec!["b"]);

        let b = Tensor::from_f32(vec![1.0, 2.0, 3.0], vec![3])?;
        let mut context = KernelContext::new(vec![b], 1);
        kernel.execute(&mut context)?;
        assert_eq!(
            context.output(0).expect("output").as_f32()?,
            &[2.0, 4.0, 6.0]
        );
        Ok(())
    }

    #[test]
    fn test_both_operands_from_constant_table() -> Result<()> {
        let constants = Arc::new(ConstantTable::new());
        constant(&constants, "a", vec![2.0, 3.0], vec![2]);
        constant(&constants, "b", vec![5.0, 7.0], vec![2]);
        let kernel = MulKernel::new(&mul_node(), constants);
        assert!(kernel.live_input_names().is_empty());

        let mut context = KernelContext::new(Vec::new(), 1);
        kernel.execute(&mut context)?;
        assert_eq!(
            context.output(0).expect("output").as_f32()?,
            &[10.0, 21.0]
        );
        Ok(())
    }

    #[test]
    fn test_missing_constant_is_an_error() {
        let kernel = MulKernel::new(&mul_node(), Arc::new(ConstantTable::new()));
        let mut context = KernelContext::new(Vec::new(), 1);
        let err = kernel.execute(&mut context).expect_err("should fail");
        assert!(err.message().contains("no runtime tensor"));
    }

    #[test]
    fn test_surplus_live_inputs_are_an_error() -> Result<()> {
        let kernel = MulKernel::new(&mul_node(), Arc::new(ConstantTable::new()));
        let tensors = vec![
            Tensor::from_f32(vec![1.0], vec![1])?,
            Tensor::from_f32(vec![2.0], vec![1])?,
            Tensor::from_f32(vec![3.0], vec![1])?,
        ];
        let mut context = KernelContext::new(tensors, 1);
        assert!(kernel.execute(&mut context).is_err());
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_is_an_error() -> Result<()> {
        let kernel = MulKernel::new(&mul_node(), Arc::new(ConstantTable::new()));
        let a = Tensor::from_f32(vec![1.0; 6], vec![2, 3])?;
        let b = Tensor::from_f32(vec![1.0; 6], vec![3, 2])?;
        let mut context = KernelContext::new(vec![a, b], 1);

        let err = kernel.execute(&mut context).expect_err("should fail");
        assert!(err.message().contains("shape mismatch"));
        assert!(context.output(0).is_none(), "no partial output committed");
        Ok(())
    }

    #[test]
    fn test_wrong_output_count_is_an_error() -> Result<()> {
        let kernel = MulKernel::new(&mul_node(), Arc::new(ConstantTable::new()));
        let a = Tensor::from_f32(vec![1.0], vec![1])?;
        let b = Tensor::from_f32(vec![2.0], vec![1])?;
        let mut context = KernelContext::new(vec![a, b], 2);
        assert!(kernel.execute(&mut context).is_err());
        Ok(())
    }

    #[test]
    fn test_non_float_live_input_is_an_error() -> Result<()> {
        let kernel = MulKernel::new(&mul_node(), Arc::new(ConstantTable::new()));
        let a = Tensor::from_i64(vec![1], vec![1])?;
        let b = Tensor::from_i64(vec![2], vec![1])?;
        let mut context = KernelContext::new(vec![a, b], 1);
        assert!(kernel.execute(&mut context).is_err());
        Ok(())
    }

    #[test]
    fn test_non_float_constant_is_rejected_at_snapshot_time() -> Result<()> {
        let tensor = Tensor::from_i64(vec![1, 2], vec![2])?;
        let err = ConstantInitializer::from_tensor("w", &tensor).expect_err("should fail");
        assert!(err.message().contains("only F32"));
        Ok(())
    }

    #[test]
    fn test_descriptor_resolves_registered_kernel() -> Result<()> {
        let kernels = Arc::new(KernelTable::new());
        let kernel = Arc::new(MulKernel::new(&mul_node(), Arc::new(ConstantTable::new())));
        kernels.insert("fused_mul".to_string(), kernel);

        let descriptor = MulComputeDescriptor::new("fused_mul".to_string(), Arc::clone(&kernels));
        let state = descriptor.create_state(&ComputeContext::new("fused_mul"))?;

        let a = Tensor::from_f32(vec![3.0], vec![1])?;
        let b = Tensor::from_f32(vec![5.0], vec![1])?;
        let mut context = KernelContext::new(vec![a, b], 1);
        descriptor.compute(&state, &mut context)?;
        assert_eq!(context.output(0).expect("output").as_f32()?, &[15.0]);
        descriptor.release_state(state);
        Ok(())
    }

    #[test]
    fn test_descriptor_rejects_unknown_fused_node() {
        let descriptor =
            MulComputeDescriptor::new("ghost".to_string(), Arc::new(KernelTable::new()));
        assert!(descriptor
            .create_state(&ComputeContext::new("ghost"))
            .is_err());
    }

    #[test]
    fn test_descriptor_rejects_foreign_state() {
        let kernels = Arc::new(KernelTable::new());
        let descriptor = MulComputeDescriptor::new("m".to_string(), kernels);
        let state = ComputeState::new(7u8);
        let mut context = KernelContext::new(Vec::new(), 1);
        assert!(descriptor.compute(&state, &mut context).is_err());
    }

    #[test]
    fn test_drop_unregisters_kernel() {
        let kernels = Arc::new(KernelTable::new());
        let kernel = Arc::new(MulKernel::new(&mul_node(), Arc::new(ConstantTable::new())));
        kernels.insert("fused_mul".to_string(), kernel);

        let descriptor = MulComputeDescriptor::new("fused_mul".to_string(), Arc::clone(&kernels));
        assert!(kernels.contains_key("fused_mul"));
        drop(descriptor);
        assert!(!kernels.contains_key("fused_mul"));
    }
}
