//! The boundary-adapter layer between host and provider.
//!
//! Two concerns live here and nowhere else:
//! - [`ComputeState`], the opaque handle carried between `create_state` and
//!   `compute`. Typed access happens only through its downcast API, so the
//!   erasure never leaks into kernel logic.
//! - [`FaultBarrier`], a decorator converting panics escaping any fallible
//!   entry point into the generic failure object. A fault crossing the
//!   boundary raw would be undefined behavior from the host's perspective,
//!   so every provider handed to a host goes through this wrapper.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::error::{ProviderError, Result};
use crate::graph::Graph;
use crate::provider::{
    CompileRequest, CompiledUnit, ComputeContext, ComputeDescriptor, ExecutionProvider,
    GraphSupportInfo, KernelContext, ProviderOptions,
};

/// Opaque per-unit state handle crossing the compute boundary.
pub struct ComputeState {
    value: Box<dyn Any + Send + Sync>,
}

impl ComputeState {
    /// Erase a concrete state value into an opaque handle.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Box::new(value),
        }
    }

    /// Borrow the state as its concrete type, or `None` on a type mismatch.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl std::fmt::Debug for ComputeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ComputeState(..)")
    }
}

/// Decorator that keeps panics from crossing the host/provider boundary.
///
/// Fallible entry points run under `catch_unwind`; a caught panic becomes a
/// generic failure carrying the panic message. Infallible accessors pass
/// through untouched. Compiled units returned through the barrier are
/// re-wrapped so their compute entry points are protected too.
pub struct FaultBarrier<T> {
    inner: T,
}

impl<T> FaultBarrier<T> {
    /// Wrap a provider or compute descriptor.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped value.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Unwrap, discarding the barrier.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn catch<R>(entry_point: &str, f: impl FnOnce() -> Result<R>) -> Result<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("caught panic in '{}': {}", entry_point, message);
            Err(ProviderError::fail(format!(
                "{entry_point} panicked: {message}"
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "opaque panic payload"
    }
}

impl<P: ExecutionProvider> ExecutionProvider for FaultBarrier<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn report_capability(&self, graph: &Graph, support: &mut GraphSupportInfo) -> Result<()> {
        catch("report_capability", || {
            self.inner.report_capability(graph, support)
        })
    }

    fn compile(&self, requests: &[CompileRequest<'_>]) -> Result<Vec<CompiledUnit>> {
        let units = catch("compile", || self.inner.compile(requests))?;
        Ok(units
            .into_iter()
            .map(|unit| CompiledUnit {
                descriptor: Box::new(FaultBarrier::new(unit.descriptor)),
                replacement_node: unit.replacement_node,
            })
            .collect())
    }

    fn configure(&mut self, options: &ProviderOptions) -> Result<()> {
        catch("configure", || self.inner.configure(options))
    }

    fn shutdown(&self) -> Result<()> {
        catch("shutdown", || self.inner.shutdown())
    }
}

impl<D: ComputeDescriptor> ComputeDescriptor for FaultBarrier<D> {
    fn create_state(&self, context: &ComputeContext) -> Result<ComputeState> {
        catch("create_state", || self.inner.create_state(context))
    }

    fn compute(&self, state: &ComputeState, context: &mut KernelContext) -> Result<()> {
        catch("compute", || self.inner.compute(state, context))
    }

    fn release_state(&self, state: ComputeState) {
        if catch_unwind(AssertUnwindSafe(|| self.inner.release_state(state))).is_err() {
            error!("caught panic in 'release_state'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_state_downcast() {
        let state = ComputeState::new(41u32);
        assert_eq!(state.downcast_ref::<u32>(), Some(&41));
        assert!(state.downcast_ref::<String>().is_none());
    }

    struct PanickyDescriptor;

    impl ComputeDescriptor for PanickyDescriptor {
        fn create_state(&self, _: &ComputeContext) -> Result<ComputeState> {
            Ok(ComputeState::new(()))
        }

        fn compute(&self, _: &ComputeState, _: &mut KernelContext) -> Result<()> {
            panic!("kernel exploded");
        }

        fn release_state(&self, _: ComputeState) {}
    }

    struct PanickyProvider;

    impl ExecutionProvider for PanickyProvider {
        fn name(&self) -> &str {
            "panicky"
        }

        fn report_capability(&self, _: &Graph, _: &mut GraphSupportInfo) -> Result<()> {
            panic!("capability scan exploded");
        }

        fn compile(&self, _: &[CompileRequest<'_>]) -> Result<Vec<CompiledUnit>> {
            Ok(vec![CompiledUnit {
                descriptor: Box::new(PanickyDescriptor),
                replacement_node: None,
            }])
        }

        fn configure(&mut self, _: &ProviderOptions) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_barrier_converts_panics_to_failures() {
        use crate::graph::GraphBuilder;
        use crate::tensor::DataType;

        let mut builder = GraphBuilder::new("g");
        builder
            .add_value("a", DataType::F32, &[1])
            .add_value("b", DataType::F32, &[1])
            .add_node("Mul", "m", &["a", "a"], &["b"]);
        builder.set_inputs(&["a"]).set_outputs(&["b"]);
        let graph = builder.build().expect("graph should validate");

        let barrier = FaultBarrier::new(PanickyProvider);
        let mut support = GraphSupportInfo::for_graph(&graph);
        let err = barrier
            .report_capability(&graph, &mut support)
            .expect_err("panic should surface as an error");
        assert_eq!(err.code(), ErrorCode::Fail);
        assert!(err.message().contains("capability scan exploded"));
    }

    #[test]
    fn test_barrier_rewraps_compiled_units() {
        let barrier = FaultBarrier::new(PanickyProvider);
        let units = barrier.compile(&[]).expect("compile should succeed");
        assert_eq!(units.len(), 1);

        let state = units[0]
            .descriptor
            .create_state(&ComputeContext::new("m"))
            .expect("create_state should succeed");
        let mut context = KernelContext::new(Vec::new(), 1);
        let err = units[0]
            .descriptor
            .compute(&state, &mut context)
            .expect_err("panic should surface as an error");
        assert_eq!(err.code(), ErrorCode::Fail);
        assert!(err.message().contains("kernel exploded"));
        units[0].descriptor.release_state(state);
    }

    #[test]
    fn test_barrier_passes_name_through() {
        let barrier = FaultBarrier::new(PanickyProvider);
        assert_eq!(barrier.name(), "panicky");
    }
}
