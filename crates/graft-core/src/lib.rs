//! Graft Core Contract
//!
//! This crate defines the contract between an inference host and pluggable
//! execution providers: the graph and tensor types the host exposes, the
//! three-phase capability/compile/compute protocol, the factory and device
//! model, and the boundary layer that keeps faults and type erasure from
//! leaking across the interface.
//!
//! ## Architecture
//!
//! The contract is layered:
//! - **Tensor/Graph**: host-owned data the provider reads during capability
//!   query and compilation
//! - **Provider**: the `ExecutionProvider` and `ComputeDescriptor` traits a
//!   backend implements
//! - **Factory**: device discovery and provider lifecycle, with optional
//!   allocator/data-transfer/stream capabilities
//! - **Boundary**: opaque compute-state handles and the panic barrier
//!
//! ## Example
//!
//! ```rust
//! use graft_core::{DataType, GraphBuilder, Tensor};
//!
//! let mut builder = GraphBuilder::new("double");
//! builder
//!     .add_value("x", DataType::F32, &[2, 2])
//!     .add_initializer("two", Tensor::from_f32(vec![2.0; 4], vec![2, 2])?)
//!     .add_value("y", DataType::F32, &[2, 2])
//!     .add_node("Mul", "double_x", &["x", "two"], &["y"]);
//! builder.set_inputs(&["x"]).set_outputs(&["y"]);
//!
//! let graph = builder.build()?;
//! assert_eq!(graph.nodes().len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod boundary;
pub mod device;
/// Error types for boundary-crossing operations
pub mod error;
pub mod factory;
pub mod graph;
pub mod logging;
pub mod provider;
pub mod tensor;

// Re-export commonly used types
pub use boundary::{ComputeState, FaultBarrier};
pub use device::{DeviceKind, HardwareDevice, MemoryType, ProviderDevice};
pub use error::{ErrorCode, ProviderError, Result};
pub use factory::{
    DataTransfer, DeviceAllocator, ProviderFactory, SyncStream, PLUGIN_API_VERSION,
};
pub use graph::{Dimension, Graph, GraphBuilder, Node, ValueInfo};
pub use logging::{init_default_logging, init_logging, LogLevel, LoggingConfig};
pub use provider::{
    CompileRequest, CompiledUnit, ComputeContext, ComputeDescriptor, ExecutionProvider, FusedNode,
    FusionOptions, GraphSupportInfo, KernelContext, NodeGroup, ProviderOptions,
};
pub use tensor::{DataType, Tensor, TensorData};
