//! Execution providers for the graft runtime.
//!
//! A provider plugs a compute backend into a host session behind one
//! contract: report capability over a graph, compile the claimed subgraphs,
//! and execute the resulting units on demand. This crate ships:
//! - [`basic`]: a CPU reference backend for fused elementwise multiplies,
//!   including constant materialization and dropped runtime inputs.
//! - [`registry`]: host-side factory registration, device enumeration, and
//!   fault isolation around created providers.
//!
//! # Example
//!
//! ```
//! use graft_core::{DataType, ExecutionProvider, GraphBuilder, GraphSupportInfo};
//! use graft_providers::create_basic_provider;
//!
//! let mut builder = GraphBuilder::new("demo");
//! builder
//!     .add_value("X", DataType::F32, &[1, 3, 2])
//!     .add_value("Y", DataType::F32, &[1, 3, 2])
//!     .add_value("Z", DataType::F32, &[1, 3, 2])
//!     .add_node("Mul", "mul_0", &["X", "Y"], &["Z"]);
//! builder.set_inputs(&["X", "Y"]).set_outputs(&["Z"]);
//! let graph = builder.build()?;
//!
//! let provider = create_basic_provider()?;
//! let mut support = GraphSupportInfo::for_graph(&graph);
//! provider.report_capability(&graph, &mut support)?;
//! assert!(!support.is_empty());
//! # Ok::<(), graft_core::ProviderError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(unsafe_code)]

pub mod basic;
pub mod registry;

pub use basic::{
    create_basic_provider, BasicExecutionProvider, BasicProviderFactory, ConstantInitializer,
    ConstantTable, MulComputeDescriptor, MulKernel, BASIC_EP_NAME,
};
pub use registry::{EpDevice, FactoryRegistry};
