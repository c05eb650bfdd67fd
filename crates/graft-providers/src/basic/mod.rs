//! The basic execution provider and its factory.
//!
//! This backend claims single elementwise-multiply nodes and runs them on
//! the host CPU. Small as it is, it exercises the whole provider contract:
//! capability reporting with dropped constants, batch compilation with
//! all-or-nothing registration, and lock-free compute lookups.

pub mod factory;
pub mod kernel;
pub mod provider;

pub use factory::BasicProviderFactory;
pub use kernel::{ConstantInitializer, ConstantTable, MulComputeDescriptor, MulKernel};
pub use provider::BasicExecutionProvider;

use graft_core::{ExecutionProvider, HardwareDevice, ProviderFactory, ProviderOptions, Result};

/// Name under which the basic provider and its factory register.
pub const BASIC_EP_NAME: &str = "basic";

/// Create a basic provider bound to the host CPU with default options.
pub fn create_basic_provider() -> Result<Box<dyn ExecutionProvider>> {
    let factory = BasicProviderFactory::new();
    let devices = factory.supported_devices(&[HardwareDevice::cpu()]);
    factory.create_provider(&devices, &ProviderOptions::new())
}
