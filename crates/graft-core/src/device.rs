//! Hardware device descriptions used during provider discovery.

use std::collections::HashMap;

use crate::provider::ProviderOptions;

/// Device classes a provider can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// General-purpose CPU.
    Cpu,
    /// Discrete or integrated GPU.
    Gpu,
    /// Dedicated neural accelerator.
    Npu,
}

/// Memory classes a device allocator can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    /// Device-local memory.
    Default,
    /// Device memory directly addressable by the host.
    HostAccessible,
}

/// One hardware device the host offers to provider factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareDevice {
    /// Device class.
    pub kind: DeviceKind,
    /// Vendor name reported by the platform.
    pub vendor: String,
    /// Numeric vendor identifier.
    pub vendor_id: u32,
    /// Device index within its vendor.
    pub device_id: u32,
    /// Free-form platform metadata.
    pub metadata: HashMap<String, String>,
}

impl HardwareDevice {
    /// A plain host CPU device, the baseline every platform offers.
    pub fn cpu() -> Self {
        Self {
            kind: DeviceKind::Cpu,
            vendor: "generic".to_string(),
            vendor_id: 0,
            device_id: 0,
            metadata: HashMap::new(),
        }
    }
}

/// A hardware device a factory has accepted, annotated with the metadata and
/// default options the provider attaches to it.
#[derive(Debug, Clone)]
pub struct ProviderDevice {
    /// The accepted hardware device.
    pub hardware: HardwareDevice,
    /// Provider-reported metadata for this pairing.
    pub ep_metadata: HashMap<String, String>,
    /// Default provider options for this pairing.
    pub ep_options: ProviderOptions,
}

impl ProviderDevice {
    /// Pair a hardware device with empty provider metadata and options.
    pub fn new(hardware: HardwareDevice) -> Self {
        Self {
            hardware,
            ep_metadata: HashMap::new(),
            ep_options: ProviderOptions::new(),
        }
    }
}
