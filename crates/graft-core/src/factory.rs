//! Provider factories: device discovery and provider lifecycle.
//!
//! A [`ProviderFactory`] is the entry point a host uses to learn which
//! devices a provider supports and to create provider instances bound to
//! one of them. The allocator, data-transfer, and stream hooks are optional
//! capabilities; the defaults decline them, and a host must treat a decline
//! as a valid answer rather than an error.

use crate::device::{HardwareDevice, MemoryType, ProviderDevice};
use crate::error::Result;
use crate::provider::{ExecutionProvider, ProviderOptions};
use crate::tensor::{DataType, Tensor};

/// Version of the provider interface this crate was built against.
///
/// A host refuses factories whose [`ProviderFactory::plugin_api_version`]
/// exceeds the version it understands.
pub const PLUGIN_API_VERSION: u32 = 1;

/// Factory creating execution providers for the devices it supports.
pub trait ProviderFactory: Send + Sync {
    /// Name of the provider this factory creates.
    fn name(&self) -> &str;

    /// Vendor publishing the provider.
    fn vendor(&self) -> &str;

    /// Numeric vendor identifier.
    fn vendor_id(&self) -> u32;

    /// Provider version string.
    fn version(&self) -> &str;

    /// Provider interface version this factory was built against.
    fn plugin_api_version(&self) -> u32 {
        PLUGIN_API_VERSION
    }

    /// Select the offered devices this provider can run on, pairing each
    /// accepted device with provider metadata and default options.
    fn supported_devices(&self, hardware: &[HardwareDevice]) -> Vec<ProviderDevice>;

    /// Create a provider instance bound to exactly one accepted device.
    ///
    /// Factories reject any other device count with an invalid-argument
    /// error; multi-device fan-out is not part of this contract.
    fn create_provider(
        &self,
        devices: &[ProviderDevice],
        options: &ProviderOptions,
    ) -> Result<Box<dyn ExecutionProvider>>;

    /// Create a memory allocator for the given device, or decline.
    fn create_allocator(&self, _device: &ProviderDevice) -> Result<Option<Box<dyn DeviceAllocator>>> {
        Ok(None)
    }

    /// Create a device memory-transfer object, or decline.
    fn create_data_transfer(&self) -> Result<Option<Box<dyn DataTransfer>>> {
        Ok(None)
    }

    /// Whether providers from this factory synchronize work via streams.
    fn is_stream_aware(&self) -> bool {
        false
    }

    /// Create a synchronization stream for the given device, or decline.
    fn create_sync_stream(&self, _device: &ProviderDevice) -> Result<Option<Box<dyn SyncStream>>> {
        Ok(None)
    }
}

/// Device-memory allocator a factory may provide.
pub trait DeviceAllocator: Send + Sync {
    /// Memory class this allocator serves.
    fn memory_type(&self) -> MemoryType;

    /// Allocate an uninitialized tensor on the device.
    fn allocate(&self, dtype: DataType, shape: &[usize]) -> Result<Tensor>;
}

/// Copies tensors between devices.
///
/// Copies are ordered by the stream the host supplies; completion is
/// host-managed, not tracked by the provider.
pub trait DataTransfer: Send + Sync {
    /// Whether this object can copy between the two devices.
    fn can_copy(&self, src: &HardwareDevice, dst: &HardwareDevice) -> bool;

    /// Copy `src` into `dst`.
    fn copy_tensor(&self, src: &Tensor, dst: &mut Tensor, stream: Option<&dyn SyncStream>)
        -> Result<()>;
}

/// A host-supplied queue ordering asynchronous device work.
pub trait SyncStream: Send + Sync {
    /// Block until all work queued on the stream has completed.
    fn synchronize(&self) -> Result<()>;
}
