//! Factory for [`BasicExecutionProvider`] instances.

use std::collections::HashMap;

use tracing::info;

use graft_core::{
    DeviceKind, ExecutionProvider, HardwareDevice, ProviderDevice, ProviderError, ProviderFactory,
    ProviderOptions, Result,
};

use super::provider::BasicExecutionProvider;
use super::BASIC_EP_NAME;

/// Creates basic providers for host CPU devices.
#[derive(Debug, Default)]
pub struct BasicProviderFactory;

impl BasicProviderFactory {
    /// Create the factory.
    pub fn new() -> Self {
        Self
    }
}

impl ProviderFactory for BasicProviderFactory {
    fn name(&self) -> &str {
        BASIC_EP_NAME
    }

    fn vendor(&self) -> &str {
        "graft"
    }

    fn vendor_id(&self) -> u32 {
        0x6772
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn supported_devices(&self, hardware: &[HardwareDevice]) -> Vec<ProviderDevice> {
        hardware
            .iter()
            .filter(|device| device.kind == DeviceKind::Cpu)
            .map(|device| {
                let mut ep_metadata = HashMap::new();
                ep_metadata.insert("version".to_string(), self.version().to_string());
                ProviderDevice {
                    hardware: device.clone(),
                    ep_metadata,
                    ep_options: ProviderOptions::new(),
                }
            })
            .collect()
    }

    fn create_provider(
        &self,
        devices: &[ProviderDevice],
        options: &ProviderOptions,
    ) -> Result<Box<dyn ExecutionProvider>> {
        let [device] = devices else {
            return Err(ProviderError::invalid_argument(format!(
                "basic provider binds to exactly 1 device, got {}",
                devices.len()
            )));
        };
        let mut provider = BasicExecutionProvider::new(device.clone());
        provider.configure(options)?;
        info!(
            "Created basic provider for {:?} device {}",
            device.hardware.kind, device.hardware.device_id
        );
        Ok(Box::new(provider))
    }
}
