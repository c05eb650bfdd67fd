//! Host-side registry of provider factories.
//!
//! The registry owns discovery and lifecycle plumbing:
//! - factories register by name, gated on [`PLUGIN_API_VERSION`],
//! - device enumeration fans one hardware list out to every factory,
//! - provider creation routes through the owning factory and wraps the
//!   result in a [`FaultBarrier`] so panics never cross back into the host.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::info;

use graft_core::{
    ExecutionProvider, FaultBarrier, HardwareDevice, ProviderDevice, ProviderError,
    ProviderFactory, ProviderOptions, Result, PLUGIN_API_VERSION,
};

/// One (factory, device) pairing produced by enumeration.
#[derive(Debug, Clone)]
pub struct EpDevice {
    /// Factory that accepted the device.
    pub factory_name: String,
    /// The accepted device with provider annotations.
    pub device: ProviderDevice,
}

/// Registry of provider factories, keyed by factory name.
pub struct FactoryRegistry {
    factories: DashMap<String, Arc<dyn ProviderFactory>>,
    registration_order: RwLock<Vec<String>>,
}

impl FactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
            registration_order: RwLock::new(Vec::new()),
        }
    }

    /// Register a factory under its own name.
    ///
    /// Rejects factories built against a newer plugin interface than this
    /// host understands, and duplicate names.
    pub fn register_factory(&self, factory: Arc<dyn ProviderFactory>) -> Result<()> {
        let name = factory.name().to_string();
        let factory_version = factory.plugin_api_version();
        if factory_version > PLUGIN_API_VERSION {
            return Err(ProviderError::invalid_argument(format!(
                "factory '{name}' targets plugin API v{factory_version}, host supports up to v{PLUGIN_API_VERSION}"
            )));
        }
        if self.factories.contains_key(&name) {
            return Err(ProviderError::invalid_argument(format!(
                "factory '{name}' is already registered"
            )));
        }

        info!(
            "Registered factory '{}' (vendor {}, version {})",
            name,
            factory.vendor(),
            factory.version()
        );
        self.factories.insert(name.clone(), factory);
        self.registration_order.write().unwrap().push(name);
        Ok(())
    }

    /// Remove a factory by name.
    pub fn unregister_factory(&self, name: &str) -> Result<()> {
        if self.factories.remove(name).is_none() {
            return Err(ProviderError::invalid_argument(format!(
                "no factory named '{name}' is registered"
            )));
        }
        self.registration_order
            .write()
            .unwrap()
            .retain(|registered| registered != name);
        info!("Unregistered factory '{}'", name);
        Ok(())
    }

    /// Look up a factory by name.
    pub fn factory(&self, name: &str) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Names of all registered factories, in registration order.
    pub fn factory_names(&self) -> Vec<String> {
        self.registration_order.read().unwrap().clone()
    }

    /// Offer `hardware` to every factory and collect the accepted pairings.
    pub fn enumerate_devices(&self, hardware: &[HardwareDevice]) -> Vec<EpDevice> {
        let mut pairings = Vec::new();
        for name in self.factory_names() {
            let Some(factory) = self.factory(&name) else {
                continue;
            };
            for device in factory.supported_devices(hardware) {
                pairings.push(EpDevice {
                    factory_name: name.clone(),
                    device,
                });
            }
        }
        pairings
    }

    /// Create a provider through the named factory.
    ///
    /// The returned provider is wrapped in a [`FaultBarrier`], so a panic in
    /// any of its entry points surfaces as a failure instead of unwinding
    /// into the host.
    pub fn create_provider(
        &self,
        factory_name: &str,
        devices: &[ProviderDevice],
        options: &ProviderOptions,
    ) -> Result<Box<dyn ExecutionProvider>> {
        let factory = self.factory(factory_name).ok_or_else(|| {
            ProviderError::invalid_argument(format!(
                "no factory named '{factory_name}' is registered"
            ))
        })?;
        let provider = factory.create_provider(devices, options)?;
        Ok(Box::new(FaultBarrier::new(provider)))
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
