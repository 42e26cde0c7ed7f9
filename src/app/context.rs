//! Explicit system context.
//!
//! Built once at startup and handed to each task. Replaces process-wide
//! controller singletons: there is exactly one store, and the
//! configuration cannot change after construction.

use std::sync::Arc;

use crate::config::SystemConfig;
use crate::error::Result;
use crate::store::SharedTelemetryStore;

pub struct SystemContext {
    config: SystemConfig,
    store: Arc<SharedTelemetryStore>,
}

impl SystemContext {
    /// Validate `config` and create the shared store.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(SharedTelemetryStore::new(config.lock_timeout()));
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Another handle to the shared store.
    pub fn store(&self) -> Arc<SharedTelemetryStore> {
        Arc::clone(&self.store)
    }
}
