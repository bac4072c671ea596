//! Engine state management
//!
//! This module contains the shared engine handle that the embedding
//! service layer passes to every operation: the storage collaborator,
//! the injectable clock, and the loaded configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::store::EngineStore;
use crate::utils::time::{Clock, SystemClock};

/// Shared engine handle
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct EngineInner {
    /// Storage collaborator
    pub store: Arc<dyn EngineStore>,

    /// Time source; injectable for deterministic deadline tests
    pub clock: Arc<dyn Clock>,

    /// Engine configuration
    pub config: EngineConfig,
}

impl Engine {
    /// Create a new engine handle
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner { store, clock, config }),
        }
    }

    /// Engine over the given store with the system clock and default
    /// configuration
    pub fn with_store(store: Arc<dyn EngineStore>) -> Self {
        Self::new(store, Arc::new(SystemClock), EngineConfig::default())
    }

    /// Get a reference to the storage collaborator
    pub fn store(&self) -> &dyn EngineStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the clock
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Current instant according to the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}
