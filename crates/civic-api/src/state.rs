//! # Application State
//!
//! Shared state passed to every handler. Storage is reached only through
//! the handles held here; there is no global store.

use std::sync::Arc;

use crate::allocator::{ReferenceAllocator, RetryPolicy};
use crate::blob::{BlobStore, MemoryBlobStore};
use crate::config::AppConfig;
use crate::service::CivicService;
use crate::store::{CivicStore, MemoryStore};

/// Shared application state, cloned into each handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub service: CivicService,
}

impl AppState {
    /// Wire the service over the given backends.
    pub fn new(config: AppConfig, store: Arc<dyn CivicStore>, blobs: Arc<dyn BlobStore>) -> Self {
        let policy = RetryPolicy::with_max_attempts(config.allocation_max_attempts);
        let allocator = ReferenceAllocator::new(Arc::clone(&store), policy);
        let service = CivicService::new(store, blobs, allocator);
        Self { config, service }
    }

    /// In-memory backends; state is lost on restart.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryBlobStore::new()),
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(AppConfig::default())
    }
}
