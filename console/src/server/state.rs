//! Server state

use std::sync::Arc;

use crate::session::Cloud;
use crate::storage::BlobStore;

/// Server state shared across handlers
pub struct ServerState {
    pub cloud: Arc<Cloud>,
    pub blob_store: Arc<dyn BlobStore>,
}

impl ServerState {
    pub fn new(cloud: Arc<Cloud>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self { cloud, blob_store }
    }
}
