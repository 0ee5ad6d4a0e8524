//! Saving and restoring the whole cache as one JSON blob

use tracing::info;
use vcloud_model::CacheBlob;

use crate::errors::CloudError;
use crate::events::{Payload, Topics};
use crate::session::Cloud;

impl Cloud {
    pub fn save_cache_blob(&self) -> Result<String, CloudError> {
        let (vapps, vms) = self.entities.snapshot();
        let blob = CacheBlob {
            vapps,
            vms,
            catalog: self.catalog.templates(),
            tasks: self.tasks.save_log(),
        };
        Ok(blob.to_json()?)
    }

    /// Replace the cache with a saved blob. A restored catalog counts as complete.
    pub fn load_cache_blob(&self, text: &str) -> Result<(), CloudError> {
        let blob = CacheBlob::from_json(text)?;
        info!(
            "Restoring cache: {} vApps, {} VMs, {} templates, {} tasks",
            blob.vapps.len(),
            blob.vms.len(),
            blob.catalog.len(),
            blob.tasks.len()
        );

        let complete = !blob.catalog.is_empty();
        self.entities.restore(blob.vapps, blob.vms, self.tickets.issue());
        self.catalog.restore(blob.catalog, complete);
        self.tasks.load_log(blob.tasks);
        self.bus
            .publish(Topics::REFRESH_COMPLETE, Payload::RefreshComplete { loaded: true });
        Ok(())
    }
}
