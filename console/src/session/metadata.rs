//! Metadata on vApps and templates

use std::collections::BTreeMap;

use tracing::debug;

use crate::builder::documents::{metadata_document, parse_metadata, parse_metadata_filter};
use crate::builder::MetadataValue;
use crate::errors::CloudError;
use crate::http::Request;
use crate::session::{Cloud, METADATA_CONTENT_TYPE};

/// Template metadata key counting deployments
pub const DOWNLOADS_KEY: &str = "downloads";

impl Cloud {
    pub async fn metadata(&self, href: &str) -> Result<BTreeMap<String, String>, CloudError> {
        let text = self.fetch(&format!("{}/metadata", href)).await?;
        parse_metadata(&text)
    }

    pub async fn set_metadata(&self, href: &str, key: &str, value: MetadataValue) -> Result<(), CloudError> {
        let request = Request::post(format!("{}/metadata", href))
            .with_body(metadata_document(key, &value), METADATA_CONTENT_TYPE);
        self.send(request).await?;
        Ok(())
    }

    /// Template href to value, for templates carrying a numeric `key`
    pub async fn filter_templates(&self, key: &str) -> Result<BTreeMap<String, String>, CloudError> {
        self.filter_by_metadata("vAppTemplate", key).await
    }

    /// vApp href to value, for vApps carrying a numeric `key`
    pub async fn filter_vapps(&self, key: &str) -> Result<BTreeMap<String, String>, CloudError> {
        self.filter_by_metadata("vApp", key).await
    }

    async fn filter_by_metadata(&self, kind: &str, key: &str) -> Result<BTreeMap<String, String>, CloudError> {
        let url = self.api_url(&format!(
            "query?type={kind}&fields=metadata:{key}&filter=metadata:{key}=ge=NUMBER:0"
        ))?;
        let text = self.fetch(&url).await?;
        parse_metadata_filter(&text)
    }

    /// Copy the `downloads` counts onto the cached templates
    pub async fn apply_download_counts(&self) -> Result<usize, CloudError> {
        let counts = self.filter_templates(DOWNLOADS_KEY).await?;
        let mut applied = 0;
        for (href, value) in &counts {
            if self.catalog.update(href, |t| t.set_raw(DOWNLOADS_KEY, value)).is_some() {
                applied += 1;
            }
        }
        debug!("Applied download counts to {} templates", applied);
        Ok(applied)
    }
}
