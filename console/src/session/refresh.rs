//! Full and single refresh of the model, and catalog paging

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tracing::{debug, info, warn};
use vcloud_model::{Template, VApp, Vm};

use crate::builder::records::{self, count_expected_vms, parse_template_page, parse_vapp_records};
use crate::builder::{build_vapp, build_vm, xml, RefreshProgress};
use crate::cache::catalog::{Catalog, MAX_PAGE_SIZE, MAX_TEMPLATES};
use crate::errors::CloudError;
use crate::events::{EntityRefreshed, Payload, Topics};
use crate::search::{self, Facets, SEARCH_TERM};
use crate::session::Cloud;

/// Page size used when paging in the whole catalog
pub const CATALOG_PAGE_SIZE: usize = 128;

const VM_QUERY: &str = "query?type=vm&format=records&pageSize=1024";
const VAPP_QUERY: &str = "query?type=vApp&format=records&pageSize=1024";

/// Clears the in-flight flag when the refresh ends, however it ends
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Cloud {
    /// Rebuild the whole model. Returns false when another refresh was already running.
    pub async fn request_full_refresh(&self) -> Result<bool, CloudError> {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            debug!("Full refresh already in flight");
            return Ok(false);
        }
        let _guard = RefreshGuard(&self.refreshing);
        self.full_refresh().await?;
        Ok(true)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    async fn full_refresh(&self) -> Result<(), CloudError> {
        let ticket = self.tickets.issue();

        let vm_text = self.fetch(&self.api_url(VM_QUERY)?).await?;
        let total = count_expected_vms(&vm_text)?;
        let vapp_text = self.fetch(&self.api_url(VAPP_QUERY)?).await?;
        let records = parse_vapp_records(&vapp_text)?;

        if records.is_empty() {
            debug!("No vApps visible to this session");
            self.commit_generation(Vec::new(), Vec::new(), ticket, false);
            return Ok(());
        }

        let progress = RefreshProgress::new(self.bus.clone(), total);
        let fetches = records
            .into_iter()
            .map(|record| self.fetch_vapp_detail(record, &progress));
        let mut vapps = Vec::new();
        let mut vms = Vec::new();
        for built in join_all(fetches).await {
            // The previous generation stays until a refresh sees everything
            let (vapp, vapp_vms) = built?;
            vapps.push(vapp);
            vms.extend(vapp_vms);
        }

        if !progress.is_complete() || vms.len() != total {
            warn!(
                "Refresh received {} of {} expected VMs, keeping the previous model",
                progress.received(),
                progress.total()
            );
            return Err(CloudError::IncompleteRefresh {
                received: vms.len(),
                total,
            });
        }
        self.commit_generation(vapps, vms, ticket, true);
        Ok(())
    }

    async fn fetch_vapp_detail(
        &self,
        record: VApp,
        progress: &RefreshProgress,
    ) -> Result<(VApp, Vec<Vm>), CloudError> {
        let href = record
            .href()
            .map(str::to_string)
            .ok_or_else(|| CloudError::ParseError("vApp record without href".to_string()))?;
        let text = self.fetch(&href).await?;
        let busy = record.id().map(|id| self.tasks.is_busy(id)).unwrap_or(false);
        let built = build_vapp(record, &text, busy).map_err(|e| {
            warn!("Failed to build vApp {}: {}", href, e);
            e
        })?;
        for _ in &built.vms {
            progress.increment();
        }
        Ok((built.vapp, built.vms))
    }

    fn commit_generation(&self, vapps: Vec<VApp>, vms: Vec<Vm>, ticket: u64, loaded: bool) {
        let count = vapps.len();
        if self.entities.replace_generation(vapps, vms, ticket) {
            self.tasks.clear_fakes_before(ticket);
            info!("Model refreshed with {} vApps", count);
            self.bus
                .publish(Topics::REFRESH_COMPLETE, Payload::RefreshComplete { loaded });
        } else {
            debug!("Dropped stale refresh generation {}", ticket);
        }
    }

    /// Re-fetch one vApp or VM and merge it into the live generation
    pub async fn refresh_single(&self, owner_href: &str) -> Result<(), CloudError> {
        let ticket = self.tickets.issue();
        let text = self.fetch(owner_href).await?;
        let is_vm = {
            let doc = xml::parse(&text)?;
            let root = doc.root_element();
            xml::is_named(&root, "Vm")
        };

        let id = if is_vm {
            let vm = build_vm(&text)?;
            let id = vm.id().map(str::to_string);
            self.entities.merge_vm(vm, ticket);
            id
        } else {
            let base = self
                .entities
                .lookup_by_href(owner_href)
                .and_then(|entity| entity.id().and_then(|id| self.entities.vapp(id)))
                .unwrap_or_else(VApp::new);
            let busy = base.id().map(|id| self.tasks.is_busy(id)).unwrap_or(false);
            let built = build_vapp(base, &text, busy)?;
            let id = built.vapp.id().map(str::to_string);
            self.entities.merge_one(built.vapp, built.vms, ticket);
            id
        };

        self.tasks.clear_fake(owner_href, ticket);
        self.bus.publish(
            Topics::REFRESH_SINGLE,
            Payload::EntityRefreshed(EntityRefreshed {
                href: owner_href.to_string(),
                id,
            }),
        );
        Ok(())
    }

    /// Fetch one catalog page unless it is already cached
    pub async fn request_catalog_page(&self, page: usize, size: usize) -> Result<Vec<Template>, CloudError> {
        let page = page.max(1);
        if Catalog::page_range(page, size).is_none() {
            return Err(CloudError::InvalidRequest(format!(
                "catalog page {} of size {} is out of range (size 1..={}, at most {} templates)",
                page, size, MAX_PAGE_SIZE, MAX_TEMPLATES
            )));
        }
        if self.catalog.has_holes(page, size) {
            let url = self.api_url(&format!(
                "query?type=vAppTemplate&format=records&page={}&pageSize={}",
                page, size
            ))?;
            let text = self.fetch(&url).await?;
            let parsed = parse_template_page(&text)?;
            self.catalog.place_page(page, size, parsed.templates, false);
        }
        self.bus.publish(
            Topics::TEMPLATE_REFRESH,
            Payload::TemplatesUpdated {
                page: Some(page),
                complete: self.catalog.is_complete(),
            },
        );
        Ok(self.catalog.page(page, size))
    }

    /// Page in the whole catalog by following `nextPage` links
    pub async fn fetch_all_templates(&self) -> Result<usize, CloudError> {
        let mut url = self.api_url(&format!(
            "query?type=vAppTemplate&format=records&page=1&pageSize={}",
            CATALOG_PAGE_SIZE
        ))?;
        let mut page = 1;
        loop {
            let text = self.fetch(&url).await?;
            let parsed = parse_template_page(&text)?;
            let last = parsed.is_last();
            if !self
                .catalog
                .place_page(page, CATALOG_PAGE_SIZE, parsed.templates, last)
            {
                break;
            }
            match parsed.next_page {
                Some(next) => {
                    url = next;
                    page += 1;
                }
                None => break,
            }
        }

        let count = self.catalog.len();
        info!("Catalog loaded with {} templates", count);
        self.bus.publish(
            Topics::TEMPLATE_REFRESH,
            Payload::TemplatesUpdated {
                page: None,
                complete: true,
            },
        );
        Ok(count)
    }

    /// Facet search over the whole catalog, paging it in first if needed
    pub async fn search(&self, facets: &Facets) -> Result<Vec<Template>, CloudError> {
        if !self.catalog.is_complete() {
            self.fetch_all_templates().await?;
        }
        let found = search::search(&self.catalog.templates(), facets);
        self.bus
            .publish(Topics::SEARCH_COMPLETE, Payload::SearchResults(found.clone()));
        Ok(found)
    }

    pub async fn search_term(&self, term: &str) -> Result<Vec<Template>, CloudError> {
        let mut facets = Facets::new();
        facets.insert(SEARCH_TERM.to_string(), term.to_string());
        self.search(&facets).await
    }

    /// Merge a template's detail document in (once)
    pub async fn fill_template(&self, href: &str) -> Result<Template, CloudError> {
        let template = self
            .catalog
            .template(href)
            .ok_or_else(|| CloudError::NotFound(format!("template {}", href)))?;

        let template = if template.is_filled() {
            template
        } else {
            let text = self.fetch(href).await?;
            let mut filled = template;
            records::fill_template(&mut filled, &text)?;
            self.catalog.update(href, |t| *t = filled.clone());
            filled
        };

        self.bus
            .publish(&Topics::template_filled(href), Payload::Template(template.clone()));
        Ok(template)
    }

    pub async fn fill_templates(&self, hrefs: &[String]) -> Vec<Template> {
        join_all(hrefs.iter().map(|href| self.fill_template(href)))
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(template) => Some(template),
                Err(e) => {
                    warn!("Failed to fill template: {}", e);
                    None
                }
            })
            .collect()
    }
}
