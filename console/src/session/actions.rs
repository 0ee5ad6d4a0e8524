//! Entity actions, instantiation and edits

use tracing::{info, warn};

use crate::builder::documents::parse_error_message;
use crate::builder::requests::{edit_vapp_document, undeploy_params};
use crate::builder::InstantiateParams;
use crate::cache::EntityRef;
use crate::errors::CloudError;
use crate::events::{Payload, Topics};
use crate::http::Request;
use crate::session::{Cloud, INSTANTIATE_CONTENT_TYPE, UNDEPLOY_CONTENT_TYPE, VAPP_CONTENT_TYPE};
use crate::tasks::{parse_task_document, TaskOutcome};

pub const POWER_OFF: &str = "power:powerOff";
pub const REMOVE: &str = "remove";

impl Cloud {
    /// Run a link relation (`power:powerOn`, `remove`, ...) on a vApp or VM
    pub async fn perform_entity_action(&self, id: &str, action: &str) -> Result<TaskOutcome, CloudError> {
        let request = match self.entities.lookup_by_id(id) {
            Some(EntityRef::Vm(vm)) => {
                let link = vm.link(action).ok_or_else(|| {
                    CloudError::NotFound(format!("VM {} does not offer {}", id, action))
                })?;
                Request::post(link)
            }
            Some(EntityRef::VApp(vapp)) => {
                if let Some(href) = vapp.href() {
                    self.tasks.add_fake_task(href);
                }
                match action {
                    POWER_OFF => {
                        let link = vapp.link("undeploy").ok_or_else(|| {
                            CloudError::NotFound(format!("vApp {} cannot be undeployed", id))
                        })?;
                        Request::post(link).with_body(undeploy_params(), UNDEPLOY_CONTENT_TYPE)
                    }
                    REMOVE => {
                        let link = vapp.link(action).ok_or_else(|| {
                            CloudError::NotFound(format!("vApp {} cannot be removed", id))
                        })?;
                        Request::delete(link)
                    }
                    _ => {
                        let link = vapp.link(action).ok_or_else(|| {
                            CloudError::NotFound(format!("vApp {} does not offer {}", id, action))
                        })?;
                        Request::post(link)
                    }
                }
            }
            None => {
                let url = self.guess_action_url(id, action)?;
                warn!("Entity {} not cached, guessing {}", id, url);
                Request::post(url)
            }
        };

        info!("{} on {}", action, id);
        let response = self.send(request).await?;
        self.submit_task_document(&response.body).await
    }

    /// Action URL for an entity we have no links for, built from its URN
    pub fn guess_action_url(&self, id: &str, action: &str) -> Result<String, CloudError> {
        let parts: Vec<&str> = id.split(':').collect();
        if parts.len() < 2 {
            return Err(CloudError::NotFound(format!("entity {}", id)));
        }
        let key = format!("{}-{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        let suffix = match action.strip_prefix("power:") {
            Some(power) => format!("/power/action/{}", power),
            None => format!("/action/{}", action),
        };
        self.api_url(&format!("vApp/{}{}", key, suffix))
    }

    /// Create a vApp from a catalog template. Returns false when the VDC or template is unknown.
    pub async fn instantiate_from_template(
        &self,
        name: &str,
        description: &str,
        vdc: &str,
        network: &str,
        template_href: &str,
        power_on: bool,
    ) -> Result<bool, CloudError> {
        let (vdc_href, parent_network) = {
            let session = self.session.read().unwrap_or_else(|e| e.into_inner());
            let parent = session
                .networks
                .get(network)
                .or_else(|| session.networks.values().next())
                .cloned();
            (session.vdcs.get(vdc).cloned(), parent)
        };
        let vdc_href = match vdc_href {
            Some(href) if self.catalog.template(template_href).is_some() => href,
            _ => return Ok(false),
        };

        let template = self.fill_template(template_href).await?;
        let params = InstantiateParams {
            name,
            description,
            network_name: template.network().unwrap_or_default(),
            parent_network: parent_network.as_deref(),
            template_href,
            power_on,
        };
        let url = format!("{}/action/instantiateVAppTemplate", vdc_href);
        let request = Request::post(url).with_body(params.to_xml(), INSTANTIATE_CONTENT_TYPE);

        match self.send(request).await {
            Ok(response) => {
                self.submit_task_document(&response.body).await?;
                self.request_full_refresh().await?;
                Ok(true)
            }
            Err(e) => {
                let message = e
                    .body()
                    .and_then(parse_error_message)
                    .unwrap_or_else(|| e.to_string());
                self.bus.publish(Topics::ERROR, Payload::Error(message));
                Err(e)
            }
        }
    }

    /// Rename and/or re-describe a vApp; missing values keep the current ones
    pub async fn edit_vapp(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<TaskOutcome, CloudError> {
        let vapp = self
            .entities
            .vapp(id)
            .ok_or_else(|| CloudError::NotFound(format!("vApp {}", id)))?;
        let href = vapp
            .href()
            .ok_or_else(|| CloudError::NotFound(format!("vApp {} has no href", id)))?;

        let body = edit_vapp_document(
            name.or(vapp.name()).unwrap_or_default(),
            description.or(vapp.description()).unwrap_or_default(),
        );
        let response = self
            .send(Request::put(href).with_body(body, VAPP_CONTENT_TYPE))
            .await?;
        self.submit_task_document(&response.body).await
    }

    pub fn set_favorite(&self, id: &str, favorite: bool) -> bool {
        self.entities.set_favorite(id, favorite)
    }

    /// Hand a task returned by the server to the task manager and wake the poller
    async fn submit_task_document(&self, body: &str) -> Result<TaskOutcome, CloudError> {
        let task = parse_task_document(body)?;
        let outcome = self.tasks.submit(task);
        self.poll_notifier().notify_one();
        self.handle_outcome(&outcome).await;
        Ok(outcome)
    }
}
