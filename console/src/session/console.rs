//! Remote console tickets

use tracing::{info, warn};

use crate::builder::documents::{clone_session_body, parse_clone_session, parse_screen_ticket};
use crate::errors::CloudError;
use crate::events::{ConsoleTicket, Payload, Topics};
use crate::http::Request;
use crate::session::Cloud;

const ACQUIRE_TICKET: &str = "screen:acquireTicket";
const SOAP_ACTION: &str = "urn:vim25/4.1";

impl Cloud {
    /// Acquire a console ticket for a powered-on VM and clone the host session for it
    pub async fn acquire_console_ticket(&self, vm_id: &str) -> Result<ConsoleTicket, CloudError> {
        let vm = self
            .entities
            .vm(vm_id)
            .ok_or_else(|| CloudError::NotFound(format!("VM {}", vm_id)))?;
        let link = vm.link(ACQUIRE_TICKET).ok_or_else(|| {
            CloudError::NotFound(format!("VM {} must be powered on for a console", vm_id))
        })?;

        let response = self.send(Request::post(link)).await?;
        let screen = parse_screen_ticket(&response.body)?;

        let sdk_url = format!("https://{}:{}/sdk", screen.host, self.options.console_sdk_port);
        let session = match self
            .remote
            .soap_post(&sdk_url, SOAP_ACTION, &clone_session_body(&screen.ticket))
            .await
        {
            Ok(response) => parse_clone_session(&response.body)?,
            Err(e) => {
                warn!("Failed to clone host session on {}: {}", screen.host, e);
                None
            }
        };

        let ticket = ConsoleTicket {
            vm_id: vm_id.to_string(),
            host: screen.host,
            moid: screen.moid,
            ticket: screen.ticket,
            session,
        };
        info!("Console ticket acquired for {}", vm_id);
        self.bus
            .publish(Topics::NEW_TICKET, Payload::Ticket(ticket.clone()));
        Ok(ticket)
    }
}
