//! Version discovery, login and session confirmation

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

use crate::builder::documents::{parse_login_url, parse_session};
use crate::builder::records::{parse_named_hrefs, parse_task_records};
use crate::builder::SessionUser;
use crate::errors::CloudError;
use crate::events::{LoginPayload, Payload, Topics};
use crate::http::{Request, SESSION_HEADER};
use crate::session::{Cloud, SYSTEM_NOT_SUPPORTED};

impl Cloud {
    /// Discover the login URL for the configured API version
    pub async fn initialize(&self) -> Result<String, CloudError> {
        let url = self.api_url("versions")?;
        debug!("GET {}", url);

        let login_url = match self.remote.get(&url).await {
            Ok(response) => parse_login_url(&response.body, &self.options.version)?,
            Err(e) => {
                error!("Failed to fetch supported versions: {}", e);
                None
            }
        };

        match login_url {
            Some(login_url) => {
                {
                    let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
                    session.login_url = Some(login_url.clone());
                }
                info!("Using login URL {}", login_url);
                self.bus.publish(Topics::INITIALIZATION_COMPLETE, Payload::None);
                Ok(login_url)
            }
            None => {
                self.bus
                    .publish(Topics::ERROR, Payload::Error(SYSTEM_NOT_SUPPORTED.to_string()));
                Err(CloudError::UnsupportedServer(format!(
                    "API version {} not offered",
                    self.options.version
                )))
            }
        }
    }

    pub async fn login(
        &self,
        user: &str,
        password: &SecretString,
        org: &str,
    ) -> Result<SessionUser, CloudError> {
        let login_url = {
            let session = self.session.read().unwrap_or_else(|e| e.into_inner());
            session.login_url.clone()
        };
        let login_url = match login_url {
            Some(url) => url,
            None => self.initialize().await?,
        };

        let credential = STANDARD.encode(format!(
            "{}@{}:{}",
            user,
            org,
            password.expose_secret()
        ));
        let request =
            Request::post(&login_url).with_header("Authorization", format!("Basic {}", credential));

        let result = match self.remote.send(request).await {
            Ok(response) => match response.session_token {
                Some(token) => self
                    .remote
                    .set_header(SESSION_HEADER, &token)
                    .and_then(|_| parse_session(&response.body)),
                None => Err(CloudError::AuthFailure(
                    "server did not return a session token".to_string(),
                )),
            },
            Err(CloudError::Status { status, body }) => Err(CloudError::AuthFailure(format!(
                "login rejected with status {}: {}",
                status, body
            ))),
            Err(e) => Err(e),
        };

        match result {
            Ok(session_user) => {
                info!("Logged in as {}@{}", session_user.name, session_user.org);
                self.remember_user(session_user.clone());
                self.publish_login(true, false, Some(session_user.name.clone()), None);
                self.begin().await;
                Ok(session_user)
            }
            Err(e) => {
                warn!("Login failed for {}@{}: {}", user, org, e);
                self.remote.remove_header(SESSION_HEADER);
                self.publish_login(false, false, None, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Re-attach to an existing session (the token header must already be set)
    pub async fn confirm_session(&self) -> Result<SessionUser, CloudError> {
        let url = self.api_url("session")?;
        let body = match self.remote.get(&url).await {
            Ok(response) => response.body,
            Err(e) => {
                self.publish_login(false, true, None, Some(e.to_string()));
                return Err(e);
            }
        };

        let session_user = parse_session(&body)?;
        self.remember_user(session_user.clone());
        self.publish_login(true, true, Some(session_user.name.clone()), None);
        self.begin().await;
        Ok(session_user)
    }

    /// Load everything a fresh session needs. Each step logs its own failure.
    pub async fn begin(&self) {
        if let Err(e) = self.load_networks().await {
            warn!("Failed to load networks: {}", e);
        }
        if let Err(e) = self.load_vdcs().await {
            warn!("Failed to load VDCs: {}", e);
        }
        if let Err(e) = self.seed_task_log().await {
            warn!("Failed to load recent tasks: {}", e);
        }
        if let Err(e) = self.request_full_refresh().await {
            warn!("Initial refresh failed: {}", e);
        }
        if let Err(e) = self.fetch_all_templates().await {
            warn!("Failed to load the catalog: {}", e);
        }
        if let Err(e) = self.apply_download_counts().await {
            warn!("Failed to load download counts: {}", e);
        }
    }

    pub fn user(&self) -> Option<SessionUser> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.user.clone()
    }

    /// Network names, sorted
    pub fn networks(&self) -> Vec<String> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.networks.keys().cloned().collect()
    }

    /// VDC names, sorted
    pub fn vdcs(&self) -> Vec<String> {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.vdcs.keys().cloned().collect()
    }

    async fn load_networks(&self) -> Result<(), CloudError> {
        let url = self.api_url("query?type=orgVdcNetwork&format=records")?;
        let text = self.fetch(&url).await?;
        let networks = parse_named_hrefs(&text, "OrgVdcNetworkRecord")?;
        debug!("Loaded {} networks", networks.len());
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.networks = networks;
        Ok(())
    }

    async fn load_vdcs(&self) -> Result<(), CloudError> {
        let url = self.api_url("query?type=orgVdc&format=records")?;
        let text = self.fetch(&url).await?;
        let vdcs = parse_named_hrefs(&text, "OrgVdcRecord")?;
        debug!("Loaded {} VDCs", vdcs.len());
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.vdcs = vdcs;
        Ok(())
    }

    async fn seed_task_log(&self) -> Result<(), CloudError> {
        let url = self.api_url("query?type=task&pageSize=15&sortDesc=startDate")?;
        let text = self.fetch(&url).await?;
        self.tasks.load_log_records(parse_task_records(&text)?);
        Ok(())
    }

    fn remember_user(&self, user: SessionUser) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.user = Some(user);
    }

    fn publish_login(&self, success: bool, confirm: bool, user: Option<String>, message: Option<String>) {
        self.bus.publish(
            Topics::LOGIN,
            Payload::Login(LoginPayload {
                success,
                confirm,
                user,
                message,
            }),
        );
    }
}
