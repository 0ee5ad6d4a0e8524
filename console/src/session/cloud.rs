//! The cloud session and its request plumbing

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Notify;
use tracing::{info, warn};
use url::Url;

use crate::builder::SessionUser;
use crate::cache::{Catalog, EntityCache, Tickets};
use crate::errors::CloudError;
use crate::events::{EventBus, LoginPayload, Payload, Topics};
use crate::http::{RemoteAccess, Request, Response, SESSION_HEADER};
use crate::session::{ACCEPT_XML, LOST_CONNECTIVITY};
use crate::tasks::TaskManager;

#[derive(Debug, Clone)]
pub struct CloudOptions {
    /// API root, e.g. `https://cloud.example.com/api/`
    pub base_url: String,

    /// API version to negotiate
    pub version: String,

    /// Also discover running tasks started by other sessions
    pub passive_refresh: bool,

    /// Port of the host SDK endpoint used to clone console sessions
    pub console_sdk_port: u16,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            base_url: "https://localhost/api/".to_string(),
            version: "5.1".to_string(),
            passive_refresh: true,
            console_sdk_port: 9443,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub login_url: Option<String>,
    pub user: Option<SessionUser>,
    /// Network name to href
    pub networks: BTreeMap<String, String>,
    /// VDC name to href
    pub vdcs: BTreeMap<String, String>,
}

/// A session against one cloud endpoint
pub struct Cloud {
    pub(crate) options: CloudOptions,
    base: Url,
    pub(crate) remote: Arc<dyn RemoteAccess>,
    pub(crate) bus: EventBus,
    pub(crate) tickets: Arc<Tickets>,
    pub(crate) entities: EntityCache,
    pub(crate) catalog: Catalog,
    pub(crate) tasks: TaskManager,
    pub(crate) session: RwLock<SessionState>,
    connected: AtomicBool,
    pub(crate) refreshing: AtomicBool,
    poll_now: Notify,
}

impl Cloud {
    pub fn new(options: CloudOptions, remote: Arc<dyn RemoteAccess>) -> Result<Self, CloudError> {
        let mut base_url = options.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url)?;
        remote.set_header("Accept", ACCEPT_XML)?;

        let bus = EventBus::new();
        let tickets = Arc::new(Tickets::new());
        Ok(Self {
            options,
            base,
            remote,
            tasks: TaskManager::new(bus.clone(), tickets.clone()),
            bus,
            tickets,
            entities: EntityCache::new(),
            catalog: Catalog::new(),
            session: RwLock::new(SessionState::default()),
            connected: AtomicBool::new(true),
            refreshing: AtomicBool::new(false),
            poll_now: Notify::new(),
        })
    }

    pub fn options(&self) -> &CloudOptions {
        &self.options
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn entities(&self) -> &EntityCache {
        &self.entities
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn tickets(&self) -> &Tickets {
        &self.tickets
    }

    /// Wakes the task poller ahead of its timer
    pub fn poll_notifier(&self) -> &Notify {
        &self.poll_now
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_logged_in(&self) -> bool {
        let session = self.session.read().unwrap_or_else(|e| e.into_inner());
        session.user.is_some()
    }

    /// Resolve a path against the API root
    pub fn api_url(&self, path: &str) -> Result<String, CloudError> {
        Ok(self.base.join(path)?.to_string())
    }

    /// Model GET. Loss of connectivity is announced once, then cleared by the next success.
    pub(crate) async fn fetch(&self, url: &str) -> Result<String, CloudError> {
        match self.remote.get(url).await {
            Ok(response) => {
                self.mark_connected();
                Ok(response.body)
            }
            Err(e) => {
                self.on_failure(&e);
                if !matches!(e, CloudError::AuthFailure(_)) && self.connected.swap(false, Ordering::SeqCst) {
                    warn!("Fetch error for {}: {}", url, e);
                    self.bus
                        .publish(Topics::ERROR, Payload::Error(LOST_CONNECTIVITY.to_string()));
                }
                Err(e)
            }
        }
    }

    /// GET whose failure is only worth a warning; the next poll heals it
    pub(crate) async fn fetch_quiet(&self, url: &str) -> Option<String> {
        match self.remote.get(url).await {
            Ok(response) => {
                self.mark_connected();
                Some(response.body)
            }
            Err(e) => {
                self.on_failure(&e);
                warn!("Fetch error for {}: {}", url, e);
                None
            }
        }
    }

    /// Any non-GET request
    pub(crate) async fn send(&self, request: Request) -> Result<Response, CloudError> {
        let method = request.method.as_str();
        let url = request.url.clone();
        match self.remote.send(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.on_failure(&e);
                warn!("{} error for {}: {}", method, url, e);
                Err(e)
            }
        }
    }

    fn mark_connected(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            info!("Connectivity reestablished");
        }
    }

    fn on_failure(&self, error: &CloudError) {
        if matches!(error, CloudError::AuthFailure(_)) {
            self.reset_session();
        }
    }

    /// Forget the session after the server rejected our credentials
    pub fn reset_session(&self) {
        self.remote.remove_header(SESSION_HEADER);
        self.remote.remove_header("Authorization");
        let had_user = {
            let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
            session.user.take().is_some()
        };
        if had_user {
            warn!("Session rejected by the server, logged out");
            self.bus.publish(
                Topics::LOGIN,
                Payload::Login(LoginPayload {
                    success: false,
                    confirm: false,
                    user: None,
                    message: Some("session expired".to_string()),
                }),
            );
        }
    }
}
