//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, Credentials, LifecycleOptions};
use crate::errors::CloudError;
use crate::http::{HttpClient, RemoteAccess};
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::session::Cloud;
use crate::storage::{BlobStore, FileBlobStore, MemoryBlobStore};
use crate::workers::poller;

/// Run the console until the shutdown signal fires
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), CloudError> {
    info!("Initializing cloud console...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    let cloud = match init(&options, &shutdown_tx, &mut shutdown_manager).await {
        Ok(cloud) => cloud,
        Err(e) => {
            error!("Failed to start the console: {}", e);
            shutdown_manager.shutdown().await?;
            return Err(e);
        }
    };

    tokio::pin!(shutdown_signal);
    if let Some(credentials) = options.credentials.as_ref() {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Shutdown signal received during login, shutting down...");
                drop(shutdown_tx);
                return shutdown_manager.shutdown().await;
            }
            _ = login(&cloud, credentials) => {}
        }
    } else {
        info!("No credentials given, serving the cached model only");
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

async fn login(cloud: &Cloud, credentials: &Credentials) {
    match cloud
        .login(&credentials.user, &credentials.password, &credentials.org)
        .await
    {
        Ok(user) => info!("Session ready for {}@{}", user.name, user.org),
        Err(e) => error!("Login failed: {}", e),
    }
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<Cloud>, CloudError> {
    if let Err(e) = options.storage.layout.setup().await {
        warn!("Failed to create storage directories: {}", e);
    }

    let remote: Arc<dyn RemoteAccess> = Arc::new(HttpClient::new(&options.http)?);
    let cloud = Arc::new(Cloud::new(options.cloud.clone(), remote)?);

    let blob_store: Arc<dyn BlobStore> = if options.storage.persist_cache {
        Arc::new(FileBlobStore::new(options.storage.cache_file.clone()))
    } else {
        Arc::new(MemoryBlobStore::new())
    };
    restore_cache(&cloud, blob_store.as_ref()).await;
    shutdown_manager.with_cache(cloud.clone(), blob_store.clone())?;

    if options.enable_socket_server {
        init_socket_server(
            options,
            cloud.clone(),
            blob_store,
            shutdown_manager,
            shutdown_tx.subscribe(),
        )
        .await?;
    }

    if options.enable_poller {
        init_poller_worker(
            options.poller.clone(),
            cloud.clone(),
            shutdown_manager,
            shutdown_tx.subscribe(),
        )?;
    }

    Ok(cloud)
}

async fn restore_cache(cloud: &Cloud, blob_store: &dyn BlobStore) {
    match blob_store.load().await {
        Ok(Some(blob)) => {
            if let Err(e) = cloud.load_cache_blob(&blob) {
                warn!("Ignoring unreadable cache blob: {}", e);
            }
        }
        Ok(None) => info!("No saved cache to restore"),
        Err(e) => warn!("Failed to read the cache blob: {}", e),
    }
}

fn init_poller_worker(
    options: poller::Options,
    cloud: Arc<Cloud>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), CloudError> {
    info!("Initializing task poller...");

    let poller_handle = tokio::spawn(async move {
        poller::run(
            &options,
            cloud.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_poller_worker_handle(poller_handle)
}

async fn init_socket_server(
    options: &AppOptions,
    cloud: Arc<Cloud>,
    blob_store: Arc<dyn BlobStore>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), CloudError> {
    info!("Initializing local HTTP server...");

    let server_state = ServerState::new(cloud, blob_store);
    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct CachePersistence {
    cloud: Arc<Cloud>,
    store: Arc<dyn BlobStore>,
}

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    cache: Option<CachePersistence>,
    socket_server_handle: Option<JoinHandle<Result<(), CloudError>>>,
    poller_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            cache: None,
            socket_server_handle: None,
            poller_worker_handle: None,
        }
    }

    pub fn with_cache(&mut self, cloud: Arc<Cloud>, store: Arc<dyn BlobStore>) -> Result<(), CloudError> {
        if self.cache.is_some() {
            return Err(CloudError::ShutdownError("cache already set".to_string()));
        }
        self.cache = Some(CachePersistence { cloud, store });
        Ok(())
    }

    pub fn with_poller_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), CloudError> {
        if self.poller_worker_handle.is_some() {
            return Err(CloudError::ShutdownError("poller_handle already set".to_string()));
        }
        self.poller_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), CloudError>>,
    ) -> Result<(), CloudError> {
        if self.socket_server_handle.is_some() {
            return Err(CloudError::ShutdownError("server_handle already set".to_string()));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), CloudError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), CloudError> {
        info!("Shutting down cloud console...");

        // 1. Task poller
        if let Some(handle) = self.poller_worker_handle.take() {
            handle.await.map_err(|e| CloudError::ShutdownError(e.to_string()))?;
        }

        // 2. Socket server
        if let Some(handle) = self.socket_server_handle.take() {
            handle.await.map_err(|e| CloudError::ShutdownError(e.to_string()))??;
        }

        // 3. Cache blob
        if let Some(cache) = self.cache.take() {
            let blob = cache.cloud.save_cache_blob()?;
            cache.store.save(&blob).await?;
            info!("Cache saved ({} bytes)", blob.len());
        }

        info!("Shutdown complete");
        Ok(())
    }
}
