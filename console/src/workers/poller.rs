//! Task poller worker: follows active tasks and discovers tasks started elsewhere

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::session::Cloud;

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Interval while tasks are active
    pub check_interval: Duration,

    /// Interval while idle
    pub passive_interval: Duration,

    /// Look for running tasks started by other sessions on every poll
    pub passive_refresh: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            passive_interval: Duration::from_secs(10),
            passive_refresh: true,
        }
    }
}

/// Run the poller worker. A poke through [`Cloud::poll_notifier`] polls right away;
/// pokes arriving while a poll is pending collapse into one.
pub async fn run<S, F>(
    options: &Options,
    cloud: &Cloud,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Task poller starting...");

    loop {
        let idle = !cloud.tasks().has_active();
        let interval = if idle {
            options.passive_interval
        } else {
            options.check_interval
        };

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Task poller shutting down...");
                return;
            }
            _ = cloud.poll_notifier().notified() => {
                debug!("Task poller poked");
            }
            _ = sleep_fn(interval) => {}
        }

        if !cloud.is_logged_in() {
            continue;
        }

        let still_active = cloud.poll_tasks().await;
        if options.passive_refresh {
            if let Err(e) = cloud.passive_refresh().await {
                error!("Passive task refresh failed: {}", e);
            }
        }
        debug!("Task poll done, active tasks remain: {}", still_active);
    }
}

/// A poller running on its own task
pub struct PollerHandle {
    cloud: Arc<Cloud>,
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Poll now instead of waiting for the timer
    pub fn poke(&self) {
        self.cloud.poll_notifier().notify_one();
    }

    /// Stop the poller and wait for it to exit
    pub async fn cancel(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.handle.await {
            error!("Task poller exited abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

pub fn spawn(cloud: Arc<Cloud>, options: Options) -> PollerHandle {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let worker_cloud = cloud.clone();
    let handle = tokio::spawn(async move {
        run(
            &options,
            worker_cloud.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = cancel_rx.await;
            }),
        )
        .await;
    });

    PollerHandle {
        cloud,
        cancel_tx: Some(cancel_tx),
        handle,
    }
}
