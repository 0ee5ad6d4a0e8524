//! Task polling and what follows a task's completion

use futures::future::join_all;
use tracing::{debug, warn};

use crate::builder::records::parse_task_records;
use crate::errors::CloudError;
use crate::session::Cloud;
use crate::tasks::{parse_task_document, TaskOutcome};

const RUNNING_TASKS_QUERY: &str = "query?type=task&filter=(status==running)";

impl Cloud {
    /// Poll every active task once. Returns true while tasks remain active.
    pub async fn poll_tasks(&self) -> bool {
        let hrefs = self.tasks.active_hrefs();
        let outcomes = join_all(hrefs.iter().map(|href| self.poll_task(href))).await;
        for outcome in outcomes.into_iter().flatten() {
            self.handle_outcome(&outcome).await;
        }
        self.tasks.has_active()
    }

    async fn poll_task(&self, href: &str) -> Option<TaskOutcome> {
        let text = self.fetch_quiet(href).await?;
        match parse_task_document(&text) {
            Ok(task) => Some(self.tasks.observe(task)),
            Err(e) => {
                warn!("Unreadable task {}: {}", href, e);
                None
            }
        }
    }

    /// Discover tasks started elsewhere (other sessions, other users)
    pub async fn passive_refresh(&self) -> Result<usize, CloudError> {
        let url = self.api_url(RUNNING_TASKS_QUERY)?;
        let text = match self.fetch_quiet(&url).await {
            Some(text) => text,
            None => return Ok(0),
        };
        let added = self.tasks.load_active_records(parse_task_records(&text)?);
        if added > 0 {
            debug!("Discovered {} running tasks", added);
        }
        Ok(added)
    }

    /// Refresh whatever a finished task touched
    pub(crate) async fn handle_outcome(&self, outcome: &TaskOutcome) {
        let result = match outcome {
            TaskOutcome::Completed { task, .. } => match task.owner_href.as_deref() {
                Some(owner) => self.refresh_single(owner).await,
                None => Ok(()),
            },
            TaskOutcome::RefreshRequired { .. } => self.request_full_refresh().await.map(|_| ()),
            TaskOutcome::Pending | TaskOutcome::Duplicate => Ok(()),
        };
        if let Err(e) = result {
            warn!("Refresh after task failed: {}", e);
        }
    }
}
