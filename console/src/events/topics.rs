//! Event topic definitions

/// Topic names published on the cloud event bus
pub struct Topics;

impl Topics {
    pub const INITIALIZATION_COMPLETE: &'static str = "event.cloud.initialization.complete";
    pub const LOGIN: &'static str = "event.cloud.login";
    pub const TASK_START: &'static str = "event.cloud.task.start";
    pub const TASK_COMPLETE: &'static str = "event.cloud.task.complete";
    pub const REFRESH_COMPLETE: &'static str = "event.cloud.refresh.complete";
    pub const REFRESH_SINGLE: &'static str = "event.cloud.refresh.single";
    pub const TEMPLATE_REFRESH: &'static str = "event.cloud.template.refresh";
    pub const SEARCH_COMPLETE: &'static str = "event.cloud.search.complete";
    pub const PROGRESS_UPDATE: &'static str = "event.cloud.progress.update";
    pub const NEW_TICKET: &'static str = "event.cloud.ticket.new";
    pub const ERROR: &'static str = "event.cloud.error";

    const TEMPLATE_FILLED_PREFIX: &'static str = "event.cloud.template.filled.";

    /// Published once a template's detail document has been merged in
    pub fn template_filled(href: &str) -> String {
        format!("{}{}", Self::TEMPLATE_FILLED_PREFIX, href)
    }

    /// Extract the template href from a template-filled topic
    pub fn parse_template_href(topic: &str) -> Option<String> {
        topic
            .strip_prefix(Self::TEMPLATE_FILLED_PREFIX)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
    }
}
