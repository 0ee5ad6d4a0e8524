//! Task documents returned by actions and task polls

use vcloud_model::Task;

use crate::builder::xml;
use crate::errors::CloudError;

/// Parse the first `Task` element of a document
pub fn parse_task_document(text: &str) -> Result<Task, CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();
    let node = if xml::is_named(&root, "Task") {
        root
    } else {
        xml::first(root, "Task")
            .ok_or_else(|| CloudError::ParseError("response carries no Task".to_string()))?
    };

    let mut task = Task::default();
    for (name, value) in xml::attributes(node) {
        task.set_raw(name, value);
    }
    if task.href.is_empty() {
        return Err(CloudError::ParseError("task has no href".to_string()));
    }

    if let Some(cancel) = xml::first(node, "Link").and_then(|l| xml::attr(l, "href")) {
        task.cancel = Some(cancel);
    }
    if let Some(owner) = xml::first(node, "Owner") {
        task.owner_href = xml::attr(owner, "href");
        if task.owner_name.is_none() {
            task.owner_name = xml::attr(owner, "name");
        }
    }
    if let Some(user) = xml::first(node, "User").and_then(|u| xml::attr(u, "name")) {
        task.user = Some(user);
    }
    if let Some(progress) = xml::first_text(node, "Progress") {
        task.progress = Some(progress);
    }
    if task.status.is_failure() {
        task.error = xml::first(node, "Error")
            .and_then(|e| xml::attr(e, "message"))
            .filter(|m| !m.is_empty())
            .or_else(|| xml::first_text(node, "Details"));
    }
    Ok(task)
}
