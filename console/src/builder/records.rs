//! Query records responses (`query?type=...&format=records`)

use std::collections::BTreeMap;

use vcloud_model::{Attributes, Task, Template, VApp};

use crate::builder::xml;
use crate::errors::CloudError;

/// Record attribute names shortened for templates
const SHORTENED: &[(&str, &str)] = &[
    ("ownerName", "owner"),
    ("memoryAllocationMB", "memory"),
    ("catalogName", "catalog"),
    ("storageKB", "storage"),
    ("cpuAllocationMhz", "cpu"),
];

pub fn shorten(name: &str) -> &str {
    SHORTENED
        .iter()
        .find(|(long, _)| *long == name)
        .map_or(name, |(_, short)| *short)
}

/// Number of VMs a full refresh should expect: resolved, non-template VM records
pub fn count_expected_vms(text: &str) -> Result<usize, CloudError> {
    let doc = xml::parse(text)?;
    Ok(xml::elements(doc.root_element(), "VMRecord")
        .filter(|r| r.attribute("status") != Some("UNRESOLVED"))
        .filter(|r| r.attribute("isVAppTemplate") == Some("false"))
        .count())
}

/// vApps seeded with their record attributes, in response order
pub fn parse_vapp_records(text: &str) -> Result<Vec<VApp>, CloudError> {
    let doc = xml::parse(text)?;
    Ok(xml::elements(doc.root_element(), "VAppRecord")
        .map(|record| {
            let mut vapp = VApp::new();
            for (name, value) in xml::attributes(record) {
                vapp.attr.set_raw(name, value);
            }
            vapp
        })
        .collect())
}

/// One page of template records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePage {
    pub templates: Vec<Template>,
    /// `rel="nextPage"` link, absent on the last page
    pub next_page: Option<String>,
}

impl TemplatePage {
    pub fn is_last(&self) -> bool {
        self.next_page.is_none()
    }
}

pub fn parse_template_page(text: &str) -> Result<TemplatePage, CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();

    let templates = xml::elements(root, "VAppTemplateRecord")
        .map(|record| {
            let mut template = Template::new();
            for (name, value) in xml::attributes(record) {
                let short = shorten(name);
                template.set_raw(short, value);
                template.attr.search_term.push_str(&format!("{}:{}", short, value));
            }
            template
        })
        .collect();

    let next_page = xml::elements(root, "Link")
        .find(|link| link.attribute("rel") == Some("nextPage"))
        .and_then(|link| xml::attr(link, "href"));

    Ok(TemplatePage {
        templates,
        next_page,
    })
}

/// Merge a template's detail document: description, network and child VM names
pub fn fill_template(template: &mut Template, text: &str) -> Result<(), CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();

    if let Some(description) = xml::first_text(root, "Description") {
        template.set_raw("description", &description);
    }
    if let Some(network) = xml::first(root, "NetworkConfig").and_then(|n| xml::attr(n, "networkName")) {
        template.set_raw("network", &network);
    }
    template.attr.child_names = Some(
        xml::elements(root, "Vm")
            .filter_map(|vm| xml::attr(vm, "name"))
            .collect(),
    );
    Ok(())
}

/// name to href for "abstract" records such as networks and VDCs
pub fn parse_named_hrefs(text: &str, record: &str) -> Result<BTreeMap<String, String>, CloudError> {
    let doc = xml::parse(text)?;
    Ok(xml::elements(doc.root_element(), record)
        .filter_map(|r| Some((xml::attr(r, "name")?, xml::attr(r, "href")?)))
        .collect())
}

/// Task records; the record's `object` is the owner href
pub fn parse_task_records(text: &str) -> Result<Vec<Task>, CloudError> {
    let doc = xml::parse(text)?;
    Ok(xml::elements(doc.root_element(), "TaskRecord")
        .map(|record| {
            let mut task = Task::default();
            for (name, value) in xml::attributes(record) {
                task.set_raw(name, value);
            }
            if task.owner_href.is_none() {
                task.owner_href = task.extra.get("object").cloned();
            }
            task
        })
        .filter(|task| !task.href.is_empty())
        .collect())
}
