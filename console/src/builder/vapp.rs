//! vApp and VM detail documents

use roxmltree::Node;
use vcloud_model::{Attributes, VApp, Vm};

use crate::builder::xml;
use crate::errors::CloudError;
use crate::status::{vapp_state, PowerState};

/// A vApp and its VMs, built from one detail document
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltVApp {
    pub vapp: VApp,
    pub vms: Vec<Vm>,
}

/// Build a vApp from its detail document.
///
/// `base` carries whatever is already known (the query record's attributes, or the
/// cached copy); `busy` is whether a task currently runs against it.
pub fn build_vapp(mut base: VApp, text: &str, busy: bool) -> Result<BuiltVApp, CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();
    if !xml::is_named(&root, "VApp") {
        return Err(CloudError::ParseError(format!(
            "expected a VApp document, got {}",
            root.tag_name().name()
        )));
    }

    let vapp = &mut base;
    if let Some(description) = xml::child(root, "Description").and_then(xml::text) {
        vapp.attr.set_raw("description", &description);
    }
    for (name, value) in xml::attributes(root) {
        vapp.attr.set_raw(name, value);
    }
    if let Some(created) = xml::first_text(root, "DateCreated") {
        vapp.attr.set_raw("creationDate", &created);
    }
    if let Some(owner) = xml::first(root, "Owner")
        .and_then(|owner| xml::first(owner, "User"))
        .and_then(|user| xml::attr(user, "name"))
    {
        vapp.attr.set_raw("ownerName", &owner);
    }
    add_links(vapp_links(root), &mut vapp.links);

    let vms: Vec<Vm> = xml::elements(root, "Vm").map(vm_from_node).collect();
    vapp.children = vms.iter().filter_map(|vm| vm.id()).map(str::to_string).collect();

    let state = vapp_state(&vms, busy);
    vapp.attr.search_term = Some(search_term(vapp, state));

    Ok(BuiltVApp { vapp: base, vms })
}

/// Build a lone VM from its own detail document
pub fn build_vm(text: &str) -> Result<Vm, CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();
    if !xml::is_named(&root, "Vm") {
        return Err(CloudError::ParseError(format!(
            "expected a Vm document, got {}",
            root.tag_name().name()
        )));
    }
    Ok(vm_from_node(root))
}

fn vapp_links<'a, 'i>(root: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    root.children().filter(|n| xml::is_named(n, "Link"))
}

fn add_links<'a, 'i: 'a>(links: impl Iterator<Item = Node<'a, 'i>>, into: &mut vcloud_model::Links) {
    for link in links {
        if let (Some(rel), Some(href)) = (link.attribute("rel"), link.attribute("href")) {
            into.add(rel, href);
        }
    }
}

fn vm_from_node(node: Node) -> Vm {
    let mut vm = Vm::new();
    for (name, value) in xml::attributes(node) {
        vm.attr.set_raw(name, value);
    }
    if let Some(ip) = xml::first_text(node, "IpAddress") {
        vm.attr.set_raw("ip", &ip);
    }
    if let Some(os) = node
        .descendants()
        .find(|n| xml::is_named(n, "Description") && n.tag_name().namespace() == Some(xml::OVF_NS))
        .and_then(xml::text)
    {
        vm.attr.set_raw("guestOS", &os);
    }
    if let Some(network) = xml::first(node, "NetworkConnection").and_then(|n| xml::attr(n, "network")) {
        vm.attr.set_raw("network", &network);
    }
    if let Some(description) = node
        .children()
        .find(|n| xml::is_named(n, "Description") && n.tag_name().namespace() != Some(xml::OVF_NS))
        .and_then(xml::text)
    {
        vm.attr.set_raw("description", &description);
    }
    add_links(node.children().filter(|n| xml::is_named(n, "Link")), &mut vm.links);
    vm
}

/// Lower-cased free-text key: `name:<n>owner:<o>status:<label>description:<d>`
pub fn search_term(vapp: &VApp, state: PowerState) -> String {
    format!(
        "name:{}owner:{}status:{}description:{}",
        vapp.name().unwrap_or_default(),
        vapp.attr.owner_name.as_deref().unwrap_or_default(),
        state.label(),
        vapp.description().unwrap_or_default()
    )
    .to_lowercase()
}
