//! Small helpers over `roxmltree` matching elements by local name

use roxmltree::{Document, Node};

use crate::errors::CloudError;

/// OVF envelope namespace, used for the guest OS description
pub const OVF_NS: &str = "http://schemas.dmtf.org/ovf/envelope/1";

pub fn parse(text: &str) -> Result<Document<'_>, CloudError> {
    Ok(Document::parse(text)?)
}

pub fn is_named(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}

/// Every element below `node` (inclusive) with this local name, in document order
pub fn elements<'a, 'i>(node: Node<'a, 'i>, local: &'a str) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.descendants().filter(move |n| is_named(n, local))
}

pub fn first<'a, 'i>(node: Node<'a, 'i>, local: &'a str) -> Option<Node<'a, 'i>> {
    elements(node, local).next()
}

/// First direct child element with this local name
pub fn child<'a, 'i>(node: Node<'a, 'i>, local: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| is_named(n, local))
}

/// Text of an element, `None` when it has no text
pub fn text(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn first_text(node: Node, local: &str) -> Option<String> {
    first(node, local).and_then(text)
}

pub fn attr(node: Node, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

/// Raw attributes of an element as (name, value) pairs
pub fn attributes<'a>(node: Node<'a, '_>) -> Vec<(&'a str, &'a str)> {
    node.attributes().map(|a| (a.name(), a.value())).collect()
}
