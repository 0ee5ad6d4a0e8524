//! Session, version, metadata, console ticket and error documents

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::builder::xml;
use crate::errors::CloudError;

/// The logged-in user, from the session document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub name: String,
    pub org: String,
    pub org_url: Option<String>,
    /// Only present for administrators
    pub admin_url: Option<String>,
}

pub fn parse_session(text: &str) -> Result<SessionUser, CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();
    let name = xml::attr(root, "user")
        .ok_or_else(|| CloudError::ParseError("session has no user".to_string()))?;
    let org = xml::attr(root, "org").unwrap_or_default();

    let links: Vec<_> = xml::elements(root, "Link").collect();
    let admin_url = links
        .iter()
        .filter_map(|l| l.attribute("href"))
        .find(|href| href.contains("/api/admin"))
        .map(str::to_string);
    let org_url = links
        .iter()
        .find(|l| l.attribute("name") == Some(org.as_str()))
        .and_then(|l| xml::attr(*l, "href"));

    Ok(SessionUser {
        name,
        org,
        org_url,
        admin_url,
    })
}

/// Login URL advertised for `version` in the versions document
pub fn parse_login_url(text: &str, version: &str) -> Result<Option<String>, CloudError> {
    let doc = xml::parse(text)?;
    let login_url = xml::elements(doc.root_element(), "VersionInfo")
        .find(|info| xml::first_text(*info, "Version").as_deref() == Some(version))
        .and_then(|info| xml::first_text(info, "LoginUrl"));
    Ok(login_url)
}

/// Metadata entries of one object, key to value
pub fn parse_metadata(text: &str) -> Result<BTreeMap<String, String>, CloudError> {
    let doc = xml::parse(text)?;
    Ok(xml::elements(doc.root_element(), "MetadataEntry")
        .filter_map(|entry| {
            Some((
                xml::first_text(entry, "Key")?,
                xml::first_text(entry, "Value").unwrap_or_default(),
            ))
        })
        .collect())
}

/// Result of a metadata filter query, record href to the value of the filtered key
pub fn parse_metadata_filter(text: &str) -> Result<BTreeMap<String, String>, CloudError> {
    let doc = xml::parse(text)?;
    let root = doc.root_element();
    let record = if xml::first(root, "VAppRecord").is_some() {
        "VAppRecord"
    } else {
        "VAppTemplateRecord"
    };
    Ok(xml::elements(root, record)
        .filter_map(|r| Some((xml::attr(r, "href")?, xml::first_text(r, "Value")?)))
        .collect())
}

/// Value carried by a metadata entry
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Number(i64),
    Boolean(bool),
}

impl MetadataValue {
    fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::String(_) => "MetadataStringValue",
            MetadataValue::Number(_) => "MetadataNumberValue",
            MetadataValue::Boolean(_) => "MetadataBooleanValue",
        }
    }

    fn render(&self) -> String {
        match self {
            MetadataValue::String(s) => crate::utils::xml_escape(s),
            MetadataValue::Number(n) => n.to_string(),
            MetadataValue::Boolean(b) => b.to_string(),
        }
    }
}

pub fn metadata_document(key: &str, value: &MetadataValue) -> String {
    format!(
        r#"<Metadata xmlns="http://www.vmware.com/vcloud/v1.5" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" type="application/vnd.vmware.vcloud.metadata+xml"><MetadataEntry type="application/vnd.vmware.vcloud.metadata.value+xml"><Key>{}</Key><TypedValue xsi:type="{}"><Value>{}</Value></TypedValue></MetadataEntry></Metadata>"#,
        crate::utils::xml_escape(key),
        value.type_name(),
        value.render()
    )
}

/// Parsed `mks://host/moid?ticket=...` screen ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenTicket {
    pub host: String,
    pub moid: String,
    pub ticket: String,
}

pub fn parse_screen_ticket(text: &str) -> Result<ScreenTicket, CloudError> {
    let doc = xml::parse(text)?;
    let raw = xml::first_text(doc.root_element(), "ScreenTicket")
        .ok_or_else(|| CloudError::ParseError("no ScreenTicket in response".to_string()))?;

    let url = Url::parse(&raw)?;
    if url.scheme() != "mks" {
        return Err(CloudError::ParseError(format!("unexpected ticket scheme {}", url.scheme())));
    }
    let host = url
        .host_str()
        .ok_or_else(|| CloudError::ParseError("ticket has no host".to_string()))?
        .to_string();
    let ticket = url
        .query_pairs()
        .find(|(k, _)| k == "ticket")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| CloudError::ParseError("ticket has no ticket parameter".to_string()))?;

    Ok(ScreenTicket {
        host,
        moid: url.path().trim_start_matches('/').to_string(),
        ticket,
    })
}

/// Body of the SOAP call cloning a host session from a screen ticket
pub fn clone_session_body(ticket: &str) -> String {
    format!(
        r#"<CloneSession xmlns="urn:vim25"><_this type="SessionManager">SessionManager</_this><cloneTicket xsi:type="xsd:string">{}</cloneTicket></CloneSession>"#,
        crate::utils::xml_escape(ticket)
    )
}

/// Session key from a CloneSession response
pub fn parse_clone_session(text: &str) -> Result<Option<String>, CloudError> {
    let doc = xml::parse(text)?;
    Ok(xml::first_text(doc.root_element(), "key"))
}

/// Human message from an `Error` document (`message` attribute, else `Details` text)
pub fn parse_error_message(text: &str) -> Option<String> {
    let doc = xml::parse(text).ok()?;
    let root = doc.root_element();
    xml::first(root, "Error")
        .and_then(|e| xml::attr(e, "message"))
        .filter(|m| !m.is_empty())
        .or_else(|| xml::first_text(root, "Details"))
}
