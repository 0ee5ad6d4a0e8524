//! Session orchestrator: owns every component and implements the commands

pub mod actions;
pub mod auth;
pub mod blob;
pub mod cloud;
pub mod console;
pub mod metadata;
pub mod poll;
pub mod refresh;
pub mod views;

pub use cloud::{Cloud, CloudOptions};
pub use views::Metrics;

/// Accept header sent with every API request
pub const ACCEPT_XML: &str = "application/*+xml;version=5.1";

pub const UNDEPLOY_CONTENT_TYPE: &str = "application/vnd.vmware.vcloud.undeployVAppParams+xml";
pub const INSTANTIATE_CONTENT_TYPE: &str =
    "application/vnd.vmware.vcloud.instantiateVAppTemplateParams+xml";
pub const VAPP_CONTENT_TYPE: &str = "application/vnd.vmware.vcloud.vApp+xml";
pub const METADATA_CONTENT_TYPE: &str = "application/vnd.vmware.vcloud.metadata+xml";

pub const SYSTEM_NOT_SUPPORTED: &str =
    "You are attempting to connect to a system no longer supported.";
pub const LOST_CONNECTIVITY: &str = "You seem to have lost connectivity - your changes will not be saved until connectivity is reestablished.";
