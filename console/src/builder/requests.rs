//! Request documents sent to the API

use crate::utils::xml_escape;

const VCLOUD_NS: &str = "http://www.vmware.com/vcloud/v1.5";

pub fn undeploy_params() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<UndeployVAppParams xmlns=\"{}\"><UndeployPowerAction>powerOff</UndeployPowerAction></UndeployVAppParams>",
        VCLOUD_NS
    )
}

/// Rename and/or re-describe a vApp
pub fn edit_vapp_document(name: &str, description: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\
<vcloud:VApp xmlns:vcloud=\"{}\" name=\"{}\"><vcloud:Description>{}</vcloud:Description></vcloud:VApp>",
        VCLOUD_NS,
        xml_escape(name),
        xml_escape(description)
    )
}

/// Parameters for creating a vApp from a template
#[derive(Debug, Clone, Default)]
pub struct InstantiateParams<'a> {
    pub name: &'a str,
    pub description: &'a str,
    /// Network name declared inside the template
    pub network_name: &'a str,
    /// Org VDC network to bridge to; no network section without one
    pub parent_network: Option<&'a str>,
    pub template_href: &'a str,
    pub power_on: bool,
}

impl InstantiateParams<'_> {
    pub fn to_xml(&self) -> String {
        let network_section = match self.parent_network {
            Some(parent) => format!(
                "<NetworkConfigSection>\
<ovf:Info>Configuration parameters for logical networks</ovf:Info>\
<NetworkConfig networkName=\"{}\"><Configuration>\
<ParentNetwork href=\"{}\"/><FenceMode>bridged</FenceMode>\
</Configuration></NetworkConfig></NetworkConfigSection>",
                xml_escape(self.network_name),
                xml_escape(parent)
            ),
            None => String::new(),
        };

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<InstantiateVAppTemplateParams xmlns=\"{ns}\" name=\"{name}\" deploy=\"{power}\" powerOn=\"{power}\" \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xmlns:ovf=\"http://schemas.dmtf.org/ovf/envelope/1\">\
<Description>{description}</Description>\
<InstantiationParams>{network}</InstantiationParams>\
<Source href=\"{source}\"/>\
</InstantiateVAppTemplateParams>",
            ns = VCLOUD_NS,
            name = xml_escape(self.name),
            power = self.power_on,
            description = xml_escape(self.description),
            network = network_section,
            source = xml_escape(self.template_href),
        )
    }
}
