//! Canned server documents and a logged-in session

use std::sync::{Arc, Mutex};

use cloud_console::events::{handler, EventBus, Payload};
use cloud_console::session::{Cloud, CloudOptions};
use secrecy::SecretString;

use crate::mock::{Reply, ScriptedRemote};

pub const BASE: &str = "https://cloud.example.com/api/";

pub const VAPP_ID: &str = "urn:vcloud:vapp:9ab2";
pub const VM_ON_ID: &str = "urn:vcloud:vm:3f1c";
pub const VM_OFF_ID: &str = "urn:vcloud:vm:7d4e";
pub const TEMPLATE_HREF: &str = "https://cloud.example.com/api/vAppTemplate/vappTemplate-c0de";

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

pub const VERSIONS: &str = r#"<SupportedVersions xmlns="http://www.vmware.com/vcloud/versions">
  <VersionInfo deprecated="false"><Version>1.5</Version><LoginUrl>https://cloud.example.com/api/sessions-old</LoginUrl></VersionInfo>
  <VersionInfo deprecated="false"><Version>5.1</Version><LoginUrl>https://cloud.example.com/api/sessions</LoginUrl></VersionInfo>
</SupportedVersions>"#;

pub const SESSION: &str = r#"<Session xmlns="http://www.vmware.com/vcloud/v1.5" user="alice" org="acme">
  <Link rel="down" type="application/vnd.vmware.vcloud.org+xml" name="acme" href="https://cloud.example.com/api/org/0001"/>
</Session>"#;

pub const NETWORKS: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <OrgVdcNetworkRecord name="net-a" href="https://cloud.example.com/api/network/n1"/>
</QueryResultRecords>"#;

pub const VDCS: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <OrgVdcRecord name="vdc-a" href="https://cloud.example.com/api/vdc/v1"/>
</QueryResultRecords>"#;

pub const NO_RECORDS: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5"/>"#;

pub const VM_RECORDS: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <VMRecord name="web-1" status="POWERED_ON" isVAppTemplate="false"/>
  <VMRecord name="web-2" status="POWERED_OFF" isVAppTemplate="false"/>
  <VMRecord name="tpl-vm" status="POWERED_OFF" isVAppTemplate="true"/>
</QueryResultRecords>"#;

pub const VAPP_RECORDS: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <VAppRecord name="web" href="https://cloud.example.com/api/vApp/vapp-9ab2" vdcName="vdc-a"
      storageKB="2048000" memoryAllocationMB="1024" creationDate="2012-06-01T10:00:00.000Z"/>
</QueryResultRecords>"#;

pub const VAPP_DETAIL: &str = r#"<VApp xmlns="http://www.vmware.com/vcloud/v1.5" xmlns:ovf="http://schemas.dmtf.org/ovf/envelope/1"
    id="urn:vcloud:vapp:9ab2" name="web" status="4" href="https://cloud.example.com/api/vApp/vapp-9ab2">
  <Link rel="power:powerOn" href="https://cloud.example.com/api/vApp/vapp-9ab2/power/action/powerOn"/>
  <Link rel="power:powerOff" href="https://cloud.example.com/api/vApp/vapp-9ab2/power/action/powerOff"/>
  <Link rel="undeploy" href="https://cloud.example.com/api/vApp/vapp-9ab2/action/undeploy"/>
  <Link rel="remove" href="https://cloud.example.com/api/vApp/vapp-9ab2"/>
  <Description>Web tier</Description>
  <Owner><User name="alice" href="https://cloud.example.com/api/admin/user/u1"/></Owner>
  <Children>
    <Vm id="urn:vcloud:vm:3f1c" name="web-1" status="4" href="https://cloud.example.com/api/vApp/vm-3f1c">
      <Link rel="power:powerOff" href="https://cloud.example.com/api/vApp/vm-3f1c/power/action/powerOff"/>
      <Link rel="power:suspend" href="https://cloud.example.com/api/vApp/vm-3f1c/power/action/suspend"/>
      <Link rel="screen:acquireTicket" href="https://cloud.example.com/api/vApp/vm-3f1c/screen/action/acquireTicket"/>
      <ovf:OperatingSystemSection><ovf:Description>Ubuntu Linux (64-bit)</ovf:Description></ovf:OperatingSystemSection>
      <NetworkConnectionSection><NetworkConnection network="net-a"><IpAddress>10.0.0.11</IpAddress></NetworkConnection></NetworkConnectionSection>
    </Vm>
    <Vm id="urn:vcloud:vm:7d4e" name="web-2" status="8" href="https://cloud.example.com/api/vApp/vm-7d4e">
      <Link rel="power:powerOn" href="https://cloud.example.com/api/vApp/vm-7d4e/power/action/powerOn"/>
    </Vm>
  </Children>
  <DateCreated>2012-06-01T10:00:00.000Z</DateCreated>
</VApp>"#;

pub const VM_OFF_POWERED_ON: &str = r#"<Vm xmlns="http://www.vmware.com/vcloud/v1.5" id="urn:vcloud:vm:7d4e" name="web-2" status="4"
    href="https://cloud.example.com/api/vApp/vm-7d4e">
  <Link rel="power:powerOff" href="https://cloud.example.com/api/vApp/vm-7d4e/power/action/powerOff"/>
</Vm>"#;

pub const TEMPLATES: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <VAppTemplateRecord name="ubuntu-small" href="https://cloud.example.com/api/vAppTemplate/vappTemplate-c0de"
      ownerName="system" catalogName="public" memoryAllocationMB="512" cpuAllocationMhz="1" storageKB="1000000"/>
  <VAppTemplateRecord name="windows-large" href="https://cloud.example.com/api/vAppTemplate/vappTemplate-beef"
      ownerName="system" catalogName="public" memoryAllocationMB="4096" cpuAllocationMhz="4" storageKB="40000000"/>
</QueryResultRecords>"#;

pub const TEMPLATE_DETAIL: &str = r#"<VAppTemplate xmlns="http://www.vmware.com/vcloud/v1.5" name="ubuntu-small"
    href="https://cloud.example.com/api/vAppTemplate/vappTemplate-c0de">
  <Description>Small Ubuntu box</Description>
  <NetworkConfigSection><NetworkConfig networkName="VM Network"/></NetworkConfigSection>
  <Children><Vm name="ubuntu-vm" href="https://cloud.example.com/api/vAppTemplate/vm-1"/></Children>
</VAppTemplate>"#;

pub const DOWNLOADS: &str = r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <VAppTemplateRecord href="https://cloud.example.com/api/vAppTemplate/vappTemplate-c0de">
    <Metadata><MetadataEntry><Key>downloads</Key><TypedValue><Value>7</Value></TypedValue></MetadataEntry></Metadata>
  </VAppTemplateRecord>
</QueryResultRecords>"#;

pub fn task(href: &str, status: &str, name: &str, owner: &str) -> String {
    format!(
        r#"<Task xmlns="http://www.vmware.com/vcloud/v1.5" href="{href}" status="{status}" name="{name}"
    operationName="{name}" startTime="2012-06-01T10:00:00.000Z">
  <Owner href="{owner}" name="owner"/>
  <User name="alice"/>
</Task>"#
    )
}

/// Every request a login and its initial refresh make
pub fn script_login(remote: &ScriptedRemote) {
    remote.on_get(&url("versions"), VERSIONS);
    remote.on(
        "POST",
        &url("sessions"),
        Reply::Ok {
            body: SESSION.to_string(),
            token: Some("tok-1".to_string()),
        },
    );
    remote.on_get(&url("session"), SESSION);
    remote.on_get(&url("query?type=orgVdcNetwork&format=records"), NETWORKS);
    remote.on_get(&url("query?type=orgVdc&format=records"), VDCS);
    remote.on_get(&url("query?type=task&pageSize=15&sortDesc=startDate"), NO_RECORDS);
    remote.on_get(&url("query?type=vm&format=records&pageSize=1024"), VM_RECORDS);
    remote.on_get(&url("query?type=vApp&format=records&pageSize=1024"), VAPP_RECORDS);
    remote.on_get(&url("vApp/vapp-9ab2"), VAPP_DETAIL);
    remote.on_get(
        &url("query?type=vAppTemplate&format=records&page=1&pageSize=128"),
        TEMPLATES,
    );
    remote.on_get(
        &url("query?type=vAppTemplate&fields=metadata:downloads&filter=metadata:downloads=ge=NUMBER:0"),
        DOWNLOADS,
    );
    remote.on_get(&url("query?type=task&filter=(status==running)"), NO_RECORDS);
}

pub fn options() -> CloudOptions {
    CloudOptions {
        base_url: BASE.to_string(),
        ..Default::default()
    }
}

pub fn new_cloud() -> (Arc<Cloud>, Arc<ScriptedRemote>) {
    let remote = Arc::new(ScriptedRemote::new());
    let cloud = Arc::new(Cloud::new(options(), remote.clone()).unwrap());
    (cloud, remote)
}

pub fn password() -> SecretString {
    SecretString::from("secret".to_string())
}

pub async fn logged_in() -> (Arc<Cloud>, Arc<ScriptedRemote>) {
    let (cloud, remote) = new_cloud();
    script_login(&remote);
    cloud.login("alice", &password(), "acme").await.unwrap();
    (cloud, remote)
}

/// Collect every payload published on a topic
pub fn record(bus: &EventBus, topic: &str) -> Arc<Mutex<Vec<Payload>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(
        topic,
        handler(move |event| sink.lock().unwrap().push((*event.payload).clone())),
        None,
    );
    seen
}
