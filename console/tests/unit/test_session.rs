//! Session orchestrator tests

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cloud_console::builder::MetadataValue;
use cloud_console::cache::SortBy;
use cloud_console::errors::CloudError;
use cloud_console::events::{Payload, Topics};
use cloud_console::http::SESSION_HEADER;
use cloud_console::search::Facets;
use cloud_console::session::{LOST_CONNECTIVITY, SYSTEM_NOT_SUPPORTED};
use cloud_console::status::PowerState;
use cloud_console::tasks::TaskOutcome;

use crate::fixtures::*;
use crate::mock::Reply;

#[tokio::test]
async fn test_login_loads_the_whole_model() {
    let (cloud, remote) = new_cloud();
    script_login(&remote);
    let logins = record(cloud.bus(), Topics::LOGIN);
    let refreshes = record(cloud.bus(), Topics::REFRESH_COMPLETE);
    let progress = record(cloud.bus(), Topics::PROGRESS_UPDATE);

    let user = cloud.login("alice", &password(), "acme").await.unwrap();
    assert_eq!(user.name, "alice");
    assert_eq!(user.org, "acme");

    let login_request = remote
        .requests()
        .into_iter()
        .find(|r| r.method == "POST" && r.url == url("sessions"))
        .unwrap();
    let expected = format!("Basic {}", STANDARD.encode("alice@acme:secret"));
    assert!(login_request
        .headers
        .iter()
        .any(|(name, value)| name == "Authorization" && *value == expected));
    assert_eq!(remote.header(SESSION_HEADER).as_deref(), Some("tok-1"));

    match &logins.lock().unwrap()[0] {
        Payload::Login(login) => {
            assert!(login.success);
            assert!(!login.confirm);
            assert_eq!(login.user.as_deref(), Some("alice"));
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert_eq!(
        *refreshes.lock().unwrap(),
        vec![Payload::RefreshComplete { loaded: true }]
    );
    assert_eq!(
        *progress.lock().unwrap(),
        vec![Payload::Progress(50.0), Payload::Progress(100.0)]
    );

    let vapps = cloud.vapps(SortBy::Name);
    assert_eq!(vapps.len(), 1);
    assert_eq!(vapps[0].id(), Some(VAPP_ID));
    assert_eq!(vapps[0].attr.vdc_name.as_deref(), Some("vdc-a"));
    assert_eq!(vapps[0].children, vec![VM_ON_ID.to_string(), VM_OFF_ID.to_string()]);
    assert_eq!(cloud.vms().len(), 2);
    assert_eq!(cloud.vapp_status(VAPP_ID), Some(PowerState::Partial));

    assert_eq!(cloud.networks(), vec!["net-a".to_string()]);
    assert_eq!(cloud.vdcs(), vec!["vdc-a".to_string()]);
    assert!(cloud.catalog().is_complete());
    assert_eq!(cloud.catalog().len(), 2);
    assert_eq!(
        cloud
            .catalog()
            .template(TEMPLATE_HREF)
            .and_then(|t| t.attr.downloads),
        Some("7".to_string())
    );
}

#[tokio::test]
async fn test_unsupported_server_is_reported() {
    let (cloud, remote) = new_cloud();
    remote.on_get(
        &url("versions"),
        r#"<SupportedVersions><VersionInfo><Version>1.5</Version><LoginUrl>x</LoginUrl></VersionInfo></SupportedVersions>"#,
    );
    let errors = record(cloud.bus(), Topics::ERROR);

    let result = cloud.initialize().await;
    assert!(matches!(result, Err(CloudError::UnsupportedServer(_))));
    assert_eq!(
        *errors.lock().unwrap(),
        vec![Payload::Error(SYSTEM_NOT_SUPPORTED.to_string())]
    );
}

#[tokio::test]
async fn test_rejected_login_publishes_failure() {
    let (cloud, remote) = new_cloud();
    remote.on_get(&url("versions"), VERSIONS);
    remote.on("POST", &url("sessions"), Reply::Unauthorized);
    let logins = record(cloud.bus(), Topics::LOGIN);

    let result = cloud.login("alice", &password(), "acme").await;
    assert!(matches!(result, Err(CloudError::AuthFailure(_))));
    assert!(!cloud.is_logged_in());

    match &logins.lock().unwrap()[0] {
        Payload::Login(login) => {
            assert!(!login.success);
            assert!(login.message.is_some());
        }
        other => panic!("unexpected payload {:?}", other),
    };
}

#[tokio::test]
async fn test_confirm_session_reuses_the_token() {
    let (cloud, remote) = new_cloud();
    script_login(&remote);
    let logins = record(cloud.bus(), Topics::LOGIN);

    let user = cloud.confirm_session().await.unwrap();
    assert_eq!(user.name, "alice");
    match &logins.lock().unwrap()[0] {
        Payload::Login(login) => assert!(login.confirm && login.success),
        other => panic!("unexpected payload {:?}", other),
    }
    assert_eq!(cloud.vapps(SortBy::Name).len(), 1);
}

#[tokio::test]
async fn test_vm_power_on_completes_once() {
    let (cloud, remote) = logged_in().await;
    let h1 = url("task/h1");
    let owner = url("vApp/vm-7d4e");
    remote.on(
        "POST",
        &url("vApp/vm-7d4e/power/action/powerOn"),
        Reply::ok(task(&h1, "running", "powerOn", &owner)),
    );
    remote.on_get(&h1, &task(&h1, "success", "powerOn", &owner));
    remote.on_get(&owner, VM_OFF_POWERED_ON);
    let started = record(cloud.bus(), Topics::TASK_START);
    let completed = record(cloud.bus(), Topics::TASK_COMPLETE);

    let outcome = cloud
        .perform_entity_action(VM_OFF_ID, "power:powerOn")
        .await
        .unwrap();
    assert_eq!(outcome, TaskOutcome::Pending);
    assert_eq!(started.lock().unwrap().len(), 1);
    assert!(cloud.tasks().has_active());
    assert_eq!(cloud.vm_status(VM_OFF_ID), Some(PowerState::Working));

    assert!(!cloud.poll_tasks().await);
    assert!(!cloud.poll_tasks().await);

    let completed = completed.lock().unwrap();
    assert_eq!(completed.len(), 1);
    match &completed[0] {
        Payload::Task(payload) => {
            assert!(payload.success);
            assert_eq!(payload.task.href, h1);
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert!(cloud.tasks().is_logged(&h1));
    assert!(!cloud.tasks().has_active());
    assert_eq!(remote.count("GET", &h1), 1);
    assert_eq!(cloud.vm_status(VM_OFF_ID), Some(PowerState::On));
    assert_eq!(cloud.vapp_status(VAPP_ID), Some(PowerState::On));
}

#[tokio::test]
async fn test_delete_triggers_full_refresh_instead_of_completion() {
    let (cloud, remote) = logged_in().await;
    let vm_query = url("query?type=vm&format=records&pageSize=1024");
    assert_eq!(remote.count("GET", &vm_query), 1);

    let href = url("task/d1");
    remote.on(
        "DELETE",
        &url("vApp/vapp-9ab2"),
        Reply::ok(task(&href, "success", "delete", &url("vApp/vapp-9ab2"))),
    );
    let completed = record(cloud.bus(), Topics::TASK_COMPLETE);

    let outcome = cloud.perform_entity_action(VAPP_ID, "remove").await.unwrap();
    assert!(matches!(outcome, TaskOutcome::RefreshRequired { .. }));
    assert!(completed.lock().unwrap().is_empty());
    assert_eq!(remote.count("GET", &vm_query), 2);
    assert!(cloud.tasks().is_logged(&href));
}

#[tokio::test]
async fn test_vapp_power_off_undeploys_and_marks_busy() {
    let (cloud, remote) = logged_in().await;
    let href = url("task/u1");
    let undeploy = url("vApp/vapp-9ab2/action/undeploy");
    remote.on(
        "POST",
        &undeploy,
        Reply::ok(task(&href, "running", "vappUndeployPowerOff", &url("vApp/vapp-9ab2"))),
    );

    cloud
        .perform_entity_action(VAPP_ID, "power:powerOff")
        .await
        .unwrap();

    let request = remote
        .requests()
        .into_iter()
        .find(|r| r.url == undeploy)
        .unwrap();
    assert_eq!(request.method, "POST");
    assert!(request.body.unwrap().contains("<UndeployPowerAction>powerOff</UndeployPowerAction>"));
    assert_eq!(
        request.content_type.as_deref(),
        Some("application/vnd.vmware.vcloud.undeployVAppParams+xml")
    );
    assert_eq!(cloud.vapp_status(VAPP_ID), Some(PowerState::Working));
    assert!(!cloud.can_power_on(VAPP_ID));
}

#[tokio::test]
async fn test_unknown_entity_action_guesses_url() {
    let (cloud, remote) = logged_in().await;
    let guessed = url("vApp/vapp-ffff/power/action/powerOn");
    let href = url("task/g1");
    remote.on(
        "POST",
        &guessed,
        Reply::ok(task(&href, "running", "powerOn", &url("vApp/vapp-ffff"))),
    );

    let outcome = cloud
        .perform_entity_action("urn:vcloud:vapp:ffff", "power:powerOn")
        .await
        .unwrap();
    assert_eq!(outcome, TaskOutcome::Pending);
    assert_eq!(remote.count("POST", &guessed), 1);
    assert_eq!(
        cloud.guess_action_url("urn:vcloud:vapp:ffff", "discardSuspendedState").unwrap(),
        url("vApp/vapp-ffff/action/discardSuspendedState")
    );
}

#[tokio::test]
async fn test_instantiate_posts_params_for_known_vdc() {
    let (cloud, remote) = logged_in().await;
    assert!(!cloud
        .instantiate_from_template("new", "", "missing-vdc", "net-a", TEMPLATE_HREF, false)
        .await
        .unwrap());

    let action = "https://cloud.example.com/api/vdc/v1/action/instantiateVAppTemplate";
    remote.on_get(TEMPLATE_HREF, TEMPLATE_DETAIL);
    remote.on(
        "POST",
        action,
        Reply::ok(task(&url("task/i1"), "running", "vdcInstantiateVapp", "https://cloud.example.com/api/vdc/v1")),
    );

    let accepted = cloud
        .instantiate_from_template("new & shiny", "desc", "vdc-a", "net-a", TEMPLATE_HREF, true)
        .await
        .unwrap();
    assert!(accepted);

    let request = remote.requests().into_iter().find(|r| r.url == action).unwrap();
    let body = request.body.unwrap();
    assert!(body.contains("name=\"new &amp; shiny\""));
    assert!(body.contains("networkName=\"VM Network\""));
    assert!(body.contains("href=\"https://cloud.example.com/api/network/n1\""));
    assert!(body.contains("powerOn=\"true\""));
    assert!(cloud.catalog().template(TEMPLATE_HREF).unwrap().is_filled());
    assert!(cloud.tasks().has_active());
}

#[tokio::test]
async fn test_instantiate_failure_publishes_server_message() {
    let (cloud, remote) = logged_in().await;
    remote.on_get(TEMPLATE_HREF, TEMPLATE_DETAIL);
    remote.on(
        "POST",
        "https://cloud.example.com/api/vdc/v1/action/instantiateVAppTemplate",
        Reply::Status {
            status: 400,
            body: r#"<Error xmlns="http://www.vmware.com/vcloud/v1.5" message="The VDC is out of resources" majorErrorCode="400"/>"#.to_string(),
        },
    );
    let errors = record(cloud.bus(), Topics::ERROR);

    let result = cloud
        .instantiate_from_template("new", "", "vdc-a", "net-a", TEMPLATE_HREF, false)
        .await;
    assert!(result.is_err());
    assert_eq!(
        *errors.lock().unwrap(),
        vec![Payload::Error("The VDC is out of resources".to_string())]
    );
}

#[tokio::test]
async fn test_expired_session_resets_state() {
    let (cloud, remote) = logged_in().await;
    remote.replace("GET", &url("vApp/vapp-9ab2"), Reply::Unauthorized);
    let logins = record(cloud.bus(), Topics::LOGIN);
    let errors = record(cloud.bus(), Topics::ERROR);

    let result = cloud.refresh_single(&url("vApp/vapp-9ab2")).await;
    assert!(matches!(result, Err(CloudError::AuthFailure(_))));
    assert!(!cloud.is_logged_in());
    assert!(remote.header(SESSION_HEADER).is_none());
    match &logins.lock().unwrap()[0] {
        Payload::Login(login) => assert!(!login.success),
        other => panic!("unexpected payload {:?}", other),
    }
    assert!(errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_lost_connectivity_is_announced_once() {
    let (cloud, remote) = logged_in().await;
    remote.replace(
        "GET",
        &url("query?type=vm&format=records&pageSize=1024"),
        Reply::Status {
            status: 503,
            body: String::new(),
        },
    );
    let errors = record(cloud.bus(), Topics::ERROR);

    assert!(cloud.request_full_refresh().await.is_err());
    assert!(cloud.request_full_refresh().await.is_err());
    assert!(!cloud.is_connected());
    assert_eq!(
        *errors.lock().unwrap(),
        vec![Payload::Error(LOST_CONNECTIVITY.to_string())]
    );
    assert!(!cloud.is_refreshing());
    assert_eq!(cloud.vapps(SortBy::Name).len(), 1);
}

#[tokio::test]
async fn test_failed_vapp_detail_keeps_previous_generation() {
    let (cloud, remote) = logged_in().await;
    remote.replace(
        "GET",
        &url("vApp/vapp-9ab2"),
        Reply::Status {
            status: 503,
            body: String::new(),
        },
    );
    let completed = record(cloud.bus(), Topics::REFRESH_COMPLETE);

    let result = cloud.request_full_refresh().await;
    assert!(matches!(result, Err(CloudError::Status { status: 503, .. })));
    assert!(completed.lock().unwrap().is_empty());
    assert_eq!(cloud.vapps(SortBy::Name).len(), 1);
    assert_eq!(cloud.entities().vms().len(), 2);
    assert!(cloud.vm(VM_ON_ID).is_some());

    remote.replace("GET", &url("vApp/vapp-9ab2"), Reply::ok(VAPP_DETAIL));
    assert!(cloud.request_full_refresh().await.unwrap());
    assert_eq!(
        *completed.lock().unwrap(),
        vec![Payload::RefreshComplete { loaded: true }]
    );
}

#[tokio::test]
async fn test_short_vm_count_does_not_commit() {
    let (cloud, remote) = logged_in().await;
    remote.replace(
        "GET",
        &url("query?type=vm&format=records&pageSize=1024"),
        Reply::ok(
            r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <VMRecord name="web-1" status="POWERED_ON" isVAppTemplate="false"/>
  <VMRecord name="web-2" status="POWERED_OFF" isVAppTemplate="false"/>
  <VMRecord name="db-1" status="POWERED_OFF" isVAppTemplate="false"/>
</QueryResultRecords>"#,
        ),
    );
    let completed = record(cloud.bus(), Topics::REFRESH_COMPLETE);

    let result = cloud.request_full_refresh().await;
    assert!(matches!(
        result,
        Err(CloudError::IncompleteRefresh {
            received: 2,
            total: 3
        })
    ));
    assert!(completed.lock().unwrap().is_empty());
    assert_eq!(cloud.entities().vms().len(), 2);
}

#[tokio::test]
async fn test_empty_refresh_commits_an_empty_model() {
    let (cloud, remote) = logged_in().await;
    remote.replace("GET", &url("query?type=vm&format=records&pageSize=1024"), Reply::ok(NO_RECORDS));
    remote.replace("GET", &url("query?type=vApp&format=records&pageSize=1024"), Reply::ok(NO_RECORDS));
    let completed = record(cloud.bus(), Topics::REFRESH_COMPLETE);
    let progress = record(cloud.bus(), Topics::PROGRESS_UPDATE);

    assert!(cloud.request_full_refresh().await.unwrap());
    assert_eq!(
        *completed.lock().unwrap(),
        vec![Payload::RefreshComplete { loaded: false }]
    );
    assert!(progress.lock().unwrap().is_empty());
    assert!(cloud.entities().is_empty());
    assert!(cloud.vapps(SortBy::Name).is_empty());
}

#[tokio::test]
async fn test_edit_vapp_puts_document() {
    let (cloud, remote) = logged_in().await;
    remote.on(
        "PUT",
        &url("vApp/vapp-9ab2"),
        Reply::ok(task(&url("task/e1"), "running", "vappUpdateVm", &url("vApp/vapp-9ab2"))),
    );

    cloud.edit_vapp(VAPP_ID, Some("renamed"), None).await.unwrap();

    let request = remote
        .requests()
        .into_iter()
        .find(|r| r.method == "PUT")
        .unwrap();
    let body = request.body.unwrap();
    assert!(body.contains("name=\"renamed\""));
    assert!(body.contains("<vcloud:Description>Web tier</vcloud:Description>"));
    assert_eq!(
        request.content_type.as_deref(),
        Some("application/vnd.vmware.vcloud.vApp+xml")
    );
}

#[tokio::test]
async fn test_search_over_loaded_catalog() {
    let (cloud, _remote) = logged_in().await;
    let results = record(cloud.bus(), Topics::SEARCH_COMPLETE);

    let mut facets = Facets::new();
    facets.insert("memory".to_string(), "256-1024".to_string());
    let found = cloud.search(&facets).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), Some("ubuntu-small"));
    assert_eq!(results.lock().unwrap().len(), 1);

    let found = cloud.search_term("WINDOWS").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), Some("windows-large"));
}

#[tokio::test]
async fn test_catalog_page_is_fetched_only_with_holes() {
    let (cloud, remote) = new_cloud();
    let page = url("query?type=vAppTemplate&format=records&page=1&pageSize=2");
    remote.on_get(&page, TEMPLATES);
    let updates = record(cloud.bus(), Topics::TEMPLATE_REFRESH);

    assert_eq!(cloud.request_catalog_page(1, 2).await.unwrap().len(), 2);
    assert_eq!(cloud.request_catalog_page(1, 2).await.unwrap().len(), 2);
    assert_eq!(remote.count("GET", &page), 1);
    assert_eq!(updates.lock().unwrap().len(), 2);
    assert!(!cloud.catalog().is_complete());
}

#[tokio::test]
async fn test_metrics_totals() {
    let (cloud, _remote) = logged_in().await;
    let metrics = cloud.metrics();

    assert_eq!(metrics.total_storage, 2048.0);
    assert_eq!(metrics.total_memory, 1024);
    assert_eq!(metrics.total_running, 1);
    assert_eq!(metrics.total_stopped, 0);
    assert_eq!(metrics.tasks_per_hour, 0.0);
}

#[tokio::test]
async fn test_console_ticket_clones_host_session() {
    let (cloud, remote) = logged_in().await;
    remote.on(
        "POST",
        &url("vApp/vm-3f1c/screen/action/acquireTicket"),
        Reply::ok(r#"<ScreenTicket xmlns="http://www.vmware.com/vcloud/v1.5">mks://esx1.example.com/vm-42?ticket=abc%3D%3D</ScreenTicket>"#),
    );
    remote.on(
        "POST",
        "https://esx1.example.com:9443/sdk",
        Reply::ok(r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><CloneSessionResponse xmlns="urn:vim25"><returnval><key>52b1-session</key></returnval></CloneSessionResponse></soapenv:Body></soapenv:Envelope>"#),
    );
    let tickets = record(cloud.bus(), Topics::NEW_TICKET);

    let ticket = cloud.acquire_console_ticket(VM_ON_ID).await.unwrap();
    assert_eq!(ticket.host, "esx1.example.com");
    assert_eq!(ticket.moid, "vm-42");
    assert_eq!(ticket.ticket, "abc==");
    assert_eq!(ticket.session.as_deref(), Some("52b1-session"));
    assert_eq!(tickets.lock().unwrap().len(), 1);

    let soap = remote
        .requests()
        .into_iter()
        .find(|r| r.url.ends_with(":9443/sdk"))
        .unwrap();
    assert!(soap
        .headers
        .iter()
        .any(|(name, value)| name == "SOAPAction" && value == "urn:vim25/4.1"));

    assert!(matches!(
        cloud.acquire_console_ticket(VM_OFF_ID).await,
        Err(CloudError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_set_metadata_posts_typed_value() {
    let (cloud, remote) = logged_in().await;
    let target = format!("{}/metadata", TEMPLATE_HREF);
    remote.on("POST", &target, Reply::ok(""));

    cloud
        .set_metadata(TEMPLATE_HREF, "downloads", MetadataValue::Number(8))
        .await
        .unwrap();

    let request = remote.requests().into_iter().find(|r| r.url == target).unwrap();
    assert!(request.body.unwrap().contains("MetadataNumberValue"));
    assert_eq!(
        request.content_type.as_deref(),
        Some("application/vnd.vmware.vcloud.metadata+xml")
    );
}

#[tokio::test]
async fn test_filter_vapps_by_numeric_metadata() {
    let (cloud, remote) = logged_in().await;
    remote.on_get(
        &url("query?type=vApp&fields=metadata:tier&filter=metadata:tier=ge=NUMBER:0"),
        r#"<QueryResultRecords xmlns="http://www.vmware.com/vcloud/v1.5">
  <VAppRecord href="https://cloud.example.com/api/vApp/vapp-9ab2">
    <Metadata><MetadataEntry><Key>tier</Key><TypedValue><Value>2</Value></TypedValue></MetadataEntry></Metadata>
  </VAppRecord>
</QueryResultRecords>"#,
    );

    let found = cloud.filter_vapps("tier").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get(&url("vApp/vapp-9ab2")).map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_cache_blob_round_trip() {
    let (cloud, _remote) = logged_in().await;
    assert!(cloud.set_favorite(VAPP_ID, true));
    let blob = cloud.save_cache_blob().unwrap();

    let (restored, _) = new_cloud();
    let refreshes = record(restored.bus(), Topics::REFRESH_COMPLETE);
    restored.load_cache_blob(&blob).unwrap();

    assert_eq!(restored.vapps(SortBy::Name), cloud.vapps(SortBy::Name));
    assert!(restored.vapp(VAPP_ID).unwrap().favorite);
    assert_eq!(restored.catalog().len(), 2);
    assert_eq!(
        *refreshes.lock().unwrap(),
        vec![Payload::RefreshComplete { loaded: true }]
    );
}
