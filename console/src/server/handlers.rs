//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use vcloud_model::{Task, Template, VApp, Vm};

use crate::cache::SortBy;
use crate::errors::CloudError;
use crate::search::Facets;
use crate::server::errors::ApiError;
use crate::server::state::ServerState;
use crate::session::Metrics;
use crate::tasks::{HistoryRow, TaskOutcome};
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub logged_in: bool,
    pub connected: bool,
    pub tasks_in_progress: usize,
}

pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "cloud-console".to_string(),
        version: version.version,
        logged_in: state.cloud.is_logged_in(),
        connected: state.cloud.is_connected(),
        tasks_in_progress: state.cloud.tasks().number_of_tasks(),
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
}

/// A vApp with its derived state
#[derive(Debug, Serialize)]
pub struct VAppView {
    #[serde(flatten)]
    pub vapp: VApp,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct VmView {
    #[serde(flatten)]
    pub vm: Vm,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct VAppDetail {
    #[serde(flatten)]
    pub view: VAppView,
    pub vms: Vec<VmView>,
}

fn vapp_view(state: &ServerState, vapp: VApp) -> VAppView {
    let status = vapp
        .id()
        .and_then(|id| state.cloud.vapp_status(id))
        .map(|s| s.label().to_string())
        .unwrap_or_default();
    VAppView { vapp, status }
}

fn vm_view(state: &ServerState, vm: Vm) -> VmView {
    let status = vm
        .id()
        .and_then(|id| state.cloud.vm_status(id))
        .map(|s| s.label().to_string())
        .unwrap_or_default();
    VmView { vm, status }
}

pub async fn vapps_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let sort = match query.sort.as_deref() {
        Some("date") => SortBy::Date,
        _ => SortBy::Name,
    };
    let views: Vec<VAppView> = state
        .cloud
        .vapps(sort)
        .into_iter()
        .map(|vapp| vapp_view(&state, vapp))
        .collect();
    Json(views)
}

pub async fn vapp_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vapp = state
        .cloud
        .vapp(&id)
        .ok_or_else(|| CloudError::NotFound(format!("vApp {}", id)))?;
    let vms = state
        .cloud
        .entities()
        .vm_children(&vapp)
        .into_iter()
        .map(|vm| vm_view(&state, vm))
        .collect();
    Ok(Json(VAppDetail {
        view: vapp_view(&state, vapp),
        vms,
    }))
}

pub async fn vms_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let views: Vec<VmView> = state
        .cloud
        .vms()
        .into_iter()
        .map(|vm| vm_view(&state, vm))
        .collect();
    Json(views)
}

pub async fn catalog_handler(State(state): State<Arc<ServerState>>) -> Json<Vec<Template>> {
    Json(state.cloud.catalog().templates())
}

pub async fn tasks_handler(State(state): State<Arc<ServerState>>) -> Json<Vec<HistoryRow>> {
    Json(state.cloud.history())
}

pub async fn metrics_handler(State(state): State<Arc<ServerState>>) -> Json<Metrics> {
    Json(state.cloud.metrics())
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// False when a refresh was already running
    pub started: bool,
}

pub async fn refresh_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let started = state.cloud.request_full_refresh().await?;
    Ok(Json(RefreshResponse { started }))
}

#[derive(Debug, Deserialize)]
pub struct CatalogPageRequest {
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    crate::session::refresh::CATALOG_PAGE_SIZE
}

pub async fn catalog_page_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CatalogPageRequest>,
) -> Result<Json<Vec<Template>>, ApiError> {
    let templates = state
        .cloud
        .request_catalog_page(request.page, request.size)
        .await?;
    Ok(Json(templates))
}

pub async fn search_handler(
    State(state): State<Arc<ServerState>>,
    Json(facets): Json<Facets>,
) -> Result<Json<Vec<Template>>, ApiError> {
    Ok(Json(state.cloud.search(&facets).await?))
}

/// Where an action's task stands
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub outcome: &'static str,
    pub task: Option<Task>,
}

impl From<TaskOutcome> for ActionResponse {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Duplicate => Self {
                outcome: "duplicate",
                task: None,
            },
            TaskOutcome::Pending => Self {
                outcome: "pending",
                task: None,
            },
            TaskOutcome::Completed { task, success } => Self {
                outcome: if success { "completed" } else { "failed" },
                task: Some(task),
            },
            TaskOutcome::RefreshRequired { task } => Self {
                outcome: "refreshing",
                task: Some(task),
            },
        }
    }
}

pub async fn action_handler(
    State(state): State<Arc<ServerState>>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = state.cloud.perform_entity_action(&id, &action).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FavoriteRequest {
    pub favorite: bool,
}

pub async fn favorite_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<FavoriteRequest>, ApiError> {
    if !state.cloud.set_favorite(&id, request.favorite) {
        return Err(CloudError::NotFound(format!("entity {}", id)).into());
    }
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct InstantiateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub vdc: String,
    #[serde(default)]
    pub network: String,
    pub template_href: String,
    #[serde(default)]
    pub power_on: bool,
}

#[derive(Debug, Serialize)]
pub struct InstantiateResponse {
    /// False when the VDC or template is unknown
    pub accepted: bool,
}

pub async fn instantiate_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<InstantiateRequest>,
) -> Result<Json<InstantiateResponse>, ApiError> {
    let accepted = state
        .cloud
        .instantiate_from_template(
            &request.name,
            &request.description,
            &request.vdc,
            &request.network,
            &request.template_href,
            request.power_on,
        )
        .await?;
    Ok(Json(InstantiateResponse { accepted }))
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub bytes: usize,
}

pub async fn save_cache_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<SaveResponse>, ApiError> {
    let blob = state.cloud.save_cache_blob()?;
    state.blob_store.save(&blob).await?;
    info!("Cache saved ({} bytes)", blob.len());
    Ok(Json(SaveResponse { bytes: blob.len() }))
}
