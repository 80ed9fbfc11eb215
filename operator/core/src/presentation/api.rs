// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::application::alarm_service::{
    AlarmOrigin, AlarmService, CreateAlarmRequest, UpdateAlarmRequest,
};
use crate::application::catalog_service::{CreateTemplateRequest, GuidanceCatalogService};
use crate::application::directory_service::{
    CreatePremiseRequest, CreateUserRequest, DirectoryService,
};
use crate::application::incident_service::{
    AssignGuidanceRequest, CreateIncidentRequest, IncidentService,
};
use crate::domain::alarm::AlarmId;
use crate::domain::directory::UserId;
use crate::domain::error::OperatorError;
use crate::domain::guidance::{IncidentGuidanceId, IncidentGuidanceStepId};
use crate::domain::incident::IncidentId;

pub struct AppState {
    pub alarm_service: Arc<dyn AlarmService>,
    pub incident_service: Arc<dyn IncidentService>,
    pub catalog_service: Arc<dyn GuidanceCatalogService>,
    pub directory_service: Arc<dyn DirectoryService>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/alarms", post(create_alarm).get(list_alarms))
        .route("/alarms/{id}", patch(update_alarm))
        .route("/incidents", post(create_incident))
        .route("/incidents/{id}", get(get_incident))
        .route("/incidents/{id}/assign-guidance", post(assign_guidance))
        .route("/incidents/{id}/complete", post(complete_incident))
        .route("/incidents/{id}/guidance", get(get_incident_guidance))
        .route("/users", post(create_user))
        .route("/users/me/assignments", get(get_assignments))
        .route(
            "/users/me/{assignment_id}/steps/{step_id}",
            patch(complete_step),
        )
        .route("/premises", post(create_premise))
        .route(
            "/guidance-templates",
            post(create_template).get(list_templates),
        )
        .route("/guidance-templates/{id}", get(get_template))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Wraps the domain error so axum can turn it into a response.
pub struct ApiError(OperatorError);

impl From<OperatorError> for ApiError {
    fn from(err: OperatorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OperatorError::BadRequest(_) => StatusCode::BAD_REQUEST,
            OperatorError::NotFound(_) => StatusCode::NOT_FOUND,
            OperatorError::Conflict(_) => StatusCode::CONFLICT,
            OperatorError::Database { .. } | OperatorError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// The caller identity injected by the auth gateway in front of this
/// service.
fn caller_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| OperatorError::bad_request("missing x-user-id header"))?;
    let id = Uuid::parse_str(raw)
        .map_err(|_| OperatorError::bad_request("invalid x-user-id header"))?;
    Ok(UserId(id))
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| OperatorError::bad_request(format!("invalid {what} format")).into())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn create_alarm(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAlarmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alarm = state
        .alarm_service
        .create_alarm(req, AlarmOrigin::Api)
        .await?;
    Ok((StatusCode::CREATED, Json(alarm)))
}

#[derive(Deserialize)]
struct AlarmListQuery {
    status: Option<String>,
}

async fn list_alarms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlarmListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let alarms = state.alarm_service.get_alarms(query.status).await?;
    Ok(Json(alarms))
}

async fn update_alarm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAlarmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = AlarmId(parse_uuid(&id, "alarm id")?);
    let alarm = state.alarm_service.update_alarm(id, req).await?;
    Ok(Json(alarm))
}

async fn create_incident(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIncidentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = state.incident_service.create_incident(req).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

async fn get_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = IncidentId(parse_uuid(&id, "incident id")?);
    let incident = state.incident_service.get_incident(id).await?;
    Ok(Json(incident))
}

async fn assign_guidance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AssignGuidanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let incident_id = IncidentId(parse_uuid(&id, "incident id")?);
    let assigner = caller_id(&headers)?;
    let assignment = state
        .incident_service
        .assign_guidance(incident_id, req, assigner)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn complete_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = IncidentId(parse_uuid(&id, "incident id")?);
    let incident = state.incident_service.complete_incident(id).await?;
    Ok(Json(incident))
}

async fn get_incident_guidance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = IncidentId(parse_uuid(&id, "incident id")?);
    let assignment = state.incident_service.get_incident_guidance(id).await?;
    Ok(Json(assignment))
}

async fn get_assignments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let assignee = caller_id(&headers)?;
    let assignments = state.incident_service.get_assignments(assignee).await?;
    Ok(Json(assignments))
}

async fn complete_step(
    State(state): State<Arc<AppState>>,
    Path((assignment_id, step_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    // The caller header is required on every /users/me route, even though
    // step ownership is keyed by the assignment id.
    caller_id(&headers)?;
    let assignment_id = IncidentGuidanceId(parse_uuid(&assignment_id, "assignment id")?);
    let step_id = IncidentGuidanceStepId(parse_uuid(&step_id, "step id")?);
    let step = state
        .incident_service
        .complete_step(assignment_id, step_id)
        .await?;
    Ok(Json(step))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.directory_service.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn create_premise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePremiseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let premise = state.directory_service.create_premise(req).await?;
    Ok((StatusCode::CREATED, Json(premise)))
}

async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state.catalog_service.create_template(req).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = state.catalog_service.list_templates().await?;
    Ok(Json(templates))
}

async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state.catalog_service.get_template(&id).await?;
    Ok(Json(template))
}
