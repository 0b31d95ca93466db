//! Request handlers for the action endpoints.

use crate::error::DashboardError;
use crate::principal::Actor;
use crate::state::AppState;
use axum::{
    Form, Json,
    extract::{
        Path, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use campus_core::{
    ActionError, ActionErrorKind, ActionResult, FieldError, PersonForm, PersonKind, RecordForm,
    RecordKind,
};
use serde::Deserialize;
use serde_json::{Value, json};

// =============================================================================
// Resources
// =============================================================================

/// What `/api/{resource}` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Person(PersonKind),
    Record(RecordKind),
}

impl Resource {
    pub fn from_segment(segment: &str) -> Option<Self> {
        [PersonKind::Teacher, PersonKind::Student, PersonKind::Parent]
            .into_iter()
            .find(|k| k.resource() == segment)
            .map(Resource::Person)
            .or_else(|| {
                RecordKind::ALL
                    .into_iter()
                    .find(|k| k.resource() == segment)
                    .map(Resource::Record)
            })
    }
}

fn resolve(segment: &str) -> Result<Resource, DashboardError> {
    Resource::from_segment(segment)
        .ok_or_else(|| DashboardError::NotFound(format!("resource '{}'", segment)))
}

// =============================================================================
// Responses
// =============================================================================

/// HTTP status for an action result.
pub fn status_for(result: &ActionResult) -> StatusCode {
    let Some(error) = result.error() else {
        return StatusCode::OK;
    };
    match error.kind {
        ActionErrorKind::MissingIdentifier => StatusCode::BAD_REQUEST,
        ActionErrorKind::NotPermitted => StatusCode::FORBIDDEN,
        ActionErrorKind::CapacityExceeded | ActionErrorKind::DuplicateField => {
            StatusCode::CONFLICT
        }
        ActionErrorKind::ValidationFailure | ActionErrorKind::ExternalProviderRejected => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ActionErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Normalized action result with its mapped status.
pub struct ActionResponse(pub ActionResult);

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(self.0)).into_response()
    }
}

impl From<ActionError> for ActionResponse {
    fn from(error: ActionError) -> Self {
        ActionResponse(ActionResult::Error(error))
    }
}

fn invalid_body(err: impl std::fmt::Display) -> ActionResponse {
    ActionError::validation(&[FieldError::new("body", &err.to_string())]).into()
}

// =============================================================================
// Health
// =============================================================================

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "campus" }))
}

// =============================================================================
// Actions
// =============================================================================

async fn upsert(
    state: &AppState,
    actor: &Actor,
    resource: Resource,
    body: Value,
    update: bool,
) -> ActionResponse {
    match resource {
        Resource::Person(kind) => {
            let form = match PersonForm::from_json(kind, body) {
                Ok(form) => form,
                Err(e) => return invalid_body(e),
            };
            if update && form.id().is_none() {
                return ActionError::missing_identifier(kind.as_str()).into();
            }
            if let Err(errors) = form.validate(update) {
                return ActionError::validation(&errors).into();
            }
            let provisioner = state.provisioner();
            let result = if update {
                provisioner.update(&form).await
            } else {
                provisioner.create(&form).await
            };
            ActionResponse(result)
        }
        Resource::Record(kind) => {
            let form = match RecordForm::from_json(kind, body) {
                Ok(form) => form,
                Err(e) => return invalid_body(e),
            };
            if update && form.id().is_none() {
                return ActionError::missing_identifier(kind.as_str()).into();
            }
            if let Err(errors) = form.validate() {
                return ActionError::validation(&errors).into();
            }
            let records = state.records();
            let result = if update {
                records.update(&actor.0, &form).await
            } else {
                records.create(&actor.0, &form).await
            };
            ActionResponse(result)
        }
    }
}

/// `POST /api/{resource}`
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Path(segment): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ActionResponse, DashboardError> {
    let resource = resolve(&segment)?;
    tracing::debug!(resource = %segment, role = %actor.0.role, "Create requested");
    match body {
        Ok(Json(body)) => Ok(upsert(&state, &actor, resource, body, false).await),
        Err(rejection) => Ok(invalid_body(rejection.body_text())),
    }
}

/// `PUT /api/{resource}`
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(segment): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ActionResponse, DashboardError> {
    let resource = resolve(&segment)?;
    tracing::debug!(resource = %segment, role = %actor.0.role, "Update requested");
    match body {
        Ok(Json(body)) => Ok(upsert(&state, &actor, resource, body, true).await),
        Err(rejection) => Ok(invalid_body(rejection.body_text())),
    }
}

/// Form body of a delete.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub id: String,
}

/// `DELETE /api/{resource}` with form body `id=...`
pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(segment): Path<String>,
    params: Result<Form<DeleteParams>, FormRejection>,
) -> Result<ActionResponse, DashboardError> {
    let resource = resolve(&segment)?;
    let params = match params {
        Ok(Form(params)) => params,
        Err(rejection) => return Ok(invalid_body(rejection.body_text())),
    };
    tracing::debug!(resource = %segment, id = %params.id, role = %actor.0.role, "Delete requested");

    let result = match resource {
        Resource::Person(kind) => state.provisioner().delete(kind, &params.id).await,
        Resource::Record(kind) => {
            let raw = params.id.trim();
            if raw.is_empty() {
                return Ok(ActionError::missing_identifier(kind.as_str()).into());
            }
            match raw.parse::<i64>() {
                Ok(id) => state.records().delete(&actor.0, kind, id).await,
                Err(_) => {
                    return Ok(ActionError::validation(&[FieldError::new(
                        "id",
                        &format!("Invalid {} ID", kind),
                    )])
                    .into());
                }
            }
        }
    };
    Ok(ActionResponse(result))
}
