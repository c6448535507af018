//! REST API handlers.
//!
//! Status and events are read-only snapshots of the registry; `/add` is the
//! only mutating route.

use axum::Json;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect};
use serde::Deserialize;
use tracing::debug;

use netwatch_monitor::AddDeviceRequest;
use netwatch_state::{AddOutcome, EVENTS_WINDOW, StateError};

use crate::ApiState;
use crate::export::render_csv;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn state_error_response(e: &StateError) -> axum::response::Response {
    let status = match e {
        StateError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status).into_response()
}

/// GET /
pub async fn index(State(state): State<ApiState>) -> impl IntoResponse {
    let registry = state.monitor.registry();
    Json(serde_json::json!({
        "devices": registry.len().await,
        "transitions": registry.transition_count().await,
    }))
}

/// GET /status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.monitor.registry().snapshot().await)
}

/// GET /events
pub async fn events(State(state): State<ApiState>) -> impl IntoResponse {
    Json(
        state
            .monitor
            .registry()
            .recent_transitions(EVENTS_WINDOW)
            .await,
    )
}

/// Form body of `POST /add`.
#[derive(Debug, Default, Deserialize)]
pub struct AddForm {
    #[serde(default, alias = "ip")]
    pub address: String,
    pub name: Option<String>,
    pub group: Option<String>,
    #[serde(alias = "short_name")]
    pub short_label: Option<String>,
}

impl From<AddForm> for AddDeviceRequest {
    fn from(form: AddForm) -> Self {
        Self {
            address: form.address,
            name: form.name,
            group: form.group,
            short_label: form.short_label,
        }
    }
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

/// POST /add
///
/// Browsers get a redirect back to `/`; JSON clients get `201` with the new
/// device, or `200` with `{"added": false}` when it was already registered.
pub async fn add_device(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Form(form): Form<AddForm>,
) -> impl IntoResponse {
    let json = wants_json(&headers);
    match state.monitor.add_device(form.into()).await {
        Ok(outcome) if !json => {
            if outcome == AddOutcome::AlreadyRegistered {
                debug!("duplicate add request ignored");
            }
            Redirect::to("/").into_response()
        }
        Ok(AddOutcome::Added(device)) => (
            StatusCode::CREATED,
            ApiResponse::ok(serde_json::json!({
                "added": true,
                "address": device.address.clone(),
                "device": device,
            })),
        )
            .into_response(),
        Ok(AddOutcome::AlreadyRegistered) => {
            ApiResponse::ok(serde_json::json!({ "added": false })).into_response()
        }
        Err(e) => state_error_response(&e),
    }
}

/// GET /export
pub async fn export(State(state): State<ApiState>) -> impl IntoResponse {
    let records = state.monitor.registry().all_transitions().await;
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transitions.csv\"",
            ),
        ],
        render_csv(&records),
    )
}

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
