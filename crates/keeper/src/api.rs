//! HTTP command surface
//!
//! Recovery and formation triggers for one cluster at a time. Every request
//! blocks until the operation finishes; failures are always reported back.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use topology::{ClusterId, Orchestrator};

/// HTTP API service
pub struct CommandApi {
    orchestrator: Arc<Orchestrator>,
}

impl CommandApi {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/cluster/:namespace/:cluster_name/reset", post(reset))
            .route("/cluster/:namespace/:cluster_name/force-reset", post(force_reset))
            .route("/cluster/:namespace/:cluster_name/form", post(form))
            .route("/cluster/:namespace/:cluster_name/status", get(status))
            .with_state(self.orchestrator)
    }
}

// ==================== Response types ====================

#[derive(Serialize)]
struct ApiResponse<T> {
    status: &'static str,
    #[serde(flatten)]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: Option<T>) -> Response {
        let body = Self {
            status: "OK",
            data,
            error: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

fn error_response(msg: impl Into<String>) -> Response {
    let body = ApiResponse::<()> {
        status: "Error",
        data: None,
        error: Some(msg.into()),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn respond<T: Serialize>(result: topology::Result<T>) -> Response {
    match result {
        Ok(data) => ApiResponse::ok(Some(data)),
        Err(e) => error_response(e.to_string()),
    }
}

fn respond_empty(result: topology::Result<()>) -> Response {
    match result {
        Ok(()) => ApiResponse::<()>::ok(None),
        Err(e) => error_response(e.to_string()),
    }
}

// ==================== Handlers ====================

async fn reset(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((namespace, cluster_name)): Path<(String, String)>,
) -> Response {
    let id = ClusterId::new(namespace, cluster_name);
    info!(cluster = %id, "Graceful recovery requested");
    respond_empty(orchestrator.recover(&id).await)
}

async fn force_reset(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((namespace, cluster_name)): Path<(String, String)>,
) -> Response {
    let id = ClusterId::new(namespace, cluster_name);
    info!(cluster = %id, "Forced recovery requested");
    respond_empty(orchestrator.force_recover(&id).await)
}

async fn form(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((namespace, cluster_name)): Path<(String, String)>,
) -> Response {
    let id = ClusterId::new(namespace, cluster_name);
    info!(cluster = %id, "Formation requested");
    respond(orchestrator.form(&id).await)
}

async fn status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path((namespace, cluster_name)): Path<(String, String)>,
) -> Response {
    let id = ClusterId::new(namespace, cluster_name);
    respond(orchestrator.status(&id).await)
}
