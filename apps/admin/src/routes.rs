use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::RwLock;
use registry::{
    AgentDraft, AgentRecord, AgentRegistry, Credentials, LoginFlow, LoginOutcome, PageSizes,
    RegistryError, StatusFilter, ViewQuery,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<AgentRegistry>>,
    pub login: LoginFlow,
    pub page_sizes: PageSizes,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agents", get(list_agents).post(create_agent))
        .route("/agents/:id/status", put(update_status))
        .route("/auth/login", post(login))
        .route("/auth/session", get(current_session))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    rows: Option<usize>,
}

#[derive(Debug, Serialize)]
struct AgentPage {
    items: Vec<AgentRecord>,
    total: usize,
    page: usize,
    rows_per_page: usize,
    from: usize,
    to: usize,
    has_previous: bool,
    has_next: bool,
    rows_options: Vec<usize>,
}

async fn list_agents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<AgentPage> {
    let page_index = params.page.unwrap_or(0);
    let page_size = state.page_sizes.resolve(params.rows);
    let rows_options = state.page_sizes.options().to_vec();

    let status = match StatusFilter::parse(params.status.as_deref().unwrap_or_default()) {
        Ok(status) => status,
        Err(err) => {
            debug!(error = %err, "unrecognised status filter matches nothing");
            return Json(AgentPage {
                items: Vec::new(),
                total: 0,
                page: page_index,
                rows_per_page: page_size,
                from: 0,
                to: 0,
                has_previous: page_index > 0,
                has_next: false,
                rows_options,
            });
        }
    };

    let view = ViewQuery::new(params.search.unwrap_or_default(), status).page(page_index, page_size);
    let registry = state.registry.read();
    let page = registry.project(&view);
    Json(AgentPage {
        items: page.to_owned_items(),
        total: page.total_matching,
        page: page.page_index,
        rows_per_page: page.page_size,
        from: page.from(),
        to: page.to(),
        has_previous: page.has_previous(),
        has_next: page.has_next(),
        rows_options,
    })
}

async fn create_agent(
    State(state): State<AppState>,
    Json(draft): Json<AgentDraft>,
) -> Result<(StatusCode, Json<AgentRecord>), ApiError> {
    let record = state.registry.write().create(draft)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    active: bool,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Json<Value> {
    let updated = state.registry.write().set_status(&id, update.active);
    Json(json!({ "updated": updated }))
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, ApiError> {
    match state.login.sign_in(&credentials).await {
        LoginOutcome::Authenticated { redirect, user } => {
            Ok(Json(json!({ "redirect": redirect, "user": user })))
        }
        LoginOutcome::Failed { message } => Err(ApiError::Unauthorized(message)),
    }
}

async fn current_session(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let session = state.login.session();
    let token = session
        .token()?
        .ok_or_else(|| ApiError::Unauthorized("not signed in".to_string()))?;
    let user = session.user()?;
    Ok(Json(json!({ "token": token, "user": user })))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidDraft(_)
            | RegistryError::UnknownVoice(_)
            | RegistryError::InvalidStatus(_)
            | RegistryError::UnsupportedPageSize(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        error!(%message, kind = ?self, "request failed");
        (status, Json(json!({ "error": message }))).into_response()
    }
}
