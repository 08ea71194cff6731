//! HTTP API over the analysis services.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Status, version and stored analysis counts |
//! | `GET`    | `/repos/{owner}/{repo}/analysis` | Cached, stored or fresh analysis (`?strict=true` surfaces 404s) |
//! | `DELETE` | `/repos/{owner}/{repo}/analysis` | Invalidate store and cache |
//! | `POST`   | `/repos/{owner}/{repo}/reanalyze` | Invalidate and recompute |
//! | `POST`   | `/projects` | Project analysis for `{ "id": ... }` |
//! | `DELETE` | `/projects/{id}` | Invalidate a project analysis |
//! | `POST`   | `/projects/{id}/reanalyze` | Invalidate and recompute a project |
//! | `GET`    | `/projects/search` | Stored projects by `query`/`tech`, paged by `page`/`limit` |
//! | `GET`    | `/projects/random` | `count` random stored projects (default 6) |
//! | `POST`   | `/projects/{id}/score` | Judge scores for a project |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "repository o/r not found" } }
//! ```
//!
//! Codes: `bad_request` (400), `access_denied` (403), `not_found` (404),
//! `timeout` (408), `rate_limited` (429), `internal` (500), `upstream` (502).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use hackscope_core::catalog::{sample_size, ProjectCard, ProjectQuery, ProjectScore, SearchResults};
use hackscope_core::models::RepoKey;

use crate::config::Config;
use crate::errors::AnalysisError;
use crate::orchestrator::{AnalysisMode, AnalysisOutcome};
use crate::project::ProjectOutcome;
use crate::services::Services;

/// Build the router. Separate from [`run_server`] so tests can drive it directly.
pub fn router(services: Services) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/repos/{owner}/{repo}/analysis",
            get(handle_get_analysis).delete(handle_invalidate_analysis),
        )
        .route("/repos/{owner}/{repo}/reanalyze", post(handle_reanalyze))
        .route("/projects", post(handle_get_project))
        .route("/projects/{id}", axum::routing::delete(handle_invalidate_project))
        .route("/projects/search", get(handle_search_projects))
        .route("/projects/random", get(handle_random_projects))
        .route("/projects/{id}/reanalyze", post(handle_reanalyze_project))
        .route("/projects/{id}/score", post(handle_score_project))
        .layer(cors)
        .with_state(services)
}

pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config).await?;
    let app = router(services);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "hackscope listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        let (status, code) = match &err {
            AnalysisError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AnalysisError::AccessDenied { .. } => (StatusCode::FORBIDDEN, "access_denied"),
            AnalysisError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AnalysisError::Timeout { .. } => (StatusCode::REQUEST_TIMEOUT, "timeout"),
            AnalysisError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AnalysisError::Generation(_)
            | AnalysisError::Validation(_)
            | AnalysisError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "request failed");
            "internal error, please try again later".to_string()
        } else {
            err.to_string()
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

fn repo_key(owner: String, repo: String) -> Result<RepoKey, AppError> {
    if RepoKey::is_valid_name(&owner) && RepoKey::is_valid_name(&repo) {
        Ok(RepoKey::new(owner, repo))
    } else {
        Err(bad_request(format!("invalid repository '{}/{}'", owner, repo)))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    repo_analyses: u64,
    project_analyses: u64,
}

async fn handle_health(State(services): State<Services>) -> Result<Json<HealthResponse>, AppError> {
    let (repos, projects) = tokio::join!(services.repos.count(), services.projects.count());
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        repo_analyses: repos?,
        project_analyses: projects?,
    }))
}

// ============ Repository analyses ============

#[derive(Deserialize, Default)]
struct AnalysisQuery {
    #[serde(default)]
    strict: bool,
}

async fn handle_get_analysis(
    State(services): State<Services>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let key = repo_key(owner, repo)?;
    let mode = if query.strict {
        AnalysisMode::Strict
    } else {
        AnalysisMode::Lenient
    };
    Ok(Json(services.repos.get_analysis(&key, mode).await?))
}

async fn handle_invalidate_analysis(
    State(services): State<Services>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let key = repo_key(owner, repo)?;
    services.repos.invalidate_analysis(&key).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_reanalyze(
    State(services): State<Services>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let key = repo_key(owner, repo)?;
    Ok(Json(services.repos.reanalyze(&key).await?))
}

// ============ Project analyses ============

#[derive(Deserialize)]
struct ProjectRequest {
    id: Option<String>,
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

type ProjectResponse = Envelope<ProjectOutcome>;

async fn handle_get_project(
    State(services): State<Services>,
    Json(req): Json<ProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| bad_request("Project ID is required"))?;
    let data = services.projects.get_project(id.trim()).await?;
    Ok(Json(ProjectResponse {
        success: true,
        data,
    }))
}

async fn handle_invalidate_project(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    services.projects.invalidate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_reanalyze_project(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, AppError> {
    let data = services.projects.reanalyze(&id).await?;
    Ok(Json(ProjectResponse {
        success: true,
        data,
    }))
}

#[derive(Deserialize, Default)]
struct SearchParams {
    query: Option<String>,
    tech: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

async fn handle_search_projects(
    State(services): State<Services>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<SearchResults>>, AppError> {
    let query = ProjectQuery::new(
        params.query.as_deref(),
        params.tech.as_deref(),
        params.page,
        params.limit,
    );
    let data = services.projects.search(&query).await?;
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}

#[derive(Deserialize, Default)]
struct RandomParams {
    count: Option<usize>,
}

async fn handle_random_projects(
    State(services): State<Services>,
    Query(params): Query<RandomParams>,
) -> Result<Json<Envelope<Vec<ProjectCard>>>, AppError> {
    let data = services.projects.sample(sample_size(params.count)).await?;
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}

async fn handle_score_project(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> Result<Json<ProjectScore>, AppError> {
    Ok(Json(services.projects.score(&id).await?))
}
