//! Route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use projectdrive_common::{ProjectCode, Provider};
use projectdrive_projects::{NewProject, Project};

use crate::admin::Admin;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the admin API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/projects", post(create_project))
        .route("/admin/projects/dropbox", post(create_dropbox_project))
        .route("/admin/projects/{code}", get(get_project))
        .route(
            "/admin/projects/{code}/link",
            post(create_gdrive_link).delete(revoke_gdrive_link),
        )
        .route(
            "/admin/projects/{code}/link/dropbox",
            post(create_dropbox_link).delete(revoke_dropbox_link),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    providers: Vec<Provider>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        providers: state.service.registry().available(),
    })
}

/// Body of the legacy Dropbox-only create route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropboxProjectBody {
    event_name: String,
    event_date: String,
}

async fn create_project(
    State(state): State<AppState>,
    Admin(admin): Admin,
    ApiJson(request): ApiJson<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.service.create_project(request, &admin).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn create_dropbox_project(
    State(state): State<AppState>,
    Admin(admin): Admin,
    ApiJson(body): ApiJson<DropboxProjectBody>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let request = NewProject {
        event_name: body.event_name,
        event_date: body.event_date,
        provider: Provider::Dropbox,
    };
    let project = state.service.create_project(request, &admin).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    Admin(_admin): Admin,
    Path(code): Path<String>,
) -> ApiResult<Json<Project>> {
    let code = ProjectCode::new(code)?;
    Ok(Json(state.service.get_project(&code).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkResponse {
    project_code: ProjectCode,
    provider: Provider,
    export_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_link_id: Option<String>,
}

async fn create_link(
    state: AppState,
    admin: Admin,
    code: String,
    provider: Provider,
) -> ApiResult<Json<LinkResponse>> {
    let code = ProjectCode::new(code)?;
    let outcome = state
        .service
        .get_or_create_export_link(&code, provider, &admin.0)
        .await?;
    Ok(Json(LinkResponse {
        project_code: code,
        provider,
        export_link: outcome.link.url,
        export_link_id: outcome.link.id,
    }))
}

async fn revoke_link(
    state: AppState,
    admin: Admin,
    code: String,
    provider: Provider,
) -> ApiResult<Json<Project>> {
    let code = ProjectCode::new(code)?;
    let project = state
        .service
        .revoke_export_link(&code, provider, &admin.0)
        .await?;
    Ok(Json(project))
}

async fn create_gdrive_link(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
) -> ApiResult<Json<LinkResponse>> {
    create_link(state, admin, code, Provider::Gdrive).await
}

async fn revoke_gdrive_link(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
) -> ApiResult<Json<Project>> {
    revoke_link(state, admin, code, Provider::Gdrive).await
}

async fn create_dropbox_link(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
) -> ApiResult<Json<LinkResponse>> {
    create_link(state, admin, code, Provider::Dropbox).await
}

async fn revoke_dropbox_link(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
) -> ApiResult<Json<Project>> {
    revoke_link(state, admin, code, Provider::Dropbox).await
}
