//! Stash endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::deleted;
use crate::{
    error::ApiResult,
    middleware::CurrentUser,
    models::{JoinStashRequest, StashPayload},
    service::MemberFilter,
    state::AppState,
};

pub async fn create_stash(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<StashPayload>,
) -> ApiResult<impl IntoResponse> {
    let stash = state.service.create_stash(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(stash)))
}

/// Join a stash with its join code
pub async fn join_stash(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<JoinStashRequest>,
) -> ApiResult<impl IntoResponse> {
    let member = state.service.join_stash(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_stash(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_stash(&user, &id).await?))
}

pub async fn update_stash(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<StashPayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_stash(&user, payload).await?))
}

pub async fn delete_stash(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_stash(&user, &id).await?;
    Ok(deleted("Stash"))
}

pub async fn stash_storages(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.stash_storages(&user, &id).await?))
}

pub async fn stash_labels(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.stash_labels(&user, &id).await?))
}

pub async fn stash_items(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.stash_items(&user, &id).await?))
}

pub async fn stash_orders(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.stash_orders(&user, &id).await?))
}

pub async fn stash_events(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.stash_events(&user, &id).await?))
}

pub async fn stash_members(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, filter)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let filter: MemberFilter = filter.parse()?;
    Ok(Json(state.service.stash_members(&user, &id, filter).await?))
}
