//! Current-user, user and member endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use super::deleted;
use crate::{
    error::ApiResult,
    middleware::CurrentUser,
    models::{MemberPayload, UserPayload, UserProfile},
    service::MemberFilter,
    state::AppState,
};

pub async fn current_user(Extension(CurrentUser(user)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(UserProfile::from(user))
}

pub async fn current_members(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.current_active_members(&user).await?))
}

pub async fn current_stashes(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.current_active_stashes(&user).await?))
}

pub async fn can_access(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(stash_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let allowed = state.service.can_access(&user, &stash_id).await?;
    Ok(Json(json!({ "can_access": allowed })))
}

/// Get any user's public profile
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state.service.get_user(&id).await?;
    Ok(Json(UserProfile::from(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<impl IntoResponse> {
    let updated = state.service.update_user(&user, payload).await?;
    Ok(Json(UserProfile::from(updated)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_user(&user, &id).await?;
    Ok(deleted("User"))
}

pub async fn user_members(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, filter)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let filter: MemberFilter = filter.parse()?;
    Ok(Json(state.service.user_members(&user, &id, filter).await?))
}

pub async fn user_stashes(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, filter)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let filter: MemberFilter = filter.parse()?;
    Ok(Json(state.service.user_stashes(&user, &id, filter).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_member(&user, &id).await?))
}

pub async fn update_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<MemberPayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_member(&user, payload).await?))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_member(&user, &id).await?;
    Ok(deleted("Member"))
}
