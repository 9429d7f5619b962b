//! Storage, label, item, order and event endpoints

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
    models::{EventPayload, ItemPayload, LabelPayload, OrderPayload, StoragePayload},
    state::AppState,
};

pub async fn create_storage(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<StoragePayload>,
) -> ApiResult<impl IntoResponse> {
    let storage = state.service.create_storage(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(storage)))
}

pub async fn get_storage(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_storage(&user, &id).await?))
}

pub async fn update_storage(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<StoragePayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_storage(&user, payload).await?))
}

pub async fn delete_storage(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_storage(&user, &id).await?;
    Ok(deleted("Storage"))
}

pub async fn storage_items(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.storage_items(&user, &id).await?))
}

pub async fn create_label(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<LabelPayload>,
) -> ApiResult<impl IntoResponse> {
    let label = state.service.create_label(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(label)))
}

pub async fn get_label(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_label(&user, &id).await?))
}

pub async fn update_label(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<LabelPayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_label(&user, payload).await?))
}

pub async fn delete_label(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_label(&user, &id).await?;
    Ok(deleted("Label"))
}

pub async fn label_items(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.label_items(&user, &id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ItemPayload>,
) -> ApiResult<impl IntoResponse> {
    let item = state.service.create_item(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_item(&user, &id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ItemPayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_item(&user, payload).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_item(&user, &id).await?;
    Ok(deleted("Item"))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<OrderPayload>,
) -> ApiResult<impl IntoResponse> {
    let order = state.service.create_order(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_order(&user, &id).await?))
}

pub async fn update_order(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<OrderPayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_order(&user, payload).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_order(&user, &id).await?;
    Ok(deleted("Order"))
}

pub async fn order_items(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.order_items(&user, &id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<EventPayload>,
) -> ApiResult<impl IntoResponse> {
    let event = state.service.create_event(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get_event(&user, &id).await?))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<EventPayload>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.update_event(&user, payload).await?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_event(&user, &id).await?;
    Ok(deleted("Event"))
}
