//! API service routes
//!
//! Everything except `/health` and `/auth/*` sits behind the bearer-token
//! middleware, which puts the [`CurrentUser`](crate::middleware::CurrentUser)
//! into the request extensions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;

use crate::{middleware::auth_middleware, state::AppState};

mod auth;
mod inventory;
mod stashes;
mod users;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/current/user", get(users::current_user))
        .route("/current/members/active", get(users::current_members))
        .route("/current/stashes/active", get(users::current_stashes))
        .route("/current/can_access/:stash_id", get(users::can_access))
        .route("/user", patch(users::update_user))
        .route("/user/:id", get(users::get_user).delete(users::delete_user))
        .route("/user/:id/members/:filter", get(users::user_members))
        .route("/user/:id/stashes/:filter", get(users::user_stashes))
        .route("/member", patch(users::update_member))
        .route(
            "/member/:id",
            get(users::get_member).delete(users::delete_member),
        )
        .route(
            "/stash",
            post(stashes::create_stash).patch(stashes::update_stash),
        )
        .route("/stash/join", post(stashes::join_stash))
        .route(
            "/stash/:id",
            get(stashes::get_stash).delete(stashes::delete_stash),
        )
        .route("/stash/:id/storages", get(stashes::stash_storages))
        .route("/stash/:id/labels", get(stashes::stash_labels))
        .route("/stash/:id/items", get(stashes::stash_items))
        .route("/stash/:id/orders", get(stashes::stash_orders))
        .route("/stash/:id/events", get(stashes::stash_events))
        .route("/stash/:id/members/:filter", get(stashes::stash_members))
        .route(
            "/storage",
            post(inventory::create_storage).patch(inventory::update_storage),
        )
        .route(
            "/storage/:id",
            get(inventory::get_storage).delete(inventory::delete_storage),
        )
        .route("/storage/:id/items", get(inventory::storage_items))
        .route(
            "/label",
            post(inventory::create_label).patch(inventory::update_label),
        )
        .route(
            "/label/:id",
            get(inventory::get_label).delete(inventory::delete_label),
        )
        .route("/label/:id/items", get(inventory::label_items))
        .route(
            "/item",
            post(inventory::create_item).patch(inventory::update_item),
        )
        .route(
            "/item/:id",
            get(inventory::get_item).delete(inventory::delete_item),
        )
        .route(
            "/order",
            post(inventory::create_order).patch(inventory::update_order),
        )
        .route(
            "/order/:id",
            get(inventory::get_order).delete(inventory::delete_order),
        )
        .route("/order/:id/items", get(inventory::order_items))
        .route(
            "/event",
            post(inventory::create_event).patch(inventory::update_event),
        )
        .route(
            "/event/:id",
            get(inventory::get_event).delete(inventory::delete_event),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/auth/logout", post(auth::logout))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "stash-api"
    }))
}

/// JSON body for a successful delete
fn deleted(kind: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "message": format!("{} deleted successfully", kind) })),
    )
}
