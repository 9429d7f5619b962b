//! Authentication middleware for JWT token validation

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use crate::{
    auth::TokenType,
    error::ApiError,
    models::User,
    service::ServiceError,
    state::AppState,
};

/// The user behind the request's access token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = state
        .jwt_service
        .validate_token(bearer.token(), TokenType::Access)?;

    let user = state
        .service
        .get_user(&claims.sub)
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => ApiError::NotFound("User not found.".to_string()),
            other => other.into(),
        })?;
    debug!("Authenticated user {}", claims.sub);

    // Insert the user into the request extensions
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
