//! Registration and token endpoints

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    auth::{Claims, TokenType},
    error::{ApiError, ApiResult},
    models::{LoginRequest, RegisterRequest, UserProfile},
    state::AppState,
};

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserProfile,
}

/// Request for token refresh
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Response for token refresh
#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.service.authenticate(payload).await?;

    let access_token = state.jwt_service.generate_access_token(&user.meta.id)?;
    let refresh_token = state.jwt_service.generate_refresh_token(&user.meta.id)?;

    let response = TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
        user: user.into(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Validate a refresh token and make sure it was not revoked
async fn live_refresh_claims(state: &AppState, token: &str) -> ApiResult<Claims> {
    let claims = state.jwt_service.validate_token(token, TokenType::Refresh)?;

    if let Some(redis_pool) = &state.redis_pool {
        let revoked = state
            .jwt_service
            .is_revoked(redis_pool, &claims)
            .await
            .map_err(|e| {
                error!("Failed to check token revocation: {}", e);
                ApiError::ServiceUnavailable
            })?;
        if revoked {
            return Err(ApiError::Unauthorized("Token has been revoked".to_string()));
        }
    }
    Ok(claims)
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = live_refresh_claims(&state, &payload.refresh_token).await?;

    // The user may have been deleted since the token was issued
    let user = state.service.get_user(&claims.sub).await?;
    let access_token = state.jwt_service.generate_access_token(&user.meta.id)?;
    info!("Refreshed access token for user {}", user.meta.id);

    let response = RefreshTokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = live_refresh_claims(&state, &payload.refresh_token).await?;

    match &state.redis_pool {
        Some(redis_pool) => {
            state
                .jwt_service
                .revoke(redis_pool, &claims)
                .await
                .map_err(|e| {
                    error!("Failed to revoke token: {}", e);
                    ApiError::ServiceUnavailable
                })?;
            info!("Revoked refresh token of user {}", claims.sub);
        }
        None => warn!("Redis is not configured; refresh token stays valid until it expires"),
    }

    Ok(Json(json!({"message": "Logged out successfully"})))
}
