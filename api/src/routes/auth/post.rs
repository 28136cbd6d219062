use axum::{Json, extract::State, http::StatusCode};
use db::models::refresh_token::Model as RefreshToken;
use db::models::user::{Model as User, Role};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use util::{config, state::AppState};
use validator::Validate;

use crate::auth::generate_jwt;
use crate::response::ApiResponse;
use crate::routes::common::format_validation_errors;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Default)]
pub struct LoginResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
    pub token: String,
    pub expires_at: String,
    pub refresh_token: String,
}

/// POST /auth/login
///
/// Exchange credentials for an access JWT and a refresh token.
///
/// ### Responses
/// - `200 OK` with the user payload, `token`, `expires_at`, `refresh_token`
/// - `400 Bad Request` on validation failure
/// - `401 Unauthorized` for an unknown username or a wrong password (the two
///   are indistinguishable to the caller)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> (StatusCode, Json<ApiResponse<LoginResponse>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }

    let db = state.db();

    let user = match User::find_by_username(db, &req.username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Invalid username or password")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Database error: {e}"))),
            );
        }
    };

    if !user.verify_password(&req.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid username or password")),
        );
    }

    let (token, expires_at) = generate_jwt(user.id, user.role);
    let refresh =
        RefreshToken::issue(db, user.id, config::refresh_token_expiry_days() as i64).await;

    match refresh {
        Ok((refresh_token, _)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                LoginResponse {
                    id: user.id,
                    username: user.username,
                    email: user.email,
                    role: Some(user.role),
                    token,
                    expires_at,
                    refresh_token,
                },
                "Login successful",
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to issue refresh token: {e}"
            ))),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Default)]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: String,
    pub refresh_token: String,
}

/// POST /auth/refresh-token
///
/// Redeem a refresh token for a new access JWT. The presented token is
/// revoked and replaced in the same step, so each refresh token works
/// exactly once.
///
/// ### Responses
/// - `200 OK` with `token`, `expires_at` and the replacement `refresh_token`
/// - `401 Unauthorized` for unknown, revoked, or expired tokens
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> (StatusCode, Json<ApiResponse<RefreshResponse>>) {
    let db = state.db();

    let current = match RefreshToken::find_valid(db, &req.refresh_token).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Invalid or expired refresh token")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Database error: {e}"))),
            );
        }
    };

    let user = match db::models::User::find_by_id(current.user_id).one(db).await {
        Ok(Some(user)) => user,
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Invalid or expired refresh token")),
            );
        }
    };

    match current
        .rotate(db, config::refresh_token_expiry_days() as i64)
        .await
    {
        Ok((new_refresh, _)) => {
            let (token, expires_at) = generate_jwt(user.id, user.role);
            (
                StatusCode::OK,
                Json(ApiResponse::success(
                    RefreshResponse {
                        token,
                        expires_at,
                        refresh_token: new_refresh,
                    },
                    "Token refreshed",
                )),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to rotate refresh token: {e}"
            ))),
        ),
    }
}

/// POST /auth/logout
///
/// Revoke the presented refresh token. Succeeds even when the token is
/// already invalid, so logout is always safe to call.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> (StatusCode, Json<ApiResponse<crate::auth::guards::Empty>>) {
    let db = state.db();

    if let Ok(Some(row)) = RefreshToken::find_valid(db, &req.refresh_token).await {
        if let Err(e) = row.revoke(db).await {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Database error: {e}"))),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            crate::auth::guards::Empty,
            "Logged out",
        )),
    )
}
