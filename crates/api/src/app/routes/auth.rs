//! Registration, login, token refresh, and the current-user views.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;

use akademi_registry::session::{LoginInput, RegisterInput};

use crate::app::routes::Services;
use crate::app::{dto, errors};
use crate::context::AuthContext;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/register
pub async fn register(
    Extension(services): Extension<Services>,
    Json(input): Json<RegisterInput>,
) -> axum::response::Response {
    match services.session.register(input).await {
        Ok(profile) => dto::data_response(StatusCode::CREATED, "user registered", profile),
        Err(e) => errors::error_response(e),
    }
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Services>,
    Json(input): Json<LoginInput>,
) -> axum::response::Response {
    match services.session.login(input).await {
        Ok(out) => dto::data_response(StatusCode::OK, "login successful", out),
        Err(e) => errors::error_response(e),
    }
}

/// POST /auth/refresh
pub async fn refresh(
    Extension(services): Extension<Services>,
    Json(input): Json<RefreshRequest>,
) -> axum::response::Response {
    match services.session.refresh(&input.refresh_token).await {
        Ok(pair) => dto::data_response(StatusCode::OK, "token refreshed", pair),
        Err(e) => errors::error_response(e),
    }
}

/// GET /auth/me
pub async fn me(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    match services.session.profile(ctx.user_id()).await {
        Ok(profile) => dto::data_response(StatusCode::OK, "profile", profile),
        Err(e) => errors::error_response(e),
    }
}

/// GET /users/me/memberships
pub async fn my_memberships(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
) -> axum::response::Response {
    match services.directory.user_memberships(ctx.user_id()).await {
        Ok(memberships) => dto::data_response(StatusCode::OK, "memberships", memberships),
        Err(e) => errors::error_response(e),
    }
}
