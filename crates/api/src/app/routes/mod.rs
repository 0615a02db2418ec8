use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Router,
};

use akademi_auth::Permission;
use akademi_core::AppError;

use crate::app::{errors, AppServices};
use crate::context::AuthContext;

pub mod auth;
pub mod organizations;
pub mod permissions;
pub mod roles;
pub mod system;
pub mod units;

/// Router for the unauthenticated endpoints.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users/me/memberships", get(auth::my_memberships))
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
        .nest("/organizations", organizations::router())
        .nest("/units", units::router())
}

/// Permission gate shared by the handlers (OR semantics).
pub(crate) async fn require_any(
    services: &AppServices,
    ctx: &AuthContext,
    required: &[Permission],
) -> Result<(), axum::response::Response> {
    services
        .policy
        .require_any(ctx.user_id(), required)
        .await
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

pub(crate) fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = AppError>,
{
    raw.parse::<T>().map_err(errors::error_response)
}

pub(crate) type Services = Arc<AppServices>;
