//! Permission catalog endpoints. No update route: permissions are immutable.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use akademi_auth::Permission;
use akademi_core::PermissionId;
use akademi_registry::permissions::CreatePermission;
use akademi_registry::store::PermissionFilter;

use crate::app::routes::{parse_id, require_any, Services};
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct PermissionListQuery {
    #[serde(flatten)]
    pub page: dto::ListQuery,
    pub name: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

pub async fn create(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreatePermission>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("permissions", "create")],
    )
    .await
    {
        return resp;
    }
    match services.permissions.create(input).await {
        Ok(permission) => {
            dto::data_response(StatusCode::CREATED, "permission created", permission)
        }
        Err(e) => errors::error_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<PermissionListQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("permissions", "read")],
    )
    .await
    {
        return resp;
    }
    let filter = PermissionFilter {
        name: query.name.clone(),
        resource: query.resource.clone(),
        action: query.action.clone(),
    };
    match services
        .permissions
        .list(filter, query.page.page_params())
        .await
    {
        Ok(page) => dto::list_response("permissions", page),
        Err(e) => errors::error_response(e),
    }
}

pub async fn get_one(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("permissions", "read")],
    )
    .await
    {
        return resp;
    }
    let id = match parse_id::<PermissionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.permissions.get(id).await {
        Ok(permission) => dto::data_response(StatusCode::OK, "permission", permission),
        Err(e) => errors::error_response(e),
    }
}

pub async fn delete(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("permissions", "delete")],
    )
    .await
    {
        return resp;
    }
    let id = match parse_id::<PermissionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.permissions.delete(id).await {
        Ok(()) => {
            dto::data_response(StatusCode::OK, "permission deleted", serde_json::Value::Null)
        }
        Err(e) => errors::error_response(e),
    }
}
