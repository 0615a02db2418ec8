//! Role catalog endpoints.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use akademi_auth::Permission;
use akademi_core::{OrgId, RoleId};
use akademi_registry::model::RoleKind;
use akademi_registry::roles::{CreateRole, UpdateRole};
use akademi_registry::store::RoleFilter;

use crate::app::routes::{parse_id, require_any, Services};
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleListQuery {
    #[serde(flatten)]
    pub page: dto::ListQuery,
    pub organization_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub is_global: Option<bool>,
}

impl RoleListQuery {
    fn filter(&self) -> Result<RoleFilter, axum::response::Response> {
        let organization_id = match self.organization_id.as_deref() {
            Some(raw) => Some(parse_id::<OrgId>(raw)?),
            None => None,
        };
        let kind = match self.kind.as_deref() {
            Some(raw) => Some(RoleKind::parse(raw).map_err(errors::error_response)?),
            None => None,
        };
        Ok(RoleFilter {
            organization_id,
            name: self.name.clone(),
            kind,
            is_global: self.is_global,
        })
    }
}

pub async fn create(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateRole>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("roles", "create")]).await
    {
        return resp;
    }
    match services.roles.create(input).await {
        Ok(role) => dto::data_response(StatusCode::CREATED, "role created", role),
        Err(e) => errors::error_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<RoleListQuery>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("roles", "read")]).await
    {
        return resp;
    }
    let filter = match query.filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    match services.roles.list(filter, query.page.page_params()).await {
        Ok(page) => dto::list_response("roles", page),
        Err(e) => errors::error_response(e),
    }
}

pub async fn get_one(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("roles", "read")]).await
    {
        return resp;
    }
    let id = match parse_id::<RoleId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.roles.get(id).await {
        Ok(role) => dto::data_response(StatusCode::OK, "role", role),
        Err(e) => errors::error_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateRole>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("roles", "update")]).await
    {
        return resp;
    }
    let id = match parse_id::<RoleId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.roles.update(id, input).await {
        Ok(role) => dto::data_response(StatusCode::OK, "role updated", role),
        Err(e) => errors::error_response(e),
    }
}

pub async fn delete(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("roles", "delete")]).await
    {
        return resp;
    }
    let id = match parse_id::<RoleId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.roles.delete(id).await {
        Ok(()) => dto::data_response(StatusCode::OK, "role deleted", serde_json::Value::Null),
        Err(e) => errors::error_response(e),
    }
}
