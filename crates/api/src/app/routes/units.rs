//! Unit CRUD plus the unit membership sub-resource.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use akademi_auth::Permission;
use akademi_core::{MemberId, OrgId, UnitId};
use akademi_registry::members::{AddUnitMember, UpdateUnitMember};
use akademi_registry::model::UnitRole;
use akademi_registry::store::UnitMemberFilter;
use akademi_registry::tenants::{CreateUnit, UpdateUnit};

use crate::app::routes::{parse_id, require_any, Services};
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).put(update).delete(delete))
        .route("/:id/members", get(list_members).post(add_member))
        .route(
            "/:id/members/:member_id",
            axum::routing::put(update_member).delete(remove_member),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub organization_id: String,
    #[serde(flatten)]
    pub unit: CreateUnit,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnitListQuery {
    #[serde(flatten)]
    pub page: dto::ListQuery,
    pub organization_id: Option<String>,
}

pub async fn create(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateUnitRequest>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("units", "create")]).await
    {
        return resp;
    }
    let org_id = match parse_id::<OrgId>(&input.organization_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.create_unit(org_id, input.unit).await {
        Ok(unit) => dto::data_response(StatusCode::CREATED, "unit created", unit),
        Err(e) => errors::error_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<UnitListQuery>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("units", "read")]).await
    {
        return resp;
    }
    let org_id = match query.organization_id.as_deref() {
        Some(raw) => match parse_id::<OrgId>(raw) {
            Ok(id) => Some(id),
            Err(resp) => return resp,
        },
        None => None,
    };
    match services
        .tenants
        .list_units(org_id, query.page.page_params())
        .await
    {
        Ok(page) => dto::list_response("units", page),
        Err(e) => errors::error_response(e),
    }
}

pub async fn get_one(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("units", "read")]).await
    {
        return resp;
    }
    let id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.get_unit(id).await {
        Ok(unit) => dto::data_response(StatusCode::OK, "unit", unit),
        Err(e) => errors::error_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUnit>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("units", "update")]).await
    {
        return resp;
    }
    let id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.update_unit(id, input).await {
        Ok(unit) => dto::data_response(StatusCode::OK, "unit updated", unit),
        Err(e) => errors::error_response(e),
    }
}

pub async fn delete(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("units", "delete")]).await
    {
        return resp;
    }
    let id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.delete_unit(id).await {
        Ok(()) => dto::data_response(StatusCode::OK, "unit deleted", serde_json::Value::Null),
        Err(e) => errors::error_response(e),
    }
}

// ─── membership sub-resource ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct MemberListQuery {
    #[serde(flatten)]
    pub page: dto::ListQuery,
    pub user_id: Option<String>,
    pub role: Option<UnitRole>,
    pub is_active: Option<bool>,
}

pub async fn add_member(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<AddUnitMember>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("members", "create")],
    )
    .await
    {
        return resp;
    }
    let unit_id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.unit_members.add(unit_id, input).await {
        Ok(member) => dto::data_response(StatusCode::CREATED, "member added", member),
        Err(e) => errors::error_response(e),
    }
}

pub async fn list_members(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Query(query): Query<MemberListQuery>,
) -> axum::response::Response {
    if let Err(resp) =
        require_any(&services, &ctx, &[Permission::from_parts("members", "read")]).await
    {
        return resp;
    }
    let unit_id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let user_id = match query.user_id.as_deref() {
        Some(raw) => match parse_id(raw) {
            Ok(id) => Some(id),
            Err(resp) => return resp,
        },
        None => None,
    };
    let filter = UnitMemberFilter {
        unit_id: Some(unit_id),
        user_id,
        role: query.role,
        is_active: query.is_active,
    };
    match services
        .unit_members
        .list(filter, query.page.page_params())
        .await
    {
        Ok(page) => dto::list_response("unit members", page),
        Err(e) => errors::error_response(e),
    }
}

pub async fn update_member(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, member_id)): Path<(String, String)>,
    Json(input): Json<UpdateUnitMember>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("members", "update")],
    )
    .await
    {
        return resp;
    }
    let unit_id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let member_id = match parse_id::<MemberId>(&member_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.unit_members.update(unit_id, member_id, input).await {
        Ok(member) => dto::data_response(StatusCode::OK, "member updated", member),
        Err(e) => errors::error_response(e),
    }
}

pub async fn remove_member(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, member_id)): Path<(String, String)>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("members", "delete")],
    )
    .await
    {
        return resp;
    }
    let unit_id = match parse_id::<UnitId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let member_id = match parse_id::<MemberId>(&member_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.unit_members.remove(unit_id, member_id).await {
        Ok(()) => dto::data_response(StatusCode::OK, "member removed", serde_json::Value::Null),
        Err(e) => errors::error_response(e),
    }
}
