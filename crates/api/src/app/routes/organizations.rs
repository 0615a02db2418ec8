//! Organization CRUD plus the organization membership sub-resource.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use akademi_auth::Permission;
use akademi_core::{MemberId, OrgId};
use akademi_registry::members::{AddOrgMember, UpdateOrgMember};
use akademi_registry::store::OrgMemberFilter;
use akademi_registry::tenants::{CreateOrganization, UpdateOrganization};

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

pub async fn create(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateOrganization>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("organizations", "create")],
    )
    .await
    {
        return resp;
    }
    match services.tenants.create_org(input).await {
        Ok(org) => dto::data_response(StatusCode::CREATED, "organization created", org),
        Err(e) => errors::error_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("organizations", "read")],
    )
    .await
    {
        return resp;
    }
    match services.tenants.list_orgs(query.page_params()).await {
        Ok(page) => dto::list_response("organizations", page),
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
        &[Permission::from_parts("organizations", "read")],
    )
    .await
    {
        return resp;
    }
    let id = match parse_id::<OrgId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.get_org(id).await {
        Ok(org) => dto::data_response(StatusCode::OK, "organization", org),
        Err(e) => errors::error_response(e),
    }
}

pub async fn update(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<UpdateOrganization>,
) -> axum::response::Response {
    if let Err(resp) = require_any(
        &services,
        &ctx,
        &[Permission::from_parts("organizations", "update")],
    )
    .await
    {
        return resp;
    }
    let id = match parse_id::<OrgId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.update_org(id, input).await {
        Ok(org) => dto::data_response(StatusCode::OK, "organization updated", org),
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
        &[Permission::from_parts("organizations", "delete")],
    )
    .await
    {
        return resp;
    }
    let id = match parse_id::<OrgId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.tenants.delete_org(id).await {
        Ok(()) => {
            dto::data_response(StatusCode::OK, "organization deleted", serde_json::Value::Null)
        }
        Err(e) => errors::error_response(e),
    }
}

// ─── membership sub-resource ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct MemberListQuery {
    #[serde(flatten)]
    pub page: dto::ListQuery,
    pub user_id: Option<String>,
    pub role_id: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn add_member(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(input): Json<AddOrgMember>,
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
    let org_id = match parse_id::<OrgId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.org_members.add(org_id, input).await {
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
    let org_id = match parse_id::<OrgId>(&id) {
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
    let role_id = match query.role_id.as_deref() {
        Some(raw) => match parse_id(raw) {
            Ok(id) => Some(id),
            Err(resp) => return resp,
        },
        None => None,
    };
    let filter = OrgMemberFilter {
        organization_id: Some(org_id),
        user_id,
        role_id,
        is_active: query.is_active,
    };
    match services
        .org_members
        .list(filter, query.page.page_params())
        .await
    {
        Ok(page) => dto::list_response("organization members", page),
        Err(e) => errors::error_response(e),
    }
}

pub async fn update_member(
    Extension(services): Extension<Services>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, member_id)): Path<(String, String)>,
    Json(input): Json<UpdateOrgMember>,
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
    let org_id = match parse_id::<OrgId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let member_id = match parse_id::<MemberId>(&member_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.org_members.update(org_id, member_id, input).await {
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
    let org_id = match parse_id::<OrgId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let member_id = match parse_id::<MemberId>(&member_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.org_members.remove(org_id, member_id).await {
        Ok(()) => dto::data_response(StatusCode::OK, "member removed", serde_json::Value::Null),
        Err(e) => errors::error_response(e),
    }
}
