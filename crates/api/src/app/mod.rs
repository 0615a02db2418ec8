//! HTTP application wiring (axum router + service construction).
//!
//! Layout:
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: list query parsing and the response envelopes
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use akademi_auth::{PermissionPolicy, TokenIssuer};
use akademi_registry::store::{
    ApprovalStore, OrgMemberStore, OrgStore, PermissionStore, RoleStore, UnitMemberStore,
    UnitStore, UserStore,
};
use akademi_registry::{
    InMemoryStore, MembershipDirectory, OrgMemberService, PermissionService, RoleService,
    SessionService, StorePermissionChecker, TenantService, UnitMemberService,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// All services the handlers use, wired over one store.
#[derive(Clone)]
pub struct AppServices {
    pub session: SessionService,
    pub roles: RoleService,
    pub permissions: PermissionService,
    pub tenants: TenantService,
    pub org_members: OrgMemberService,
    pub unit_members: UnitMemberService,
    pub directory: MembershipDirectory,
    pub policy: PermissionPolicy,
    tokens: Arc<TokenIssuer>,
}

impl AppServices {
    /// Wire every service over a single store implementation.
    pub fn from_store<S>(store: Arc<S>, tokens: Arc<TokenIssuer>, policy: PermissionPolicy) -> Self
    where
        S: UserStore
            + ApprovalStore
            + RoleStore
            + PermissionStore
            + OrgStore
            + UnitStore
            + OrgMemberStore
            + UnitMemberStore
            + 'static,
    {
        Self {
            session: SessionService::new(store.clone(), store.clone(), tokens.clone()),
            roles: RoleService::new(store.clone(), store.clone()),
            permissions: PermissionService::new(store.clone()),
            tenants: TenantService::new(store.clone(), store.clone()),
            org_members: OrgMemberService::new(store.clone()),
            unit_members: UnitMemberService::new(store.clone()),
            directory: MembershipDirectory::new(store.clone(), store.clone(), store.clone()),
            policy,
            tokens,
        }
    }

    /// Dev/test wiring: in-memory store, no permission backend configured
    /// (the named `AllowAll` fail-open mode).
    pub fn in_memory(jwt_secret: &str) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(TokenIssuer::new(jwt_secret.as_bytes()));
        Self::from_store(store, tokens, PermissionPolicy::AllowAll)
    }

    /// Production wiring: Postgres store with the store-backed checker.
    pub fn postgres(store: akademi_infra::PostgresStore, jwt_secret: &str) -> Self {
        let store = Arc::new(store);
        let tokens = Arc::new(TokenIssuer::new(jwt_secret.as_bytes()));
        let checker = StorePermissionChecker::new(store.clone(), store.clone(), store.clone());
        Self::from_store(store, tokens, PermissionPolicy::Checker(Arc::new(checker)))
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: AppServices) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens.clone(),
    };
    let services = Arc::new(services);

    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router().layer(Extension(services)))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
