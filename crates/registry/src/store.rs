//! Storage seams for the authorization & membership core.
//!
//! Every trait here is implemented twice: by [`crate::memory::InMemoryStore`]
//! for tests and dev mode, and by the Postgres store in `akademi-infra`.
//!
//! Uniqueness is the store's contract, not the caller's: `insert` methods
//! return `AppError::Conflict` when a unique constraint is violated (email,
//! tenant code, `(name, organization_id)` for roles, permission name, and the
//! live membership pairs). Services may pre-check for friendlier messages but
//! the store answer is authoritative under concurrency.
//!
//! Soft deletion: `soft_delete` sets the `deleted_at` tombstone, and every
//! read filters tombstoned rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use akademi_core::{
    AppResult, MemberId, OrgId, PageParams, Paginated, PermissionId, RoleId, UnitId, UserId,
};

use crate::model::{
    ApprovalStatus, OrgMemberRow, OrgMembershipSummary, Organization, OrganizationMember,
    PermissionRecord, Role, RoleKind, Unit, UnitMember, UnitMemberRow, UnitMembershipSummary,
    UnitRole, User,
};

// ─────────────────────────────────────────────────────────────────────────────
// Filters
// ─────────────────────────────────────────────────────────────────────────────

/// Role listing filter. All fields conjunctive; `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct RoleFilter {
    pub organization_id: Option<OrgId>,
    pub name: Option<String>,
    pub kind: Option<RoleKind>,
    /// `Some(true)` restricts to global roles, `Some(false)` to tenant roles.
    pub is_global: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub name: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrgMemberFilter {
    pub organization_id: Option<OrgId>,
    pub user_id: Option<UserId>,
    pub role_id: Option<RoleId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UnitMemberFilter {
    pub unit_id: Option<UnitId>,
    pub user_id: Option<UserId>,
    pub role: Option<UnitRole>,
    pub is_active: Option<bool>,
}

/// Field patch for role updates. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RolePatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub level: Option<i32>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct OrgMemberPatch {
    pub role_id: Option<RoleId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UnitMemberPatch {
    pub role: Option<UnitRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stores
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;
    /// Conflict on duplicate email.
    async fn insert(&self, user: &User) -> AppResult<()>;
    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()>;
}

/// External approval workflow lookup. `None` means no record exists and the
/// login proceeds.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn approval_status(&self, user_id: UserId) -> AppResult<Option<ApprovalStatus>>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find(&self, id: RoleId) -> AppResult<Option<Role>>;
    async fn find_by_name(&self, name: &str, organization_id: Option<OrgId>)
        -> AppResult<Option<Role>>;
    /// Ordered by `level` descending, then `created_at` descending.
    async fn list(&self, filter: &RoleFilter, page: PageParams) -> AppResult<Paginated<Role>>;
    /// Conflict on duplicate `(name, organization_id)`.
    async fn insert(&self, role: &Role) -> AppResult<()>;
    async fn update(&self, id: RoleId, patch: &RolePatch) -> AppResult<Role>;
    async fn soft_delete(&self, id: RoleId) -> AppResult<()>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn find(&self, id: PermissionId) -> AppResult<Option<PermissionRecord>>;
    /// Ordered by `resource` ascending, then `action` ascending.
    async fn list(
        &self,
        filter: &PermissionFilter,
        page: PageParams,
    ) -> AppResult<Paginated<PermissionRecord>>;
    /// Conflict on duplicate name.
    async fn insert(&self, permission: &PermissionRecord) -> AppResult<()>;
    async fn delete(&self, id: PermissionId) -> AppResult<()>;

    /// The permission set currently linked to `role_id`, resource/action order.
    async fn role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionRecord>>;
    /// Atomically replace the role's permission set. An empty slice clears it.
    /// Unknown permission ids fail the whole replacement with NotFound.
    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()>;
    /// Drop every role↔permission link involving `role_id`.
    async fn clear_role_permissions(&self, role_id: RoleId) -> AppResult<()>;
    /// Permission names granted to any of `role_ids`, deduplicated.
    async fn permission_names_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<String>>;
}

#[async_trait]
pub trait OrgStore: Send + Sync {
    async fn find(&self, id: OrgId) -> AppResult<Option<Organization>>;
    async fn list(&self, page: PageParams) -> AppResult<Paginated<Organization>>;
    /// Conflict on duplicate code.
    async fn insert(&self, org: &Organization) -> AppResult<()>;
    async fn update(&self, id: OrgId, patch: &OrganizationPatch) -> AppResult<Organization>;
    async fn soft_delete(&self, id: OrgId) -> AppResult<()>;
}

#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn find(&self, id: UnitId) -> AppResult<Option<Unit>>;
    async fn list(&self, organization_id: Option<OrgId>, page: PageParams)
        -> AppResult<Paginated<Unit>>;
    /// Conflict on duplicate code.
    async fn insert(&self, unit: &Unit) -> AppResult<()>;
    async fn update(&self, id: UnitId, patch: &UnitPatch) -> AppResult<Unit>;
    async fn soft_delete(&self, id: UnitId) -> AppResult<()>;
}

#[async_trait]
pub trait OrgMemberStore: Send + Sync {
    async fn find(&self, id: MemberId) -> AppResult<Option<OrganizationMember>>;
    async fn find_by_user_and_org(
        &self,
        user_id: UserId,
        organization_id: OrgId,
    ) -> AppResult<Option<OrganizationMember>>;
    /// Joined rows, newest membership first.
    async fn list(
        &self,
        filter: &OrgMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<OrgMemberRow>>;
    /// Conflict on a live `(user, organization)` pair.
    async fn insert(&self, member: &OrganizationMember) -> AppResult<()>;
    async fn update(&self, id: MemberId, patch: &OrgMemberPatch) -> AppResult<OrganizationMember>;
    async fn soft_delete(&self, id: MemberId) -> AppResult<()>;

    /// All live org memberships of a user, active or not.
    async fn memberships_for_user(&self, user_id: UserId)
        -> AppResult<Vec<OrgMembershipSummary>>;
    /// Role ids from the user's *active* org memberships.
    async fn active_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>>;
}

#[async_trait]
pub trait UnitMemberStore: Send + Sync {
    async fn find(&self, id: MemberId) -> AppResult<Option<UnitMember>>;
    async fn find_by_user_and_unit(
        &self,
        user_id: UserId,
        unit_id: UnitId,
    ) -> AppResult<Option<UnitMember>>;
    async fn list(
        &self,
        filter: &UnitMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<UnitMemberRow>>;
    /// Conflict on a live `(user, unit)` pair.
    async fn insert(&self, member: &UnitMember) -> AppResult<()>;
    async fn update(&self, id: MemberId, patch: &UnitMemberPatch) -> AppResult<UnitMember>;
    async fn soft_delete(&self, id: MemberId) -> AppResult<()>;

    /// Active-only unit memberships of a user.
    async fn active_memberships_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UnitMembershipSummary>>;
}
