//! Records of the authorization & membership core.
//!
//! # Invariants
//! - A role with `organization_id == None` is global; `kind == System` roles
//!   are permanently immutable (no update, no delete).
//! - A permission's `name` is always `"{resource}.{action}"` and unique.
//! - At most one live membership per `(user, organization)` and per
//!   `(user, unit)` pair.
//! - Soft deletion is the explicit `deleted_at` tombstone; every query is
//!   required to filter it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use akademi_core::{AppError, MemberId, OrgId, PermissionId, RoleId, UnitId, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// User (owned by the user directory; referenced, not owned, by this core)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_super_admin: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(email: String, password_hash: String, full_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            password_hash,
            full_name,
            phone: None,
            is_super_admin: false,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Approval state of a user's registration, sourced from an external
/// approval workflow. Absence of a record means "proceed".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenants
// ─────────────────────────────────────────────────────────────────────────────

/// Tenant root: a foundation/organization with a unique code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub owner_id: UserId,
    pub name: String,
    pub code: String,
    pub description: String,
    pub is_active: bool,
    pub settings: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Sub-tenant (a school) under exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub organization_id: OrgId,
    pub name: String,
    pub code: String,
    /// Type tag (e.g. elementary, high school, madrasah).
    pub kind: String,
    pub is_active: bool,
    pub settings: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles & permissions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Tenant-independent, immutable.
    System,
    /// Organization-scoped, mutable.
    Custom,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "system" => Ok(Self::System),
            "custom" => Ok(Self::Custom),
            other => Err(AppError::validation(format!("unknown role kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// `None` ⇔ the role is global (tenant-independent).
    pub organization_id: Option<OrgId>,
    pub name: String,
    pub display_name: String,
    pub kind: RoleKind,
    /// Ordering hint for privilege comparison. Decorative metadata: it sorts
    /// role listings and gates nothing.
    pub level: i32,
    pub description: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn is_global(&self) -> bool {
        self.organization_id.is_none()
    }

    pub fn is_system(&self) -> bool {
        self.kind == RoleKind::System
    }
}

/// Immutable-after-creation `(resource, action)` capability record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    /// Always `"{resource}.{action}"`; unique.
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PermissionRecord {
    pub fn new(resource: String, action: String, description: String) -> Self {
        let name = format!("{resource}.{action}");
        Self {
            id: PermissionId::new(),
            resource,
            action,
            name,
            description,
            created_at: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memberships
// ─────────────────────────────────────────────────────────────────────────────

/// Membership in an organization, carrying a Role Store reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: MemberId,
    pub user_id: UserId,
    pub organization_id: OrgId,
    pub role_id: RoleId,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub invited_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl OrganizationMember {
    pub fn new(
        organization_id: OrgId,
        user_id: UserId,
        role_id: RoleId,
        invited_by: Option<UserId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MemberId::new(),
            user_id,
            organization_id,
            role_id,
            is_active: true,
            joined_at: now,
            invited_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Unit-level roles are a closed enum: unit authorization is coarser-grained
/// than organization-level, which draws from the Role Store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitRole {
    Owner,
    Admin,
    Pengurus,
    Staff,
    Parent,
    Anggota,
}

impl UnitRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Pengurus => "pengurus",
            Self::Staff => "staff",
            Self::Parent => "parent",
            Self::Anggota => "anggota",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "pengurus" => Ok(Self::Pengurus),
            "staff" => Ok(Self::Staff),
            "parent" => Ok(Self::Parent),
            "anggota" => Ok(Self::Anggota),
            other => Err(AppError::validation(format!("unknown unit role '{other}'"))),
        }
    }
}

impl core::fmt::Display for UnitRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership in a unit, with the closed-enum role (default `Staff`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMember {
    pub id: MemberId,
    pub user_id: UserId,
    pub unit_id: UnitId,
    pub role: UnitRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub invited_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UnitMember {
    pub fn new(unit_id: UnitId, user_id: UserId, role: UnitRole, invited_by: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id: MemberId::new(),
            user_id,
            unit_id,
            role,
            is_active: true,
            joined_at: now,
            invited_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Read models
// ─────────────────────────────────────────────────────────────────────────────

/// Which tenant a membership binds to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum TenantRef {
    Organization(OrgId),
    Unit(UnitId),
}

impl TenantRef {
    pub fn as_uuid(&self) -> &Uuid {
        match self {
            Self::Organization(id) => id.as_uuid(),
            Self::Unit(id) => id.as_uuid(),
        }
    }
}

/// Common capability surface over the two membership kinds.
///
/// The two models stay structurally distinct (Role-Store-backed vs closed
/// enum); this trait is the shared seam callers authorize against.
pub trait Membership {
    fn tenant(&self) -> TenantRef;
    fn user_id(&self) -> UserId;
    fn is_active(&self) -> bool;
    fn effective_role_name(&self) -> &str;
}

/// Organization membership denormalized with user/tenant/role display info.
/// Read-time join output, never stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMemberRow {
    #[serde(flatten)]
    pub member: OrganizationMember,
    pub user_name: String,
    pub user_email: String,
    pub org_name: String,
    pub org_code: String,
    pub role_name: String,
}

impl Membership for OrgMemberRow {
    fn tenant(&self) -> TenantRef {
        TenantRef::Organization(self.member.organization_id)
    }

    fn user_id(&self) -> UserId {
        self.member.user_id
    }

    fn is_active(&self) -> bool {
        self.member.is_active
    }

    fn effective_role_name(&self) -> &str {
        &self.role_name
    }
}

/// Unit membership denormalized with user/tenant display info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMemberRow {
    #[serde(flatten)]
    pub member: UnitMember,
    pub user_name: String,
    pub user_email: String,
    pub unit_name: String,
    pub unit_code: String,
}

impl Membership for UnitMemberRow {
    fn tenant(&self) -> TenantRef {
        TenantRef::Unit(self.member.unit_id)
    }

    fn user_id(&self) -> UserId {
        self.member.user_id
    }

    fn is_active(&self) -> bool {
        self.member.is_active
    }

    fn effective_role_name(&self) -> &str {
        self.member.role.as_str()
    }
}

/// One entry of the "which tenants can I act in" aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembershipSummary {
    pub org_id: OrgId,
    pub org_name: String,
    pub role_id: RoleId,
    pub role_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMembershipSummary {
    pub member_id: MemberId,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub org_id: OrgId,
    pub org_name: String,
    pub role: UnitRole,
    pub is_active: bool,
}

/// Aggregate read model for `GET /users/me/memberships`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMemberships {
    pub user_id: UserId,
    pub is_super_admin: bool,
    pub organization_memberships: Vec<OrgMembershipSummary>,
    pub unit_memberships: Vec<UnitMembershipSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acting_role(m: &dyn Membership) -> Option<(TenantRef, String)> {
        if !m.is_active() {
            return None;
        }
        Some((m.tenant(), m.effective_role_name().to_string()))
    }

    #[test]
    fn both_membership_kinds_share_one_capability_surface() {
        let user_id = UserId::new();
        let org_id = OrgId::new();
        let unit_id = UnitId::new();

        let org_row = OrgMemberRow {
            member: OrganizationMember::new(org_id, user_id, RoleId::new(), None),
            user_name: "Guru Satu".into(),
            user_email: "guru@sekolah.test".into(),
            org_name: "Yayasan Satu".into(),
            org_code: "YS-01".into(),
            role_name: "admin".into(),
        };
        let unit_row = UnitMemberRow {
            member: UnitMember::new(unit_id, user_id, UnitRole::Pengurus, None),
            user_name: "Guru Satu".into(),
            user_email: "guru@sekolah.test".into(),
            unit_name: "MI Al-Falah".into(),
            unit_code: "MI-01".into(),
        };

        // The org role name comes from the role catalog, the unit one from
        // the closed enum; callers see the same surface for both.
        let (tenant, role) = acting_role(&org_row).unwrap();
        assert_eq!(tenant, TenantRef::Organization(org_id));
        assert_eq!(role, "admin");
        assert_eq!(org_row.user_id(), user_id);

        let (tenant, role) = acting_role(&unit_row).unwrap();
        assert_eq!(tenant, TenantRef::Unit(unit_id));
        assert_eq!(role, "pengurus");
        assert_eq!(unit_row.user_id(), user_id);

        let mut inactive = unit_row.clone();
        inactive.member.is_active = false;
        assert!(acting_role(&inactive).is_none());
    }
}
