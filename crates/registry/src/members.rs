//! Membership registry: organization members, unit members, and the
//! per-user membership directory.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use akademi_core::{AppError, AppResult, MemberId, OrgId, PageParams, Paginated, RoleId, UnitId, UserId};

use crate::model::{
    OrgMemberRow, OrganizationMember, UnitMember, UnitMemberRow, UnitRole, UserMemberships,
};
use crate::store::{
    OrgMemberFilter, OrgMemberPatch, OrgMemberStore, UnitMemberFilter, UnitMemberPatch,
    UnitMemberStore, UserStore,
};

#[derive(Debug, Clone, Deserialize)]
pub struct AddOrgMember {
    pub user_id: UserId,
    pub role_id: RoleId,
    #[serde(default)]
    pub invited_by: Option<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrgMember {
    pub role_id: Option<RoleId>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddUnitMember {
    pub user_id: UserId,
    /// Defaults to [`UnitRole::Staff`] when omitted.
    #[serde(default)]
    pub role: Option<UnitRole>,
    #[serde(default)]
    pub invited_by: Option<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUnitMember {
    pub role: Option<UnitRole>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct OrgMemberService {
    members: Arc<dyn OrgMemberStore>,
}

impl OrgMemberService {
    pub fn new(members: Arc<dyn OrgMemberStore>) -> Self {
        Self { members }
    }

    /// Enroll a user. New memberships start active with `joined_at = now`.
    pub async fn add(&self, organization_id: OrgId, input: AddOrgMember) -> AppResult<OrganizationMember> {
        if self
            .members
            .find_by_user_and_org(input.user_id, organization_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("user is already a member"));
        }

        let member = OrganizationMember::new(
            organization_id,
            input.user_id,
            input.role_id,
            input.invited_by,
        );
        self.members.insert(&member).await?;
        info!(member_id = %member.id, org_id = %organization_id, "organization member added");
        Ok(member)
    }

    /// Look up a membership within one organization. A membership row that
    /// belongs to a different organization reads as NotFound.
    pub async fn get(&self, organization_id: OrgId, id: MemberId) -> AppResult<OrganizationMember> {
        self.members
            .find(id)
            .await?
            .filter(|m| m.organization_id == organization_id)
            .ok_or(AppError::NotFound)
    }

    pub async fn list(
        &self,
        filter: OrgMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<OrgMemberRow>> {
        self.members.list(&filter, page).await
    }

    pub async fn update(
        &self,
        organization_id: OrgId,
        id: MemberId,
        input: UpdateOrgMember,
    ) -> AppResult<OrganizationMember> {
        // Scoped lookup first so a vanished or foreign membership reads as
        // NotFound, not as a silent no-op update.
        self.get(organization_id, id).await?;
        let patch = OrgMemberPatch {
            role_id: input.role_id,
            is_active: input.is_active,
        };
        self.members.update(id, &patch).await
    }

    /// Soft-remove. The tombstoned pair no longer blocks re-adding the user.
    pub async fn remove(&self, organization_id: OrgId, id: MemberId) -> AppResult<()> {
        self.get(organization_id, id).await?;
        self.members.soft_delete(id).await?;
        info!(member_id = %id, org_id = %organization_id, "organization member removed");
        Ok(())
    }
}

#[derive(Clone)]
pub struct UnitMemberService {
    members: Arc<dyn UnitMemberStore>,
}

impl UnitMemberService {
    pub fn new(members: Arc<dyn UnitMemberStore>) -> Self {
        Self { members }
    }

    pub async fn add(&self, unit_id: UnitId, input: AddUnitMember) -> AppResult<UnitMember> {
        if self
            .members
            .find_by_user_and_unit(input.user_id, unit_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("user is already a member"));
        }

        let role = input.role.unwrap_or(UnitRole::Staff);
        let member = UnitMember::new(unit_id, input.user_id, role, input.invited_by);
        self.members.insert(&member).await?;
        info!(member_id = %member.id, unit_id = %unit_id, role = %role, "unit member added");
        Ok(member)
    }

    pub async fn get(&self, unit_id: UnitId, id: MemberId) -> AppResult<UnitMember> {
        self.members
            .find(id)
            .await?
            .filter(|m| m.unit_id == unit_id)
            .ok_or(AppError::NotFound)
    }

    pub async fn list(
        &self,
        filter: UnitMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<UnitMemberRow>> {
        self.members.list(&filter, page).await
    }

    pub async fn update(
        &self,
        unit_id: UnitId,
        id: MemberId,
        input: UpdateUnitMember,
    ) -> AppResult<UnitMember> {
        self.get(unit_id, id).await?;
        let patch = UnitMemberPatch {
            role: input.role,
            is_active: input.is_active,
        };
        self.members.update(id, &patch).await
    }

    pub async fn remove(&self, unit_id: UnitId, id: MemberId) -> AppResult<()> {
        self.get(unit_id, id).await?;
        self.members.soft_delete(id).await?;
        info!(member_id = %id, unit_id = %unit_id, "unit member removed");
        Ok(())
    }
}

/// Aggregated "where can this user act" view.
#[derive(Clone)]
pub struct MembershipDirectory {
    users: Arc<dyn UserStore>,
    org_members: Arc<dyn OrgMemberStore>,
    unit_members: Arc<dyn UnitMemberStore>,
}

impl MembershipDirectory {
    pub fn new(
        users: Arc<dyn UserStore>,
        org_members: Arc<dyn OrgMemberStore>,
        unit_members: Arc<dyn UnitMemberStore>,
    ) -> Self {
        Self {
            users,
            org_members,
            unit_members,
        }
    }

    /// All organization memberships (active or not) plus active-only unit
    /// memberships, with the super-admin flag alongside.
    pub async fn user_memberships(&self, user_id: UserId) -> AppResult<UserMemberships> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let organization_memberships = self.org_members.memberships_for_user(user_id).await?;
        let unit_memberships = self.unit_members.active_memberships_for_user(user_id).await?;
        Ok(UserMemberships {
            user_id,
            is_super_admin: user.is_super_admin,
            organization_memberships,
            unit_memberships,
        })
    }
}
