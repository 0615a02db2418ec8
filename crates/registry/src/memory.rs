//! In-memory store for tests and dev mode.
//!
//! Enforces the same uniqueness and ordering contract as the Postgres store
//! so tests exercise real conflict paths. The lock is synchronous and never
//! held across an await.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use akademi_core::{
    AppError, AppResult, MemberId, OrgId, PageParams, Paginated, PermissionId, RoleId, UnitId,
    UserId,
};

use crate::model::{
    ApprovalStatus, OrgMemberRow, OrgMembershipSummary, Organization, OrganizationMember,
    PermissionRecord, Role, Unit, UnitMember, UnitMemberRow, UnitMembershipSummary, User,
};
use crate::store::{
    ApprovalStore, OrgMemberFilter, OrgMemberPatch, OrgMemberStore, OrgStore, OrganizationPatch,
    PermissionFilter, PermissionStore, RoleFilter, RolePatch, RoleStore, UnitMemberFilter,
    UnitMemberPatch, UnitMemberStore, UnitPatch, UnitStore, UserStore,
};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    approvals: HashMap<UserId, ApprovalStatus>,
    orgs: HashMap<OrgId, Organization>,
    units: HashMap<UnitId, Unit>,
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, PermissionRecord>,
    role_permissions: HashMap<RoleId, Vec<PermissionId>>,
    org_members: HashMap<MemberId, OrganizationMember>,
    unit_members: HashMap<MemberId, UnitMember>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an approval record, for exercising the login state machine.
    pub fn set_approval(&self, user_id: UserId, status: ApprovalStatus) {
        self.state.write().unwrap().approvals.insert(user_id, status);
    }

    /// Directly mutate a stored user (activate/deactivate, promote).
    pub fn with_user_mut(&self, id: UserId, f: impl FnOnce(&mut User)) {
        let mut state = self.state.write().unwrap();
        if let Some(user) = state.users.get_mut(&id) {
            f(user);
        }
    }
}

fn paginate<T>(mut items: Vec<T>, page: PageParams) -> Paginated<T> {
    let total = items.len() as u64;
    let start = (page.offset() as usize).min(items.len());
    let end = (start + page.limit as usize).min(items.len());
    let window = items.drain(start..end).collect();
    Paginated::new(window, page, total)
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().unwrap();
        Ok(state
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let state = self.state.read().unwrap();
        Ok(state.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state
            .users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email == user.email)
        {
            return Err(AppError::conflict("email already registered"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        match state.users.get_mut(&id) {
            Some(user) => {
                user.last_login_at = Some(at);
                user.updated_at = at;
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn approval_status(&self, user_id: UserId) -> AppResult<Option<ApprovalStatus>> {
        Ok(self.state.read().unwrap().approvals.get(&user_id).copied())
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn find(&self, id: RoleId) -> AppResult<Option<Role>> {
        let state = self.state.read().unwrap();
        Ok(state.roles.get(&id).filter(|r| r.deleted_at.is_none()).cloned())
    }

    async fn find_by_name(
        &self,
        name: &str,
        organization_id: Option<OrgId>,
    ) -> AppResult<Option<Role>> {
        let state = self.state.read().unwrap();
        Ok(state
            .roles
            .values()
            .find(|r| {
                r.deleted_at.is_none() && r.name == name && r.organization_id == organization_id
            })
            .cloned())
    }

    async fn list(&self, filter: &RoleFilter, page: PageParams) -> AppResult<Paginated<Role>> {
        let state = self.state.read().unwrap();
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| r.deleted_at.is_none())
            .filter(|r| {
                filter
                    .organization_id
                    .map_or(true, |org| r.organization_id == Some(org))
            })
            .filter(|r| filter.name.as_deref().map_or(true, |n| r.name == n))
            .filter(|r| filter.kind.map_or(true, |k| r.kind == k))
            .filter(|r| filter.is_global.map_or(true, |g| r.is_global() == g))
            .cloned()
            .collect();
        roles.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(paginate(roles, page))
    }

    async fn insert(&self, role: &Role) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state.roles.values().any(|r| {
            r.deleted_at.is_none()
                && r.name == role.name
                && r.organization_id == role.organization_id
        }) {
            return Err(AppError::conflict("role name already exists in organization"));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn update(&self, id: RoleId, patch: &RolePatch) -> AppResult<Role> {
        let mut state = self.state.write().unwrap();
        if let Some(name) = &patch.name {
            let org_id = state
                .roles
                .get(&id)
                .filter(|r| r.deleted_at.is_none())
                .ok_or(AppError::NotFound)?
                .organization_id;
            let taken = state.roles.values().any(|r| {
                r.id != id
                    && r.deleted_at.is_none()
                    && r.name == *name
                    && r.organization_id == org_id
            });
            if taken {
                return Err(AppError::conflict("role name already exists in organization"));
            }
        }
        let role = state
            .roles
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        if let Some(name) = &patch.name {
            role.name = name.clone();
        }
        if let Some(display_name) = &patch.display_name {
            role.display_name = display_name.clone();
        }
        if let Some(description) = &patch.description {
            role.description = description.clone();
        }
        if let Some(level) = patch.level {
            role.level = level;
        }
        if let Some(is_default) = patch.is_default {
            role.is_default = is_default;
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn soft_delete(&self, id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        let role = state
            .roles
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        role.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn find(&self, id: PermissionId) -> AppResult<Option<PermissionRecord>> {
        Ok(self.state.read().unwrap().permissions.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &PermissionFilter,
        page: PageParams,
    ) -> AppResult<Paginated<PermissionRecord>> {
        let state = self.state.read().unwrap();
        let mut perms: Vec<PermissionRecord> = state
            .permissions
            .values()
            .filter(|p| filter.name.as_deref().map_or(true, |n| p.name == n))
            .filter(|p| filter.resource.as_deref().map_or(true, |r| p.resource == r))
            .filter(|p| filter.action.as_deref().map_or(true, |a| p.action == a))
            .cloned()
            .collect();
        perms.sort_by(|a, b| a.resource.cmp(&b.resource).then_with(|| a.action.cmp(&b.action)));
        Ok(paginate(perms, page))
    }

    async fn insert(&self, permission: &PermissionRecord) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state.permissions.values().any(|p| p.name == permission.name) {
            return Err(AppError::conflict("permission already exists"));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn delete(&self, id: PermissionId) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state.permissions.remove(&id).is_none() {
            return Err(AppError::NotFound);
        }
        for linked in state.role_permissions.values_mut() {
            linked.retain(|pid| *pid != id);
        }
        Ok(())
    }

    async fn role_permissions(&self, role_id: RoleId) -> AppResult<Vec<PermissionRecord>> {
        let state = self.state.read().unwrap();
        let mut perms: Vec<PermissionRecord> = state
            .role_permissions
            .get(&role_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.permissions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        perms.sort_by(|a, b| a.resource.cmp(&b.resource).then_with(|| a.action.cmp(&b.action)));
        Ok(perms)
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        for id in permission_ids {
            if !state.permissions.contains_key(id) {
                return Err(AppError::NotFound);
            }
        }
        state.role_permissions.insert(role_id, permission_ids.to_vec());
        Ok(())
    }

    async fn clear_role_permissions(&self, role_id: RoleId) -> AppResult<()> {
        self.state.write().unwrap().role_permissions.remove(&role_id);
        Ok(())
    }

    async fn permission_names_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<String>> {
        let state = self.state.read().unwrap();
        let mut names = HashSet::new();
        for role_id in role_ids {
            if let Some(ids) = state.role_permissions.get(role_id) {
                for id in ids {
                    if let Some(perm) = state.permissions.get(id) {
                        names.insert(perm.name.clone());
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

#[async_trait]
impl OrgStore for InMemoryStore {
    async fn find(&self, id: OrgId) -> AppResult<Option<Organization>> {
        let state = self.state.read().unwrap();
        Ok(state.orgs.get(&id).filter(|o| o.deleted_at.is_none()).cloned())
    }

    async fn list(&self, page: PageParams) -> AppResult<Paginated<Organization>> {
        let state = self.state.read().unwrap();
        let mut orgs: Vec<Organization> = state
            .orgs
            .values()
            .filter(|o| o.deleted_at.is_none())
            .cloned()
            .collect();
        orgs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(orgs, page))
    }

    async fn insert(&self, org: &Organization) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state
            .orgs
            .values()
            .any(|o| o.deleted_at.is_none() && o.code == org.code)
        {
            return Err(AppError::conflict("organization code already exists"));
        }
        state.orgs.insert(org.id, org.clone());
        Ok(())
    }

    async fn update(&self, id: OrgId, patch: &OrganizationPatch) -> AppResult<Organization> {
        let mut state = self.state.write().unwrap();
        let org = state
            .orgs
            .get_mut(&id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        if let Some(name) = &patch.name {
            org.name = name.clone();
        }
        if let Some(description) = &patch.description {
            org.description = description.clone();
        }
        if let Some(is_active) = patch.is_active {
            org.is_active = is_active;
        }
        if let Some(settings) = &patch.settings {
            org.settings = settings.clone();
        }
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn soft_delete(&self, id: OrgId) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        let org = state
            .orgs
            .get_mut(&id)
            .filter(|o| o.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        org.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl UnitStore for InMemoryStore {
    async fn find(&self, id: UnitId) -> AppResult<Option<Unit>> {
        let state = self.state.read().unwrap();
        Ok(state.units.get(&id).filter(|u| u.deleted_at.is_none()).cloned())
    }

    async fn list(
        &self,
        organization_id: Option<OrgId>,
        page: PageParams,
    ) -> AppResult<Paginated<Unit>> {
        let state = self.state.read().unwrap();
        let mut units: Vec<Unit> = state
            .units
            .values()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| organization_id.map_or(true, |org| u.organization_id == org))
            .cloned()
            .collect();
        units.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(units, page))
    }

    async fn insert(&self, unit: &Unit) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state
            .units
            .values()
            .any(|u| u.deleted_at.is_none() && u.code == unit.code)
        {
            return Err(AppError::conflict("unit code already exists"));
        }
        state.units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn update(&self, id: UnitId, patch: &UnitPatch) -> AppResult<Unit> {
        let mut state = self.state.write().unwrap();
        let unit = state
            .units
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        if let Some(name) = &patch.name {
            unit.name = name.clone();
        }
        if let Some(kind) = &patch.kind {
            unit.kind = kind.clone();
        }
        if let Some(is_active) = patch.is_active {
            unit.is_active = is_active;
        }
        if let Some(settings) = &patch.settings {
            unit.settings = settings.clone();
        }
        unit.updated_at = Utc::now();
        Ok(unit.clone())
    }

    async fn soft_delete(&self, id: UnitId) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        let unit = state
            .units
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        unit.deleted_at = Some(Utc::now());
        Ok(())
    }
}

impl InMemoryStore {
    fn org_member_row(&self, state: &State, member: &OrganizationMember) -> OrgMemberRow {
        let (user_name, user_email) = state
            .users
            .get(&member.user_id)
            .map(|u| (u.full_name.clone(), u.email.clone()))
            .unwrap_or_default();
        let (org_name, org_code) = state
            .orgs
            .get(&member.organization_id)
            .map(|o| (o.name.clone(), o.code.clone()))
            .unwrap_or_default();
        let role_name = state
            .roles
            .get(&member.role_id)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        OrgMemberRow {
            member: member.clone(),
            user_name,
            user_email,
            org_name,
            org_code,
            role_name,
        }
    }

    fn unit_member_row(&self, state: &State, member: &UnitMember) -> UnitMemberRow {
        let (user_name, user_email) = state
            .users
            .get(&member.user_id)
            .map(|u| (u.full_name.clone(), u.email.clone()))
            .unwrap_or_default();
        let (unit_name, unit_code) = state
            .units
            .get(&member.unit_id)
            .map(|u| (u.name.clone(), u.code.clone()))
            .unwrap_or_default();
        UnitMemberRow {
            member: member.clone(),
            user_name,
            user_email,
            unit_name,
            unit_code,
        }
    }
}

#[async_trait]
impl OrgMemberStore for InMemoryStore {
    async fn find(&self, id: MemberId) -> AppResult<Option<OrganizationMember>> {
        let state = self.state.read().unwrap();
        Ok(state
            .org_members
            .get(&id)
            .filter(|m| m.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_user_and_org(
        &self,
        user_id: UserId,
        organization_id: OrgId,
    ) -> AppResult<Option<OrganizationMember>> {
        let state = self.state.read().unwrap();
        Ok(state
            .org_members
            .values()
            .find(|m| {
                m.deleted_at.is_none()
                    && m.user_id == user_id
                    && m.organization_id == organization_id
            })
            .cloned())
    }

    async fn list(
        &self,
        filter: &OrgMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<OrgMemberRow>> {
        let state = self.state.read().unwrap();
        let mut members: Vec<OrganizationMember> = state
            .org_members
            .values()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| {
                filter
                    .organization_id
                    .map_or(true, |org| m.organization_id == org)
            })
            .filter(|m| filter.user_id.map_or(true, |u| m.user_id == u))
            .filter(|m| filter.role_id.map_or(true, |r| m.role_id == r))
            .filter(|m| filter.is_active.map_or(true, |a| m.is_active == a))
            .cloned()
            .collect();
        members.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        let rows: Vec<OrgMemberRow> = members
            .iter()
            .map(|m| self.org_member_row(&state, m))
            .collect();
        Ok(paginate(rows, page))
    }

    async fn insert(&self, member: &OrganizationMember) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state.org_members.values().any(|m| {
            m.deleted_at.is_none()
                && m.user_id == member.user_id
                && m.organization_id == member.organization_id
        }) {
            return Err(AppError::conflict("user is already a member"));
        }
        state.org_members.insert(member.id, member.clone());
        Ok(())
    }

    async fn update(&self, id: MemberId, patch: &OrgMemberPatch) -> AppResult<OrganizationMember> {
        let mut state = self.state.write().unwrap();
        let member = state
            .org_members
            .get_mut(&id)
            .filter(|m| m.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        if let Some(role_id) = patch.role_id {
            member.role_id = role_id;
        }
        if let Some(is_active) = patch.is_active {
            member.is_active = is_active;
        }
        member.updated_at = Utc::now();
        Ok(member.clone())
    }

    async fn soft_delete(&self, id: MemberId) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        let member = state
            .org_members
            .get_mut(&id)
            .filter(|m| m.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        member.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn memberships_for_user(&self, user_id: UserId) -> AppResult<Vec<OrgMembershipSummary>> {
        let state = self.state.read().unwrap();
        let mut summaries: Vec<OrgMembershipSummary> = state
            .org_members
            .values()
            .filter(|m| m.deleted_at.is_none() && m.user_id == user_id)
            .map(|m| OrgMembershipSummary {
                org_id: m.organization_id,
                org_name: state
                    .orgs
                    .get(&m.organization_id)
                    .map(|o| o.name.clone())
                    .unwrap_or_default(),
                role_id: m.role_id,
                role_name: state
                    .roles
                    .get(&m.role_id)
                    .map(|r| r.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        summaries.sort_by(|a, b| a.org_name.cmp(&b.org_name));
        Ok(summaries)
    }

    async fn active_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        let state = self.state.read().unwrap();
        Ok(state
            .org_members
            .values()
            .filter(|m| m.deleted_at.is_none() && m.is_active && m.user_id == user_id)
            .map(|m| m.role_id)
            .collect())
    }
}

#[async_trait]
impl UnitMemberStore for InMemoryStore {
    async fn find(&self, id: MemberId) -> AppResult<Option<UnitMember>> {
        let state = self.state.read().unwrap();
        Ok(state
            .unit_members
            .get(&id)
            .filter(|m| m.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_user_and_unit(
        &self,
        user_id: UserId,
        unit_id: UnitId,
    ) -> AppResult<Option<UnitMember>> {
        let state = self.state.read().unwrap();
        Ok(state
            .unit_members
            .values()
            .find(|m| m.deleted_at.is_none() && m.user_id == user_id && m.unit_id == unit_id)
            .cloned())
    }

    async fn list(
        &self,
        filter: &UnitMemberFilter,
        page: PageParams,
    ) -> AppResult<Paginated<UnitMemberRow>> {
        let state = self.state.read().unwrap();
        let mut members: Vec<UnitMember> = state
            .unit_members
            .values()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| filter.unit_id.map_or(true, |u| m.unit_id == u))
            .filter(|m| filter.user_id.map_or(true, |u| m.user_id == u))
            .filter(|m| filter.role.map_or(true, |r| m.role == r))
            .filter(|m| filter.is_active.map_or(true, |a| m.is_active == a))
            .cloned()
            .collect();
        members.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        let rows: Vec<UnitMemberRow> = members
            .iter()
            .map(|m| self.unit_member_row(&state, m))
            .collect();
        Ok(paginate(rows, page))
    }

    async fn insert(&self, member: &UnitMember) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        if state.unit_members.values().any(|m| {
            m.deleted_at.is_none() && m.user_id == member.user_id && m.unit_id == member.unit_id
        }) {
            return Err(AppError::conflict("user is already a member"));
        }
        state.unit_members.insert(member.id, member.clone());
        Ok(())
    }

    async fn update(&self, id: MemberId, patch: &UnitMemberPatch) -> AppResult<UnitMember> {
        let mut state = self.state.write().unwrap();
        let member = state
            .unit_members
            .get_mut(&id)
            .filter(|m| m.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        if let Some(role) = patch.role {
            member.role = role;
        }
        if let Some(is_active) = patch.is_active {
            member.is_active = is_active;
        }
        member.updated_at = Utc::now();
        Ok(member.clone())
    }

    async fn soft_delete(&self, id: MemberId) -> AppResult<()> {
        let mut state = self.state.write().unwrap();
        let member = state
            .unit_members
            .get_mut(&id)
            .filter(|m| m.deleted_at.is_none())
            .ok_or(AppError::NotFound)?;
        member.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn active_memberships_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UnitMembershipSummary>> {
        let state = self.state.read().unwrap();
        let mut summaries: Vec<UnitMembershipSummary> = state
            .unit_members
            .values()
            .filter(|m| m.deleted_at.is_none() && m.is_active && m.user_id == user_id)
            .map(|m| {
                let unit = state.units.get(&m.unit_id);
                let org = unit.and_then(|u| state.orgs.get(&u.organization_id));
                UnitMembershipSummary {
                    member_id: m.id,
                    unit_id: m.unit_id,
                    unit_name: unit.map(|u| u.name.clone()).unwrap_or_default(),
                    org_id: unit
                        .map(|u| u.organization_id)
                        .unwrap_or_else(|| OrgId::from_uuid(uuid::Uuid::nil())),
                    org_name: org.map(|o| o.name.clone()).unwrap_or_default(),
                    role: m.role,
                    is_active: m.is_active,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.unit_name.cmp(&b.unit_name));
        Ok(summaries)
    }
}
