//! Store-backed implementation of the permission-checking capability.

use std::sync::Arc;

use async_trait::async_trait;

use akademi_auth::{Permission, PermissionChecker};
use akademi_core::UserId;

use crate::store::{OrgMemberStore, PermissionStore, UserStore};

/// Resolves permission checks against the membership registry: super admins
/// hold everything, everyone else holds the union of permission sets granted
/// through their *active* organization memberships.
pub struct StorePermissionChecker {
    users: Arc<dyn UserStore>,
    org_members: Arc<dyn OrgMemberStore>,
    permissions: Arc<dyn PermissionStore>,
}

impl StorePermissionChecker {
    pub fn new(
        users: Arc<dyn UserStore>,
        org_members: Arc<dyn OrgMemberStore>,
        permissions: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            users,
            org_members,
            permissions,
        }
    }
}

#[async_trait]
impl PermissionChecker for StorePermissionChecker {
    async fn has_permission(&self, user_id: UserId, permission: &Permission) -> bool {
        let Ok(Some(user)) = self.users.find_by_id(user_id).await else {
            return false;
        };
        if user.is_super_admin {
            return true;
        }

        let Ok(role_ids) = self.org_members.active_role_ids_for_user(user_id).await else {
            return false;
        };
        if role_ids.is_empty() {
            return false;
        }
        match self.permissions.permission_names_for_roles(&role_ids).await {
            Ok(names) => names.iter().any(|n| n == permission.as_str()),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::model::{OrganizationMember, PermissionRecord, Role, RoleKind, User};
    use akademi_core::{OrgId, RoleId};
    use chrono::Utc;

    async fn seed(
        store: &InMemoryStore,
        super_admin: bool,
        active_membership: bool,
    ) -> UserId {
        let mut user = User::new("t@s.test".into(), "hash".into(), "T".into());
        user.is_super_admin = super_admin;
        let user_id = user.id;
        UserStore::insert(store, &user).await.unwrap();

        let now = Utc::now();
        let role = Role {
            id: RoleId::new(),
            organization_id: None,
            name: "teacher".into(),
            display_name: "Teacher".into(),
            kind: RoleKind::Custom,
            level: 10,
            description: String::new(),
            is_default: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        crate::store::RoleStore::insert(store, &role).await.unwrap();

        let perm = PermissionRecord::new("classes".into(), "read".into(), String::new());
        let perm_id = perm.id;
        PermissionStore::insert(store, &perm).await.unwrap();
        store.set_role_permissions(role.id, &[perm_id]).await.unwrap();

        let mut member = OrganizationMember::new(OrgId::new(), user_id, role.id, None);
        member.is_active = active_membership;
        OrgMemberStore::insert(store, &member).await.unwrap();

        user_id
    }

    #[tokio::test]
    async fn grants_through_active_membership_role() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = seed(&store, false, true).await;
        let checker =
            StorePermissionChecker::new(store.clone(), store.clone(), store.clone());

        assert!(checker.has_permission(user_id, &Permission::new("classes.read")).await);
        assert!(!checker.has_permission(user_id, &Permission::new("classes.write")).await);
    }

    #[tokio::test]
    async fn inactive_membership_grants_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = seed(&store, false, false).await;
        let checker =
            StorePermissionChecker::new(store.clone(), store.clone(), store.clone());

        assert!(!checker.has_permission(user_id, &Permission::new("classes.read")).await);
    }

    #[tokio::test]
    async fn super_admin_holds_everything() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = seed(&store, true, false).await;
        let checker =
            StorePermissionChecker::new(store.clone(), store.clone(), store.clone());

        assert!(checker.has_permission(user_id, &Permission::new("anything.at_all")).await);
    }

    #[tokio::test]
    async fn unknown_user_holds_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let checker =
            StorePermissionChecker::new(store.clone(), store.clone(), store.clone());
        assert!(!checker.has_permission(UserId::new(), &Permission::new("classes.read")).await);
    }
}
