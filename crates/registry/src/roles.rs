//! Role catalog operations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use akademi_core::{AppError, AppResult, OrgId, PageParams, Paginated, PermissionId, RoleId};

use crate::model::{PermissionRecord, Role, RoleKind};
use crate::store::{PermissionStore, RoleFilter, RolePatch, RoleStore};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub display_name: String,
    pub organization_id: Option<OrgId>,
    #[serde(default)]
    pub kind: Option<RoleKind>,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

/// Partial update. `None` leaves a field untouched; `permission_ids:
/// Some(vec![])` clears the permission set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub level: Option<i32>,
    pub is_default: Option<bool>,
    pub permission_ids: Option<Vec<PermissionId>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<PermissionRecord>,
}

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleStore>, permissions: Arc<dyn PermissionStore>) -> Self {
        Self { roles, permissions }
    }

    /// Create a role and link its permission set in the same operation.
    ///
    /// The link step runs even for an empty set, so a newly created role
    /// always has a well-defined (possibly empty) permission list.
    pub async fn create(&self, input: CreateRole) -> AppResult<RoleWithPermissions> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("role name is required"));
        }
        if input.display_name.trim().is_empty() {
            return Err(AppError::validation("role display name is required"));
        }

        // Friendlier message than the raw constraint violation; the store
        // still conflicts if a concurrent create wins the race.
        if self
            .roles
            .find_by_name(&input.name, input.organization_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("role name already exists in organization"));
        }

        let now = chrono::Utc::now();
        let role = Role {
            id: RoleId::new(),
            organization_id: input.organization_id,
            name: input.name,
            display_name: input.display_name,
            kind: input.kind.unwrap_or(RoleKind::Custom),
            level: input.level,
            description: input.description,
            is_default: input.is_default,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.roles.insert(&role).await?;
        self.permissions
            .set_role_permissions(role.id, &input.permission_ids)
            .await?;

        info!(role_id = %role.id, name = %role.name, "role created");
        let permissions = self.permissions.role_permissions(role.id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    pub async fn get(&self, id: RoleId) -> AppResult<RoleWithPermissions> {
        let role = self.roles.find(id).await?.ok_or(AppError::NotFound)?;
        let permissions = self.permissions.role_permissions(role.id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    pub async fn list(
        &self,
        filter: RoleFilter,
        page: PageParams,
    ) -> AppResult<Paginated<RoleWithPermissions>> {
        let roles = self.roles.list(&filter, page).await?;
        let mut items = Vec::with_capacity(roles.items.len());
        for role in &roles.items {
            let permissions = self.permissions.role_permissions(role.id).await?;
            items.push(RoleWithPermissions {
                role: role.clone(),
                permissions,
            });
        }
        Ok(Paginated {
            items,
            page: roles.page,
            limit: roles.limit,
            total_data: roles.total_data,
            total_pages: roles.total_pages,
        })
    }

    /// Update a custom role. System roles are immutable.
    pub async fn update(&self, id: RoleId, input: UpdateRole) -> AppResult<RoleWithPermissions> {
        let role = self.roles.find(id).await?.ok_or(AppError::NotFound)?;
        if role.is_system() {
            return Err(AppError::forbidden("cannot modify system role"));
        }
        if let Some(name) = &input.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("role name is required"));
            }
        }

        let patch = RolePatch {
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            level: input.level,
            is_default: input.is_default,
        };
        let role = self.roles.update(id, &patch).await?;

        if let Some(permission_ids) = &input.permission_ids {
            self.permissions
                .set_role_permissions(id, permission_ids)
                .await?;
        }

        let permissions = self.permissions.role_permissions(id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Delete a custom role, clearing its permission links first so no
    /// dangling link survives the tombstone.
    pub async fn delete(&self, id: RoleId) -> AppResult<()> {
        let role = self.roles.find(id).await?.ok_or(AppError::NotFound)?;
        if role.is_system() {
            return Err(AppError::forbidden("cannot modify system role"));
        }
        self.permissions.clear_role_permissions(id).await?;
        self.roles.soft_delete(id).await?;
        info!(role_id = %id, "role deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::model::PermissionRecord;

    fn service() -> (RoleService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let svc = RoleService::new(store.clone(), store.clone());
        (svc, store)
    }

    fn create_input(name: &str) -> CreateRole {
        CreateRole {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            organization_id: None,
            kind: None,
            level: 10,
            description: String::new(),
            is_default: false,
            permission_ids: Vec::new(),
        }
    }

    async fn seed_permission(store: &InMemoryStore, resource: &str, action: &str) -> PermissionId {
        let perm = PermissionRecord::new(resource.to_string(), action.to_string(), String::new());
        let id = perm.id;
        PermissionStore::insert(store, &perm).await.unwrap();
        id
    }

    #[tokio::test]
    async fn create_defaults_to_custom_kind() {
        let (svc, _) = service();
        let created = svc.create(create_input("teacher")).await.unwrap();
        assert_eq!(created.role.kind, RoleKind::Custom);
        assert!(created.permissions.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_in_same_scope_conflicts() {
        let (svc, _) = service();
        svc.create(create_input("teacher")).await.unwrap();
        let err = svc.create(create_input("teacher")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Same name under a different organization is a different role.
        let mut scoped = create_input("teacher");
        scoped.organization_id = Some(OrgId::new());
        svc.create(scoped).await.unwrap();
    }

    #[tokio::test]
    async fn system_roles_are_immutable() {
        let (svc, _) = service();
        let mut input = create_input("super_admin");
        input.kind = Some(RoleKind::System);
        let created = svc.create(input).await.unwrap();

        let err = svc
            .update(created.role.id, UpdateRole::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = svc.delete(created.role.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_replaces_permission_set_atomically() {
        let (svc, store) = service();
        let read = seed_permission(&store, "classes", "read").await;
        let write = seed_permission(&store, "classes", "write").await;

        let mut input = create_input("teacher");
        input.permission_ids = vec![read];
        let created = svc.create(input).await.unwrap();
        assert_eq!(created.permissions.len(), 1);

        let updated = svc
            .update(
                created.role.id,
                UpdateRole {
                    permission_ids: Some(vec![write]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.permissions.len(), 1);
        assert_eq!(updated.permissions[0].name, "classes.write");

        // Explicit empty set clears, absent set leaves untouched.
        let cleared = svc
            .update(
                created.role.id,
                UpdateRole {
                    permission_ids: Some(Vec::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.permissions.is_empty());

        let untouched = svc
            .update(
                created.role.id,
                UpdateRole {
                    description: Some("homeroom".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(untouched.permissions.is_empty());
        assert_eq!(untouched.role.description, "homeroom");
    }

    #[tokio::test]
    async fn rename_updates_and_collisions_conflict() {
        let (svc, _) = service();
        let created = svc.create(create_input("teacher")).await.unwrap();
        svc.create(create_input("principal")).await.unwrap();

        let renamed = svc
            .update(
                created.role.id,
                UpdateRole {
                    name: Some("homeroom_teacher".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.role.name, "homeroom_teacher");

        // Renaming onto an existing name in the same scope conflicts.
        let err = svc
            .update(
                created.role.id,
                UpdateRole {
                    name: Some("principal".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_permission_id_fails_replacement() {
        let (svc, _) = service();
        let created = svc.create(create_input("teacher")).await.unwrap();
        let err = svc
            .update(
                created.role.id,
                UpdateRole {
                    permission_ids: Some(vec![PermissionId::new()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn list_orders_by_level_desc() {
        let (svc, _) = service();
        let mut low = create_input("assistant");
        low.level = 1;
        let mut high = create_input("principal");
        high.level = 90;
        svc.create(low).await.unwrap();
        svc.create(high).await.unwrap();

        let listed = svc
            .list(RoleFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(listed.total_data, 2);
        assert_eq!(listed.items[0].role.name, "principal");
    }

    #[tokio::test]
    async fn delete_clears_links_before_tombstone() {
        let (svc, store) = service();
        let read = seed_permission(&store, "classes", "read").await;
        let mut input = create_input("teacher");
        input.permission_ids = vec![read];
        let created = svc.create(input).await.unwrap();

        svc.delete(created.role.id).await.unwrap();
        assert!(matches!(
            svc.get(created.role.id).await.unwrap_err(),
            AppError::NotFound
        ));
        let links = store.role_permissions(created.role.id).await.unwrap();
        assert!(links.is_empty());
    }
}
