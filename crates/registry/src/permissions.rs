//! Permission catalog operations. Permissions are immutable after creation:
//! create, read, delete, no update.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use akademi_core::{AppError, AppResult, PageParams, Paginated, PermissionId};

use crate::model::PermissionRecord;
use crate::store::{PermissionFilter, PermissionStore};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermission {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone)]
pub struct PermissionService {
    permissions: Arc<dyn PermissionStore>,
}

impl PermissionService {
    pub fn new(permissions: Arc<dyn PermissionStore>) -> Self {
        Self { permissions }
    }

    /// Create a permission; its name is always derived as
    /// `"{resource}.{action}"`, never client-supplied.
    pub async fn create(&self, input: CreatePermission) -> AppResult<PermissionRecord> {
        if input.resource.trim().is_empty() {
            return Err(AppError::validation("permission resource is required"));
        }
        if input.action.trim().is_empty() {
            return Err(AppError::validation("permission action is required"));
        }

        let permission =
            PermissionRecord::new(input.resource, input.action, input.description);
        self.permissions.insert(&permission).await?;
        info!(permission = %permission.name, "permission created");
        Ok(permission)
    }

    pub async fn get(&self, id: PermissionId) -> AppResult<PermissionRecord> {
        self.permissions.find(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list(
        &self,
        filter: PermissionFilter,
        page: PageParams,
    ) -> AppResult<Paginated<PermissionRecord>> {
        self.permissions.list(&filter, page).await
    }

    pub async fn delete(&self, id: PermissionId) -> AppResult<()> {
        self.permissions.delete(id).await?;
        info!(permission_id = %id, "permission deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn service() -> PermissionService {
        PermissionService::new(Arc::new(InMemoryStore::new()))
    }

    fn input(resource: &str, action: &str) -> CreatePermission {
        CreatePermission {
            resource: resource.to_string(),
            action: action.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn name_is_derived_from_parts() {
        let svc = service();
        let perm = svc.create(input("classes", "read")).await.unwrap();
        assert_eq!(perm.name, "classes.read");
    }

    #[tokio::test]
    async fn duplicate_pair_conflicts() {
        let svc = service();
        svc.create(input("classes", "read")).await.unwrap();
        let err = svc.create(input("classes", "read")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_orders_by_resource_then_action() {
        let svc = service();
        svc.create(input("students", "read")).await.unwrap();
        svc.create(input("classes", "write")).await.unwrap();
        svc.create(input("classes", "read")).await.unwrap();

        let listed = svc
            .list(PermissionFilter::default(), PageParams::default())
            .await
            .unwrap();
        let names: Vec<&str> = listed.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["classes.read", "classes.write", "students.read"]);
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let svc = service();
        let err = svc.delete(PermissionId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }
}
